use std::collections::BTreeSet;
use std::path::{Component, Path, PathBuf};

use tracing::{debug, warn};

use crate::core::error::{StageError, StageResult};

const NATIVE_EXTENSIONS: [&str; 4] = ["dll", "so", "dylib", "jnilib"];

fn is_native_library(name: &Path) -> bool {
    name.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| NATIVE_EXTENSIONS.contains(&ext))
        .unwrap_or(false)
}

/// Extract the shared libraries of a natives jar flat into `dest_dir`.
///
/// LWJGL nests them under `<os>/<arch>/org/lwjgl/...`; only the file name is
/// kept. `META-INF/` and entries escaping the archive root are skipped. When
/// two entries share a file name the first one wins, and a file already in
/// `dest_dir` (from an earlier jar) is never overwritten. Returns the paths
/// written by this call in sorted order.
pub fn extract_native_libraries(jar_path: &Path, dest_dir: &Path) -> StageResult<Vec<PathBuf>> {
    let jar = std::fs::File::open(jar_path).map_err(|source| StageError::io(jar_path, source))?;
    let mut archive = zip::ZipArchive::new(jar)?;

    std::fs::create_dir_all(dest_dir).map_err(|source| StageError::staging(dest_dir, source))?;

    let mut seen = BTreeSet::new();
    for index in 0..archive.len() {
        let mut entry = archive.by_index(index)?;
        if entry.is_dir() {
            continue;
        }

        let Some(enclosed) = entry.enclosed_name() else {
            warn!("Skipping unsafe entry {:?} in {:?}", entry.name(), jar_path);
            continue;
        };
        let in_meta_inf = matches!(
            enclosed.components().next(),
            Some(Component::Normal(first)) if first.eq_ignore_ascii_case("META-INF")
        );
        if in_meta_inf || !is_native_library(&enclosed) {
            continue;
        }
        let Some(file_name) = enclosed.file_name().map(|n| n.to_os_string()) else {
            continue;
        };
        if !seen.insert(file_name.clone()) {
            debug!("Duplicate native {:?} in {:?}, keeping first", file_name, jar_path);
            continue;
        }

        let out_path = dest_dir.join(&file_name);
        let mut out = match std::fs::OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&out_path)
        {
            Ok(file) => file,
            Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => {
                debug!("Native {:?} already extracted, keeping existing", out_path);
                seen.remove(&file_name);
                continue;
            }
            Err(source) => return Err(StageError::staging(&out_path, source)),
        };
        std::io::copy(&mut entry, &mut out)
            .map_err(|source| StageError::staging(&out_path, source))?;
        debug!("Extracted native: {:?}", out_path);
    }

    Ok(seen.into_iter().map(|name| dest_dir.join(name)).collect())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::io::Write;
    use zip::write::SimpleFileOptions;

    /// Build a zip at `path` from `(name, body)` pairs.
    pub(crate) fn write_jar(path: &Path, entries: &[(&str, &str)]) {
        let file = std::fs::File::create(path).unwrap();
        let mut zip = zip::ZipWriter::new(file);
        for (name, body) in entries {
            zip.start_file(*name, SimpleFileOptions::default()).unwrap();
            zip.write_all(body.as_bytes()).unwrap();
        }
        zip.finish().unwrap();
    }

    #[test]
    fn extracts_nested_libraries_flat() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("lwjgl-3.3.2-natives-windows.jar");
        write_jar(
            &jar,
            &[
                ("META-INF/MANIFEST.MF", "Manifest-Version: 1.0"),
                ("META-INF/windows/x64/org/lwjgl/lwjgl.dll.sha1", "abc"),
                ("windows/x64/org/lwjgl/lwjgl.dll", "dll"),
                ("windows/x64/org/lwjgl/glfw/glfw.dll", "glfw"),
                ("org/lwjgl/Version.class", "class"),
            ],
        );

        let natives = dir.path().join("natives");
        let extracted = extract_native_libraries(&jar, &natives).unwrap();

        assert_eq!(extracted, vec![natives.join("glfw.dll"), natives.join("lwjgl.dll")]);
        assert_eq!(std::fs::read(natives.join("lwjgl.dll")).unwrap(), b"dll");
        assert!(!natives.join("MANIFEST.MF").exists());
        assert!(!natives.join("Version.class").exists());
    }

    #[test]
    fn never_overwrites_natives_from_an_earlier_jar() {
        let dir = tempfile::tempdir().unwrap();
        let first = dir.path().join("first.jar");
        let second = dir.path().join("second.jar");
        write_jar(&first, &[("windows/x64/org/lwjgl/lwjgl.dll", "first")]);
        write_jar(
            &second,
            &[
                ("windows/x64/org/lwjgl/lwjgl.dll", "second"),
                ("windows/x64/org/lwjgl/glfw/glfw.dll", "glfw"),
            ],
        );

        let natives = dir.path().join("natives");
        extract_native_libraries(&first, &natives).unwrap();
        let extracted = extract_native_libraries(&second, &natives).unwrap();

        assert_eq!(extracted, vec![natives.join("glfw.dll")]);
        assert_eq!(std::fs::read(natives.join("lwjgl.dll")).unwrap(), b"first");
    }

    #[test]
    fn skips_entries_escaping_the_archive() {
        let dir = tempfile::tempdir().unwrap();
        let jar = dir.path().join("evil.jar");
        write_jar(&jar, &[("../../escape.so", "x"), ("linux/libok.so", "ok")]);

        let natives = dir.path().join("natives");
        let extracted = extract_native_libraries(&jar, &natives).unwrap();

        assert_eq!(extracted, vec![natives.join("libok.so")]);
        assert!(!dir.path().join("escape.so").exists());
    }
}
