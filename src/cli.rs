use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::core::error::StageResult;
use crate::core::platform::PlatformTag;
use crate::core::staging::LinkMode;
use crate::core::state::{StagerSettings, SETTINGS_FILE};

/// Resolve, fetch, verify and stage LWJGL natives for a target platform.
#[derive(Parser, Debug)]
#[command(name = "nativestage")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Settings file
    #[arg(short, long, global = true, default_value = SETTINGS_FILE)]
    pub config: PathBuf,

    /// Override the artifact cache directory
    #[arg(long, global = true)]
    pub cache_dir: Option<PathBuf>,

    /// Override the maximum number of parallel fetches
    #[arg(short = 'j', long, global = true)]
    pub concurrency: Option<usize>,

    /// Print results as JSON
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Resolve the manifest into artifact URLs and checksums
    Resolve(TargetArgs),

    /// Download and verify every resolved artifact into the cache
    Fetch(TargetArgs),

    /// Fetch and stage the artifacts of one platform
    Stage {
        #[command(flatten)]
        manifest: ManifestArg,

        /// Target platform, e.g. `windows-x86_64`; defaults to the host
        #[arg(short, long, value_parser = parse_platform)]
        platform: Option<PlatformTag>,

        /// Override the staging directory
        #[arg(short, long)]
        staging_dir: Option<PathBuf>,

        /// How files are placed: `copy` or `hardlink`
        #[arg(long, value_parser = parse_link_mode)]
        link_mode: Option<LinkMode>,

        /// Extract shared libraries from natives jars into `natives/`
        #[arg(long)]
        extract_natives: bool,
    },

    /// Re-hash cached artifacts against their published checksums
    Verify(TargetArgs),

    /// Show the host platform and its natives classifier
    Platform,
}

#[derive(Args, Debug)]
pub struct ManifestArg {
    /// Dependency manifest
    #[arg(short, long, default_value = "natives.json")]
    pub manifest: PathBuf,
}

#[derive(Args, Debug)]
pub struct TargetArgs {
    #[command(flatten)]
    pub manifest: ManifestArg,

    /// Target platforms; repeatable. Defaults to the host
    #[arg(short, long = "platform", value_parser = parse_platform)]
    pub platforms: Vec<PlatformTag>,

    /// Target every supported platform
    #[arg(long, conflicts_with = "platforms")]
    pub all_platforms: bool,
}

impl TargetArgs {
    pub fn targets(&self) -> StageResult<Vec<PlatformTag>> {
        if self.all_platforms {
            return Ok(PlatformTag::all());
        }
        if self.platforms.is_empty() {
            return Ok(vec![PlatformTag::current()?]);
        }
        let mut targets = self.platforms.clone();
        targets.sort();
        targets.dedup();
        Ok(targets)
    }
}

fn parse_platform(raw: &str) -> Result<PlatformTag, String> {
    raw.parse().map_err(|e: crate::core::error::StageError| e.to_string())
}

fn parse_link_mode(raw: &str) -> Result<LinkMode, String> {
    match raw.to_ascii_lowercase().as_str() {
        "copy" => Ok(LinkMode::Copy),
        "hardlink" | "link" => Ok(LinkMode::Hardlink),
        other => Err(format!("unknown link mode {other:?} (expected copy or hardlink)")),
    }
}

impl Cli {
    /// Settings from the config file with command-line overrides applied.
    pub fn settings(&self) -> StageResult<StagerSettings> {
        let mut settings = StagerSettings::load(&self.config)?;
        if let Some(dir) = &self.cache_dir {
            settings.cache_dir = dir.clone();
        }
        if let Some(n) = self.concurrency {
            settings.concurrency = n;
        }
        if let Commands::Stage {
            staging_dir,
            link_mode,
            extract_natives,
            ..
        } = &self.command
        {
            if let Some(dir) = staging_dir {
                settings.staging_dir = dir.clone();
            }
            if let Some(mode) = link_mode {
                settings.link_mode = *mode;
            }
            if *extract_natives {
                settings.extract_natives = true;
            }
        }
        settings.validate()?;
        Ok(settings)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::platform::{Arch, Os};

    #[test]
    fn parses_stage_with_overrides() {
        let cli = Cli::try_parse_from([
            "nativestage",
            "--config",
            "/nonexistent/nativestage.json",
            "-j",
            "2",
            "stage",
            "--manifest",
            "deps.json",
            "--platform",
            "windows-x86_64",
            "--link-mode",
            "hardlink",
            "--extract-natives",
        ])
        .unwrap();

        let settings = cli.settings().unwrap();
        assert_eq!(settings.concurrency, 2);
        assert_eq!(settings.link_mode, LinkMode::Hardlink);
        assert!(settings.extract_natives);

        match cli.command {
            Commands::Stage {
                manifest, platform, ..
            } => {
                assert_eq!(manifest.manifest, PathBuf::from("deps.json"));
                assert_eq!(platform, Some(PlatformTag::new(Os::Windows, Arch::X86_64)));
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn repeated_platforms_are_sorted_and_deduplicated() {
        let cli = Cli::try_parse_from([
            "nativestage",
            "fetch",
            "-p",
            "macos-arm64",
            "-p",
            "linux-x86_64",
            "-p",
            "macos-aarch64",
        ])
        .unwrap();

        let Commands::Fetch(args) = cli.command else {
            panic!("expected fetch");
        };
        assert_eq!(
            args.targets().unwrap(),
            vec![
                PlatformTag::new(Os::Linux, Arch::X86_64),
                PlatformTag::new(Os::Macos, Arch::Arm64),
            ]
        );
    }

    #[test]
    fn rejects_unknown_platform_and_link_mode() {
        assert!(Cli::try_parse_from(["nativestage", "resolve", "-p", "solaris-sparc"]).is_err());
        assert!(
            Cli::try_parse_from(["nativestage", "stage", "--link-mode", "symlink"]).is_err()
        );
    }
}
