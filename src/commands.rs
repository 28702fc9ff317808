use std::path::Path;

use serde::Serialize;
use tracing::{info, warn};

use crate::core::error::StageResult;
use crate::core::manifest::DependencyManifest;
use crate::core::pipeline::{StagingPipeline, VerifyStatus};
use crate::core::platform::PlatformTag;

#[derive(Debug, Serialize)]
pub struct PlatformInfo {
    pub platform: PlatformTag,
    pub natives_classifier: String,
}

fn print_json<T: Serialize>(value: &T) -> StageResult<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub async fn resolve(
    pipeline: &StagingPipeline,
    manifest: &Path,
    targets: &[PlatformTag],
    json: bool,
) -> StageResult<()> {
    let manifest = DependencyManifest::load(manifest).await?;
    let resolved = pipeline.resolve(&manifest, targets).await?;

    if json {
        return print_json(&resolved);
    }
    for artifact in &resolved {
        let checksum = artifact
            .checksum
            .as_ref()
            .map(|c| c.to_string())
            .unwrap_or_else(|| "no checksum".to_string());
        println!("{}  {}  {}", artifact.descriptor, artifact.url, checksum);
    }
    Ok(())
}

pub async fn fetch(
    pipeline: &StagingPipeline,
    manifest: &Path,
    targets: &[PlatformTag],
    json: bool,
) -> StageResult<()> {
    let manifest = DependencyManifest::load(manifest).await?;
    let resolved = pipeline.resolve(&manifest, targets).await?;
    let cached = pipeline.fetch_all(&resolved).await?;

    if json {
        return print_json(&cached);
    }
    for artifact in &cached {
        let mark = if artifact.verified { "ok" } else { "unverified" };
        println!(
            "{:<10} {}  {}",
            mark,
            artifact.descriptor(),
            artifact.local_path.display()
        );
    }
    Ok(())
}

pub async fn stage(
    pipeline: &StagingPipeline,
    manifest: &Path,
    platform: Option<PlatformTag>,
    json: bool,
) -> StageResult<()> {
    let platform = match platform {
        Some(p) => p,
        None => PlatformTag::current()?,
    };
    let manifest = DependencyManifest::load(manifest).await?;
    let layout = pipeline.stage(&manifest, platform).await?;

    if json {
        return print_json(&layout);
    }
    for entry in &layout.entries {
        println!("{}  {}", entry.coordinate, entry.path.display());
    }
    for native in &layout.natives {
        println!("native  {}", native.display());
    }
    println!("classpath: {}", layout.classpath);
    Ok(())
}

/// `Ok(false)` when any cached entry no longer matches its checksum.
pub async fn verify(
    pipeline: &StagingPipeline,
    manifest: &Path,
    targets: &[PlatformTag],
    json: bool,
) -> StageResult<bool> {
    let manifest = DependencyManifest::load(manifest).await?;
    let resolved = pipeline.resolve(&manifest, targets).await?;
    let reports = pipeline.verify_all(&resolved).await?;

    if json {
        print_json(&reports)?;
    } else {
        for report in &reports {
            let status = match report.status {
                VerifyStatus::Verified => "ok",
                VerifyStatus::Unverified => "unverified",
                VerifyStatus::Corrupt => "CORRUPT",
                VerifyStatus::Missing => "missing",
            };
            println!("{:<10} {}", status, report.coordinate);
        }
    }

    let corrupt = reports
        .iter()
        .filter(|r| r.status == VerifyStatus::Corrupt)
        .count();
    if corrupt > 0 {
        warn!("{} of {} cached artifacts are corrupt", corrupt, reports.len());
        return Ok(false);
    }
    info!("Verified {} cached artifacts", reports.len());
    Ok(true)
}

pub fn platform(json: bool) -> StageResult<()> {
    let platform = PlatformTag::current()?;
    let info = PlatformInfo {
        platform,
        natives_classifier: platform.natives_classifier(),
    };
    if json {
        return print_json(&info);
    }
    println!("{}  {}", info.platform, info.natives_classifier);
    Ok(())
}
