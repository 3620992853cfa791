//! Packaging stage: turn a built binary into a final release artifact.
//!
//! Platform conventions: plain binary on Linux, `.exe` naming on Windows,
//! and a zip wrapper on macOS so the code signature survives the artifact
//! store round-trip. Packaging failure is always fatal to the job.

use sha2::{Digest, Sha256};
use slipway_core::artifact::{artifact_name, Artifact};
use slipway_core::target::{BuildTarget, Platform};
use slipway_core::{Error, Result};
use std::path::Path;
use tracing::debug;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

/// Package `built` for `target`, writing the final artifact into `dist_dir`.
pub async fn package(
    binary_name: &str,
    target: &BuildTarget,
    ref_name: &str,
    signed: bool,
    built: &Path,
    dist_dir: &Path,
) -> Result<Artifact> {
    let name = artifact_name(binary_name, target, ref_name);
    tokio::fs::create_dir_all(dist_dir).await?;

    let path = match target.platform {
        Platform::Linux | Platform::Windows => {
            let dest = dist_dir.join(&name);
            tokio::fs::copy(built, &dest)
                .await
                .map_err(|e| package_error(&name, e))?;
            dest
        }
        Platform::Macos => {
            let dest = dist_dir.join(format!("{}.zip", name));
            write_zip(built, &dest, &name)?;
            dest
        }
    };

    let digest = sha256_hex(&path).await?;
    debug!(artifact = %name, path = %path.display(), %digest, "packaged");

    Ok(Artifact {
        name,
        path,
        platform: target.platform,
        signed,
        digest,
    })
}

/// Wrap a single file in a zip archive under its artifact name.
fn write_zip(source: &Path, dest: &Path, entry_name: &str) -> Result<()> {
    let mut reader = std::fs::File::open(source).map_err(|e| package_error(entry_name, e))?;
    let file = std::fs::File::create(dest).map_err(|e| package_error(entry_name, e))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .unix_permissions(0o755);
    zip.start_file(entry_name, options)
        .map_err(|e| package_error(entry_name, e))?;
    std::io::copy(&mut reader, &mut zip).map_err(|e| package_error(entry_name, e))?;
    zip.finish().map_err(|e| package_error(entry_name, e))?;
    Ok(())
}

fn package_error(artifact: &str, err: impl std::fmt::Display) -> Error {
    Error::Package {
        artifact: artifact.to_string(),
        message: err.to_string(),
    }
}

async fn sha256_hex(path: &Path) -> Result<String> {
    let bytes = tokio::fs::read(path).await?;
    let mut hasher = Sha256::new();
    hasher.update(&bytes);
    Ok(hex::encode(hasher.finalize()))
}
