//! Computes the opaque version tag stamped onto a project's
//! `pivCommandsVersion` and used to detect propagation targets: a short
//! git SHA when the framework source directory is a git repo, otherwise a
//! deterministic hash of the relevant asset files' contents.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::path::Path;

use tokio::process::Command;

/// Resolve a version tag for `source_dir`. `asset_paths` (relative to
/// `source_dir`) are hashed only when `source_dir` is not a git repo;
/// pass the full copied set from `init`, or just the changed file(s)
/// from a hot-fix session.
pub async fn compute(source_dir: &str, asset_paths: &[String]) -> String {
    if let Some(sha) = git_short_sha(source_dir).await {
        return sha;
    }
    hash_assets(source_dir, asset_paths)
}

async fn git_short_sha(source_dir: &str) -> Option<String> {
    let output = Command::new("git").arg("rev-parse").arg("--short").arg("HEAD").current_dir(source_dir).output().await.ok()?;

    if !output.status.success() {
        return None;
    }

    let sha = String::from_utf8_lossy(&output.stdout).trim().to_string();
    if sha.is_empty() {
        None
    } else {
        Some(sha)
    }
}

/// Order-independent content hash: sorts paths first so the same asset
/// set always yields the same tag regardless of directory walk order.
fn hash_assets(source_dir: &str, asset_paths: &[String]) -> String {
    let mut sorted = asset_paths.to_vec();
    sorted.sort();

    let mut hasher = DefaultHasher::new();
    for relative in &sorted {
        relative.hash(&mut hasher);
        if let Ok(bytes) = std::fs::read(Path::new(source_dir).join(relative)) {
            bytes.hash(&mut hasher);
        }
    }
    format!("{:016x}", hasher.finish())
}
