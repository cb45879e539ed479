use std::env;
use std::fs;
use std::path::{Path, PathBuf};

/// Walk up from the current directory to the workspace manifest.
pub fn repo_root() -> anyhow::Result<PathBuf> {
    find_root_from(env::current_dir()?)
}

fn find_root_from(mut dir: PathBuf) -> anyhow::Result<PathBuf> {
    loop {
        if looks_like_repo_root(&dir) {
            return Ok(dir);
        }
        if !dir.pop() {
            anyhow::bail!("failed to find repository root (no workspace Cargo.toml/.git found)");
        }
    }
}

// xtask has its own Cargo.toml, so only a manifest declaring the workspace counts.
fn looks_like_repo_root(dir: &Path) -> bool {
    let is_workspace = fs::read_to_string(dir.join("Cargo.toml"))
        .map(|manifest| manifest.lines().any(|line| line.trim() == "[workspace]"))
        .unwrap_or(false);
    is_workspace || dir.join(".git").is_dir()
}
