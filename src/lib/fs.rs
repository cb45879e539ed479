//! Atomic, owner-only file writes for credential-bearing files.

use std::{
    fs,
    io::{self, Write},
    path::Path,
};

use tempfile::NamedTempFile;

/// Unix permission bits for files holding credentials.
#[cfg(unix)]
const OWNER_ONLY_FILE: u32 = 0o600;
/// Unix permission bits for directories created to hold them.
#[cfg(unix)]
const OWNER_ONLY_DIR: u32 = 0o700;

/// Write `contents` to `path` so readers only ever observe the old or the new file.
///
/// The data goes to a temporary file in the destination directory, is flushed
/// to disk, and is then renamed over `path`. A crash at any point leaves the
/// previous file untouched.
pub fn write_owner_only_atomic(path: &Path, contents: &[u8]) -> io::Result<()> {
    let parent = match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent,
        _ => Path::new("."),
    };
    ensure_private_dir(parent)?;

    let mut temp = NamedTempFile::new_in(parent)?;
    restrict_to_owner(temp.path())?;
    temp.write_all(contents)?;
    temp.as_file().sync_all()?;
    temp.persist(path).map_err(|err| err.error)?;
    Ok(())
}

fn ensure_private_dir(dir: &Path) -> io::Result<()> {
    if dir.is_dir() {
        return Ok(());
    }
    fs::create_dir_all(dir)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(dir, fs::Permissions::from_mode(OWNER_ONLY_DIR))?;
    }
    Ok(())
}

fn restrict_to_owner(path: &Path) -> io::Result<()> {
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(OWNER_ONLY_FILE))?;
    }
    #[cfg(not(unix))]
    {
        let _ = path;
    }
    Ok(())
}
