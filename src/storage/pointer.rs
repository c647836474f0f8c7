//! Symbolic-link pointers republished with stage-then-rename.
//!
//! `rename(2)` replaces the destination atomically, so a reader following the
//! pointer sees either the previous target or the new one, never a missing or
//! half-written link.

use super::{StorageError, StorageResult};
use camino::Utf8PathBuf;
use cap_std::fs_utf8::Dir;
use std::io;
use tracing::{debug, warn};
use uuid::Uuid;

pub(super) fn publish(dir: &Dir, pointer: &str, target_file: &str) -> StorageResult<()> {
    let staging = format!(".{pointer}.{}.link", Uuid::new_v4().simple());
    create_link(dir, target_file, &staging)?;
    if let Err(err) = dir.rename(&staging, dir, pointer) {
        if let Err(cleanup) = dir.remove_file(&staging) {
            warn!(link = %staging, error = %cleanup, "failed to remove staged pointer");
        }
        return Err(StorageError::Io(err));
    }
    super::sync_dir(dir)?;
    debug!(pointer, target = target_file, "pointer republished");
    Ok(())
}

pub(super) fn read(dir: &Dir, pointer: &str) -> StorageResult<Option<Utf8PathBuf>> {
    match dir.read_link(pointer) {
        Ok(target) => Ok(Some(target)),
        Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(None),
        Err(err) => Err(StorageError::Io(err)),
    }
}

#[cfg(not(windows))]
fn create_link(dir: &Dir, target_file: &str, link: &str) -> io::Result<()> {
    dir.symlink(target_file, link)
}

#[cfg(windows)]
fn create_link(dir: &Dir, target_file: &str, link: &str) -> io::Result<()> {
    dir.symlink_file(target_file, link)
}
