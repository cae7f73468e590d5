//! Atomic write primitives
//!
//! Uses temp→rename so a reader (or a concurrent sweep) never observes a
//! half-written entry.

use crate::errors::{io_error, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use tokio::fs;

/// Atomically replace the file at `target_path` with `content`
///
/// Parent directories are created as needed. The temp file is a dot-file
/// next to the target, which keeps it out of the deprecation sweep.
pub async fn atomic_write(target_path: &Path, content: &[u8]) -> Result<()> {
    if let Some(parent) = target_path.parent() {
        fs::create_dir_all(parent)
            .await
            .map_err(|e| io_error("create_entry_dir", parent, e))?;
    }

    let temp_path = temp_path_for(target_path);

    fs::write(&temp_path, content)
        .await
        .map_err(|e| io_error("write_entry_temp", &temp_path, e))?;

    if let Err(e) = fs::rename(&temp_path, target_path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(io_error("rename_entry_temp", target_path, e));
    }

    Ok(())
}

fn temp_path_for(target_path: &Path) -> PathBuf {
    let mut name = OsString::from(".");
    if let Some(file_name) = target_path.file_name() {
        name.push(file_name);
    }
    name.push(".tmp");
    target_path.with_file_name(name)
}
