//! Atomic file replacement.

use std::{ffi::OsString, fs, io::Write, path::{Path, PathBuf}};

use crate::error::Error;

/// Writes `contents` to `dest` atomically: sibling temp file on the
/// same filesystem, write, fsync, rename.
///
/// On any failure the temp file is removed and an existing destination
/// is left bit-identical to before.
pub(crate) fn write_atomic(dest: &Path, contents: &str) -> Result<(), Error> {
    let tmp = sibling_temp_path(dest);
    let result = write_and_rename(&tmp, dest, contents);
    if result.is_err() {
        let _ = fs::remove_file(&tmp);
    }
    result
}

fn write_and_rename(tmp: &Path, dest: &Path, contents: &str) -> Result<(), Error> {
    let mut file = fs::File::create(tmp)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()?;
    drop(file);
    fs::rename(tmp, dest)?;
    Ok(())
}

fn sibling_temp_path(dest: &Path) -> PathBuf {
    let mut name = dest
        .file_name()
        .map(|name| name.to_os_string())
        .unwrap_or_else(|| OsString::from("render"));
    name.push(format!(".{}.new", std::process::id()));
    dest.with_file_name(name)
}
