use std::fs::{self, File};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use memmap2::Mmap;

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
    #[error("Refusing to overwrite non-empty file: {0}")]
    WouldOverwrite(PathBuf),
    #[error("File is not valid UTF-8: {0}")]
    NotUtf8(PathBuf),
}

/// Create `path` (and any missing parent directories) if absent.
pub fn ensure_file(path: &Path) -> Result<(), IoError> {
    if path.exists() {
        return Ok(());
    }
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    File::create(path)?;
    Ok(())
}

/// Memory-mapped read of `path`, split into lines.
pub fn load_lines(path: &Path) -> Result<Vec<String>, IoError> {
    let file = File::open(path)?;
    if file.metadata()?.len() == 0 {
        // zero-length mappings are rejected on some platforms
        return Ok(Vec::new());
    }
    // Safety: the mapping is read-only and dropped before returning;
    // concurrent truncation of the backing file is outside the
    // supported access model (single caller, no locking).
    let mmap = unsafe { Mmap::map(&file)? };
    let text = std::str::from_utf8(&mmap).map_err(|_| IoError::NotUtf8(path.to_path_buf()))?;
    Ok(text.lines().map(str::to_owned).collect())
}

/// Full rewrite of `path` with the given lines, joined by `\n` and
/// written with no trailing newline. With `overwrite` false, a
/// non-empty existing file is left untouched and reported as an error.
///
/// The rewrite is in place, not staged through a temporary file; a
/// crash mid-write can leave a partially written file.
pub fn store_lines(path: &Path, lines: &[String], overwrite: bool) -> Result<(), IoError> {
    ensure_file(path)?;
    if !overwrite && fs::metadata(path)?.len() > 0 {
        return Err(IoError::WouldOverwrite(path.to_path_buf()));
    }
    let mut file = File::create(path)?;
    file.write_all(lines.join("\n").as_bytes())?;
    Ok(())
}

/// Copy a raw byte stream over `path`, with the same overwrite rule as
/// [`store_lines`].
pub fn store_raw(path: &Path, mut reader: impl Read, overwrite: bool) -> Result<(), IoError> {
    ensure_file(path)?;
    if !overwrite && fs::metadata(path)?.len() > 0 {
        return Err(IoError::WouldOverwrite(path.to_path_buf()));
    }
    let mut file = File::create(path)?;
    io::copy(&mut reader, &mut file)?;
    Ok(())
}
