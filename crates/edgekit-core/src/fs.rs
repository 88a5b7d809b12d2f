//! File helpers.

use crate::error::Result;
use std::fs::{self, OpenOptions};
use std::io::{BufRead, BufReader, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

pub fn read_file(path: impl AsRef<Path>) -> Result<String> {
    Ok(fs::read_to_string(path)?)
}

/// Read a file line by line, without line terminators.
pub fn read_lines(path: impl AsRef<Path>) -> Result<Vec<String>> {
    let file = fs::File::open(path)?;
    let lines = BufReader::new(file).lines().collect::<std::io::Result<Vec<_>>>()?;
    Ok(lines)
}

/// Write `content`, replacing any existing file.
pub fn write_file(path: impl AsRef<Path>, content: &str) -> Result<()> {
    Ok(fs::write(path, content)?)
}

/// Append `content`, creating the file when missing.
pub fn append_to_file(path: impl AsRef<Path>, content: &str) -> Result<()> {
    let mut options = OpenOptions::new();
    options.create(true).append(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o644);
    }
    let mut file = options.open(path)?;
    file.write_all(content.as_bytes())?;
    Ok(())
}

/// True for existing files and directories.
pub fn file_exists(path: impl AsRef<Path>) -> bool {
    path.as_ref().exists()
}

/// Names of the regular files directly inside `dir`, sorted.
pub fn list_files(dir: impl AsRef<Path>) -> Result<Vec<String>> {
    let mut files = Vec::new();
    for entry in fs::read_dir(dir)? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            files.push(entry.file_name().to_string_lossy().into_owned());
        }
    }
    files.sort();
    Ok(files)
}

/// Recursively find files whose extension equals `ext` (".log" or "log").
pub fn find_files_by_extension(root: impl AsRef<Path>, ext: &str) -> Result<Vec<PathBuf>> {
    let wanted = ext.trim_start_matches('.');
    let mut matched = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry.map_err(std::io::Error::from)?;
        if entry.file_type().is_dir() {
            continue;
        }
        if entry.path().extension().and_then(|e| e.to_str()) == Some(wanted) {
            matched.push(entry.into_path());
        }
    }
    Ok(matched)
}
