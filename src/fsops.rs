//! Small filesystem helpers used by maintenance commands.
//!
//! Destructive helpers take a `dry_run` flag: when set they only report what they
//! would remove. OS errors are returned as plain [`io::Error`]s, also when the
//! pattern-driven helpers carry them inside [`anyhow::Error`].

use anyhow::Result;
use crate::walker::TreeWalker;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use tracing::info;

pub const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

/// Whether `path` exists and can be opened for reading.
pub fn is_readable(path: &Path) -> bool {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => fs::read_dir(path).is_ok(),
        Ok(_) => File::open(path).is_ok(),
        Err(_) => false,
    }
}

fn has_bom(path: &Path) -> io::Result<bool> {
    let mut head = Vec::with_capacity(UTF8_BOM.len());
    File::open(path)?
        .take(UTF8_BOM.len() as u64)
        .read_to_end(&mut head)?;
    Ok(head == UTF8_BOM)
}

/// Prepend a UTF-8 byte order mark unless the file already starts with one.
///
/// Returns whether the file was changed.
pub fn add_utf8_bom(path: &Path) -> io::Result<bool> {
    if has_bom(path)? {
        return Ok(false);
    }
    let data = fs::read(path)?;
    let mut file = File::create(path)?;
    file.write_all(UTF8_BOM)?;
    file.write_all(&data)?;
    info!("add_utf8_bom: {}", path.display());
    Ok(true)
}

/// Strip a leading UTF-8 byte order mark. Returns whether the file was changed.
pub fn remove_utf8_bom(path: &Path) -> io::Result<bool> {
    if !has_bom(path)? {
        return Ok(false);
    }
    let data = fs::read(path)?;
    fs::write(path, &data[UTF8_BOM.len()..])?;
    info!("remove_utf8_bom: {}", path.display());
    Ok(true)
}

/// Create an empty file, or rewrite an existing one in place to bump its mtime.
pub fn touch_file(path: &Path) -> io::Result<()> {
    if is_readable(path) {
        info!("touch_file: {}", path.display());
        let data = fs::read(path)?;
        fs::write(path, data)
    } else {
        info!("make_touch_file: {}", path.display());
        OpenOptions::new()
            .create(true)
            .truncate(false)
            .write(true)
            .open(path)
            .map(drop)
    }
}

/// Create `path` and its parents. Returns `false` if it already existed.
pub fn make_directory(path: &Path) -> io::Result<bool> {
    if is_readable(path) {
        info!("already_made_directory: {}", path.display());
        return Ok(false);
    }
    info!("make_directory: {}", path.display());
    fs::create_dir_all(path)?;
    Ok(true)
}

/// Create a symbolic link at `target` pointing to the canonical `source`.
pub fn make_symbolic_link(source: &Path, target: &Path) -> io::Result<()> {
    let source = fs::canonicalize(source)?;
    info!(
        "make_symbolic_link_source: {} target: {}",
        source.display(),
        target.display()
    );
    #[cfg(unix)]
    {
        std::os::unix::fs::symlink(&source, target)
    }
    #[cfg(windows)]
    {
        if source.is_dir() {
            std::os::windows::fs::symlink_dir(&source, target)
        } else {
            std::os::windows::fs::symlink_file(&source, target)
        }
    }
}

/// Remove the link itself, never what it points to.
pub fn remove_symbolic_link(link: &Path, dry_run: bool) -> io::Result<()> {
    let link = std::path::absolute(link)?;
    if dry_run {
        info!("test_remove_symbolic_link: {}", link.display());
        return Ok(());
    }
    info!("remove_symbolic_link: {}", link.display());
    fs::remove_file(&link)
}

pub fn remove_file(path: &Path, dry_run: bool) -> io::Result<()> {
    let path = fs::canonicalize(path)?;
    if dry_run {
        info!("test_remove_file: {}", path.display());
        return Ok(());
    }
    info!("remove_file: {}", path.display());
    fs::remove_file(&path)
}

pub fn remove_tree(path: &Path, dry_run: bool) -> io::Result<()> {
    let path = fs::canonicalize(path)?;
    if dry_run {
        info!("test_remove_tree: {}", path.display());
        return Ok(());
    }
    info!("remove_tree: {}", path.display());
    fs::remove_dir_all(&path)
}

/// Remove every directory under `base` (hidden ones included) whose relative path
/// matches `patterns`.
///
/// Deeper matches are removed before their ancestors. Returns the matched directories
/// in removal order, whether or not this was a dry run.
pub fn remove_trees_by_patterns<S: AsRef<str>>(
    patterns: &[S],
    base: &Path,
    dry_run: bool,
) -> Result<Vec<PathBuf>> {
    let mut dirs: Vec<PathBuf> = TreeWalker::new(base)
        .patterns(patterns)?
        .include_hidden(true)
        .walk_directories()
        .collect();
    dirs.reverse();

    for dir in &dirs {
        if dry_run {
            info!("test_remove_tree: {}", dir.display());
        } else if dir.exists() {
            info!("remove_tree: {}", dir.display());
            fs::remove_dir_all(dir)?;
        }
    }
    Ok(dirs)
}

/// Remove every file under `base` (hidden ones included) whose relative path matches
/// `patterns`. Returns the matched files.
pub fn remove_files_by_patterns<S: AsRef<str>>(
    patterns: &[S],
    base: &Path,
    dry_run: bool,
) -> Result<Vec<PathBuf>> {
    let files: Vec<PathBuf> = TreeWalker::new(base)
        .patterns(patterns)?
        .include_hidden(true)
        .walk_files()
        .collect();

    for file in &files {
        if dry_run {
            info!("test_remove_file: {}", file.display());
        } else {
            info!("remove_file: {}", file.display());
            fs::remove_file(file)?;
        }
    }
    Ok(files)
}
