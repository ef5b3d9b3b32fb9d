//! Lazy, filtered directory and file traversal.
//!
//! [`TreeWalker`] enumerates directories or files below a base path. Child directories
//! are filtered before the walk descends into them, so a pruned subtree is never read.

use crate::error::Result;
use crate::pattern::PathPattern;
use std::fs;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use tracing::{debug, warn};
use walkdir::{DirEntry, WalkDir};

/// Predicate over a single directory or file name.
pub type NameFilter = Rc<dyn Fn(&str) -> bool>;

/// Predicate over a path.
pub type PathFilter = Rc<dyn Fn(&Path) -> bool>;

/// Builder describing one traversal.
///
/// Every `walk_*` call starts a fresh traversal, and the returned iterators own everything
/// they need, so the walker itself can be dropped or reused freely.
///
/// ```no_run
/// use project_manager::TreeWalker;
///
/// let sources = TreeWalker::new(".")
///     .filter_file_ext(|ext| ext == ".rs")
///     .walk_files();
/// for path in sources {
///     println!("{}", path.display());
/// }
/// ```
#[derive(Clone)]
pub struct TreeWalker {
    base: PathBuf,
    pattern: Option<Rc<PathPattern>>,
    dir_name: Option<NameFilter>,
    file_name: Option<NameFilter>,
    file_ext: Option<NameFilter>,
    file_path: Option<PathFilter>,
    include_hidden: bool,
    absolute: bool,
}

impl TreeWalker {
    pub fn new(base: impl Into<PathBuf>) -> Self {
        Self {
            base: base.into(),
            pattern: None,
            dir_name: None,
            file_name: None,
            file_ext: None,
            file_path: None,
            include_hidden: false,
            absolute: true,
        }
    }

    /// Only yield entries whose path relative to the base matches one of `patterns`.
    ///
    /// An empty list keeps everything.
    pub fn patterns<I, S>(self, patterns: I) -> Result<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        Ok(self.pattern(PathPattern::new(patterns)?))
    }

    pub fn pattern(mut self, pattern: PathPattern) -> Self {
        self.pattern = (!pattern.is_empty()).then(|| Rc::new(pattern));
        self
    }

    /// Directories whose name fails `f` are neither yielded nor descended into.
    pub fn filter_dir_name(mut self, f: impl Fn(&str) -> bool + 'static) -> Self {
        self.dir_name = Some(Rc::new(f));
        self
    }

    pub fn filter_file_name(mut self, f: impl Fn(&str) -> bool + 'static) -> Self {
        self.file_name = Some(Rc::new(f));
        self
    }

    /// `f` receives the lower-cased extension including its dot (`".rs"`), or `""`.
    pub fn filter_file_ext(mut self, f: impl Fn(&str) -> bool + 'static) -> Self {
        self.file_ext = Some(Rc::new(f));
        self
    }

    /// `f` receives the file path joined under the base, before canonicalization.
    pub fn filter_file_path(mut self, f: impl Fn(&Path) -> bool + 'static) -> Self {
        self.file_path = Some(Rc::new(f));
        self
    }

    pub fn include_hidden(mut self, yes: bool) -> Self {
        self.include_hidden = yes;
        self
    }

    /// Yield canonical paths (the default) or paths as joined under the base.
    pub fn absolute(mut self, yes: bool) -> Self {
        self.absolute = yes;
        self
    }

    pub fn base(&self) -> &Path {
        &self.base
    }

    /// Depth-first, top-down walk yielding the base and every retained directory below it.
    pub fn walk_directories(&self) -> impl Iterator<Item = PathBuf> + use<> {
        let this = self.clone();
        let absolute = self.absolute;
        self.entries()
            .filter(|entry| entry.file_type().is_dir())
            .filter(move |entry| this.matches_pattern(entry.path()))
            .map(move |entry| output_path(entry.path(), absolute))
    }

    /// Walk the same directories as [`walk_directories`](Self::walk_directories) and
    /// yield every file accepted by all configured filters. The files of a directory
    /// come before anything found in its subdirectories.
    pub fn walk_files(&self) -> impl Iterator<Item = PathBuf> + use<> {
        let this = self.clone();
        let absolute = self.absolute;
        self.entries()
            .filter(|entry| entry.depth() > 0 && is_file(entry))
            .filter(move |entry| this.accept_file(entry))
            .map(move |entry| output_path(entry.path(), absolute))
    }

    fn entries(&self) -> impl Iterator<Item = DirEntry> + use<> {
        let this = self.clone();
        WalkDir::new(&self.base)
            .follow_links(false)
            .sort_by(|a, b| {
                let (a_dir, b_dir) = (a.file_type().is_dir(), b.file_type().is_dir());
                a_dir.cmp(&b_dir).then_with(|| a.file_name().cmp(b.file_name()))
            })
            .into_iter()
            .filter_entry(move |entry| this.retain(entry))
            .filter_map(|entry| match entry {
                Ok(entry) => Some(entry),
                Err(e) => {
                    warn!("skipping unreadable entry: {}", e);
                    None
                }
            })
    }

    /// Decides whether the walk visits `entry` at all; rejected directories are pruned.
    fn retain(&self, entry: &DirEntry) -> bool {
        if entry.depth() == 0 || !entry.file_type().is_dir() {
            return true;
        }
        let name = entry.file_name().to_string_lossy();
        let keep = (self.include_hidden || !is_hidden(&name))
            && self.dir_name.as_ref().is_none_or(|f| f(&*name));
        if !keep {
            debug!("pruned directory: {}", entry.path().display());
        }
        keep
    }

    fn accept_file(&self, entry: &DirEntry) -> bool {
        let name = entry.file_name().to_string_lossy();
        if !self.include_hidden && is_hidden(&name) {
            return false;
        }
        if let Some(f) = &self.file_name {
            if !f(&*name) {
                return false;
            }
        }
        if let Some(f) = &self.file_ext {
            if !f(extension_of(&name).as_str()) {
                return false;
            }
        }
        if let Some(f) = &self.file_path {
            if !f(entry.path()) {
                return false;
            }
        }
        self.matches_pattern(entry.path())
    }

    fn matches_pattern(&self, path: &Path) -> bool {
        match &self.pattern {
            None => true,
            Some(pattern) => pattern.is_match(&self.relative_text(path)),
        }
    }

    fn relative_text(&self, path: &Path) -> String {
        let relative = path.strip_prefix(&self.base).unwrap_or(path);
        relative
            .components()
            .map(|c| c.as_os_str().to_string_lossy())
            .collect::<Vec<_>>()
            .join("/")
    }
}

fn is_hidden(name: &str) -> bool {
    name.starts_with('.')
}

fn is_file(entry: &DirEntry) -> bool {
    let ft = entry.file_type();
    ft.is_file() || (ft.is_symlink() && !entry.path().is_dir())
}

/// Lower-cased extension with its dot. Leading dots (`.bashrc`) never start one.
fn extension_of(name: &str) -> String {
    let stem_start = name.len() - name.trim_start_matches('.').len();
    match name[stem_start..].rfind('.') {
        Some(i) => name[stem_start + i..].to_lowercase(),
        None => String::new(),
    }
}

fn output_path(path: &Path, absolute: bool) -> PathBuf {
    if !absolute {
        return path.to_path_buf();
    }
    fs::canonicalize(path)
        .or_else(|_| std::path::absolute(path))
        .unwrap_or_else(|_| path.to_path_buf())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::BTreeSet;
    use std::fs::File;
    use tempfile::TempDir;

    /// Builds `base/{a/.git/HEAD, a/src/main, b/readme.txt}` plus a few extras.
    fn fixture() -> TempDir {
        let temp = tempfile::tempdir().unwrap();
        let base = temp.path();
        fs::create_dir_all(base.join("a/.git/objects")).unwrap();
        fs::create_dir_all(base.join("a/src/main")).unwrap();
        fs::create_dir_all(base.join("b")).unwrap();
        File::create(base.join("a/.git/HEAD")).unwrap();
        File::create(base.join("a/src/lib.RS")).unwrap();
        File::create(base.join("a/src/main/app.rs")).unwrap();
        File::create(base.join("a/.env")).unwrap();
        File::create(base.join("b/readme.txt")).unwrap();
        temp
    }

    fn relative(base: &Path, paths: impl Iterator<Item = PathBuf>) -> BTreeSet<String> {
        paths
            .map(|p| {
                p.strip_prefix(base)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    fn set(items: &[&str]) -> BTreeSet<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn directories_skip_hidden_subtrees() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let dirs = relative(&base, TreeWalker::new(&base).walk_directories());
        assert_eq!(dirs, set(&["", "a", "a/src", "a/src/main", "b"]));
        assert!(dirs.iter().all(|d| !d.contains(".git")));
    }

    #[test]
    fn directories_are_yielded_top_down() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let dirs: Vec<PathBuf> = TreeWalker::new(&base).walk_directories().collect();
        assert_eq!(dirs[0], base);
        let a = dirs.iter().position(|d| d.ends_with("a")).unwrap();
        let src = dirs.iter().position(|d| d.ends_with("a/src")).unwrap();
        assert!(a < src);
    }

    #[test]
    fn include_hidden_walks_everything() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let dirs = relative(&base, TreeWalker::new(&base).include_hidden(true).walk_directories());
        assert!(dirs.contains("a/.git"));
        assert!(dirs.contains("a/.git/objects"));
    }

    #[test]
    fn dir_name_filter_prunes_before_descent() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let dirs = relative(
            &base,
            TreeWalker::new(&base)
                .filter_dir_name(|name| name != "a")
                .walk_directories(),
        );
        assert_eq!(dirs, set(&["", "b"]));

        let files = relative(
            &base,
            TreeWalker::new(&base)
                .filter_dir_name(|name| name != "src")
                .walk_files(),
        );
        assert_eq!(files, set(&["b/readme.txt"]));
    }

    #[test]
    fn directory_patterns_match_relative_paths() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let dirs = relative(
            &base,
            TreeWalker::new(&base)
                .patterns(["a/.../main"])
                .unwrap()
                .walk_directories(),
        );
        assert_eq!(dirs, set(&["a/src/main"]));
    }

    #[test]
    fn files_skip_hidden_entries() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let files = relative(&base, TreeWalker::new(&base).walk_files());
        assert_eq!(
            files,
            set(&["a/src/lib.RS", "a/src/main/app.rs", "b/readme.txt"])
        );

        let all = relative(&base, TreeWalker::new(&base).include_hidden(true).walk_files());
        assert!(all.contains("a/.env"));
        assert!(all.contains("a/.git/HEAD"));
    }

    #[test]
    fn file_filters_are_combined() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();

        let rust = relative(
            &base,
            TreeWalker::new(&base)
                .filter_file_ext(|ext| ext == ".rs")
                .walk_files(),
        );
        assert_eq!(rust, set(&["a/src/lib.RS", "a/src/main/app.rs"]));

        let both = relative(
            &base,
            TreeWalker::new(&base)
                .filter_file_ext(|ext| ext == ".rs")
                .filter_file_name(|name| name.starts_with("app"))
                .walk_files(),
        );
        assert_eq!(both, set(&["a/src/main/app.rs"]));

        let by_path = relative(
            &base,
            TreeWalker::new(&base)
                .filter_file_path(|path| path.to_string_lossy().contains("/b/"))
                .walk_files(),
        );
        assert_eq!(by_path, set(&["b/readme.txt"]));

        let by_pattern = relative(
            &base,
            TreeWalker::new(&base)
                .patterns(["a/*"])
                .unwrap()
                .filter_file_ext(|ext| ext == ".rs")
                .walk_files(),
        );
        assert_eq!(by_pattern, set(&["a/src/lib.RS", "a/src/main/app.rs"]));
    }

    #[test]
    fn relative_output_keeps_joined_paths() {
        let temp = fixture();
        let base = temp.path().to_path_buf();

        let files: Vec<PathBuf> = TreeWalker::new(&base)
            .absolute(false)
            .filter_file_name(|n| n == "readme.txt")
            .walk_files()
            .collect();
        assert_eq!(files, vec![base.join("b").join("readme.txt")]);
    }

    #[test]
    fn missing_base_yields_nothing() {
        let temp = tempfile::tempdir().unwrap();
        let missing = temp.path().join("nope");
        assert_eq!(TreeWalker::new(&missing).walk_directories().count(), 0);
        assert_eq!(TreeWalker::new(&missing).walk_files().count(), 0);
    }

    fn recorder() -> (Rc<RefCell<Vec<String>>>, impl Fn(&str) -> bool + 'static) {
        let names = Rc::new(RefCell::new(Vec::new()));
        let seen = names.clone();
        (names, move |name: &str| {
            seen.borrow_mut().push(name.to_string());
            true
        })
    }

    #[test]
    fn iteration_stops_early() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();
        let (dirs, dir_filter) = recorder();
        let (files, file_filter) = recorder();

        let mut walk = TreeWalker::new(&base)
            .filter_dir_name(dir_filter)
            .filter_file_name(file_filter)
            .walk_files();

        assert_eq!(walk.next(), Some(base.join("a/src/lib.RS")));
        assert_eq!(*dirs.borrow(), vec!["a", "src"]);
        assert_eq!(*files.borrow(), vec!["lib.RS"]);
    }

    #[test]
    fn pruned_directories_are_never_entered() {
        let temp = fixture();
        let base = fs::canonicalize(temp.path()).unwrap();
        let asked = Rc::new(RefCell::new(Vec::new()));
        let seen = asked.clone();

        let dirs = TreeWalker::new(&base)
            .filter_dir_name(move |name| {
                seen.borrow_mut().push(name.to_string());
                name != "a"
            })
            .walk_directories()
            .count();

        assert_eq!(dirs, 2);
        assert_eq!(*asked.borrow(), vec!["a", "b"]);
    }

    #[test]
    fn files_come_before_subdirectories() {
        let temp = tempfile::tempdir().unwrap();
        let base = fs::canonicalize(temp.path()).unwrap();
        fs::create_dir_all(base.join("A/B")).unwrap();
        File::create(base.join("A/B/deep.txt")).unwrap();
        File::create(base.join("A/mid.txt")).unwrap();
        File::create(base.join("top.txt")).unwrap();

        let files: Vec<PathBuf> = TreeWalker::new(&base).walk_files().collect();
        assert_eq!(
            files,
            vec![
                base.join("top.txt"),
                base.join("A/mid.txt"),
                base.join("A/B/deep.txt"),
            ]
        );
    }

    #[test]
    fn extension_of_skips_leading_dots() {
        assert_eq!(extension_of("lib.RS"), ".rs");
        assert_eq!(extension_of("archive.tar.gz"), ".gz");
        assert_eq!(extension_of("Makefile"), "");
        assert_eq!(extension_of(".bashrc"), "");
        assert_eq!(extension_of("..x.TXT"), ".txt");
    }
}
