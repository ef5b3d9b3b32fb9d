use anyhow::{Context, Result};
use regex::{Captures, Regex};
use std::collections::HashMap;
use std::env as stdenv;
use std::fs;
use std::ops::{Deref, DerefMut};
use std::path::{Path, PathBuf};
use std::sync::LazyLock;
use tracing::{info, warn};

// Constant pattern; `variable_pattern_compiles` forces it.
static VAR_REFERENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$(?:(\w+)|\{([^}]*)\})").expect("valid variable pattern"));

/// Mutable, user-level view of the process environment handed to every command.
///
/// The environment contains:
/// - `vars`: variables used for `$VAR` expansion and passed to child processes.
/// - `current_dir`: the directory relative paths are resolved against.
#[derive(Debug, Clone)]
pub struct Environment {
    pub vars: HashMap<String, String>,
    pub current_dir: PathBuf,
}

impl Environment {
    /// Capture the current process variables and working directory.
    pub fn new() -> Self {
        let vars = stdenv::vars().collect();
        let current_dir = stdenv::current_dir().unwrap_or_else(|_| PathBuf::from("."));
        Self { vars, current_dir }
    }

    /// Looks up the key in `self.vars` first, falling back to the process environment.
    pub fn get_var(&self, key: &str) -> Option<String> {
        self.vars
            .get(key)
            .cloned()
            .or_else(|| stdenv::var(key).ok())
    }

    pub fn set_var(&mut self, key: impl Into<String>, val: impl Into<String>) {
        self.vars.insert(key.into(), val.into());
    }

    /// Substitute `$NAME` and `${NAME}` references.
    ///
    /// Unknown variables are left as written, so `$NOPE/x` stays `$NOPE/x`.
    pub fn expand_vars(&self, text: &str) -> String {
        VAR_REFERENCE.replace_all(text, |caps: &Captures| {
            let name = caps.get(1).or_else(|| caps.get(2)).map_or("", |m| m.as_str());
            self.get_var(name)
                .unwrap_or_else(|| caps[0].to_string())
        })
        .into_owned()
    }

    /// Resolve `path` against `current_dir` unless it is already absolute.
    pub fn resolve(&self, path: impl AsRef<Path>) -> PathBuf {
        let path = path.as_ref();
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.current_dir.join(path)
        }
    }

    /// Switch the process working directory to `dir` until the guard is dropped.
    ///
    /// Both the process directory and `current_dir` are restored when the guard goes
    /// out of scope, whether the scope ends normally, through `?`, or by unwinding.
    pub fn push_directory(&mut self, dir: impl AsRef<Path>) -> Result<DirectoryGuard<'_>> {
        let target = self.resolve(dir);
        let target = fs::canonicalize(&target)
            .with_context(|| format!("push_directory: can't canonicalize {}", target.display()))?;
        let previous = stdenv::current_dir().context("push_directory: can't read cwd")?;

        info!("push_directory: {}", target.display());
        stdenv::set_current_dir(&target)
            .with_context(|| format!("push_directory: can't chdir to {}", target.display()))?;

        let previous_env_dir = std::mem::replace(&mut self.current_dir, target);
        Ok(DirectoryGuard {
            env: self,
            previous,
            previous_env_dir,
        })
    }

    /// Run `f` inside `dir`, restoring the previous directory afterwards.
    pub fn within_directory<T>(
        &mut self,
        dir: impl AsRef<Path>,
        f: impl FnOnce(&mut Environment) -> Result<T>,
    ) -> Result<T> {
        let mut guard = self.push_directory(dir)?;
        f(&mut guard)
    }
}

impl Default for Environment {
    fn default() -> Self {
        Self::new()
    }
}

/// Scoped working-directory change returned by [`Environment::push_directory`].
///
/// Dereferences to the [`Environment`] so commands keep working with it while inside.
pub struct DirectoryGuard<'a> {
    env: &'a mut Environment,
    previous: PathBuf,
    previous_env_dir: PathBuf,
}

impl Deref for DirectoryGuard<'_> {
    type Target = Environment;

    fn deref(&self) -> &Environment {
        self.env
    }
}

impl DerefMut for DirectoryGuard<'_> {
    fn deref_mut(&mut self) -> &mut Environment {
        self.env
    }
}

impl Drop for DirectoryGuard<'_> {
    fn drop(&mut self) {
        info!("pop_directory: {}", self.previous.display());
        if let Err(e) = stdenv::set_current_dir(&self.previous) {
            warn!("pop_directory: can't chdir to {}: {}", self.previous.display(), e);
        }
        self.env.current_dir = std::mem::take(&mut self.previous_env_dir);
    }
}
