use crate::env::Environment;
use crate::error::{Error, Result};
use crate::fsops::is_readable;
use crate::walker::TreeWalker;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Candidate paths for a user-supplied `hint`, best first.
///
/// The hint is expanded with the environment's variables and resolved against its
/// current directory; if that names a readable path it comes first. After it come the
/// files under `base` whose name matches `hint*`, in traversal order.
///
/// The sequence is lazy: the tree under `base` is only walked as far as it is pulled.
pub fn resolve_candidates<B: AsRef<Path>>(
    hint: &str,
    base: B,
    env: &Environment,
) -> Result<impl Iterator<Item = PathBuf> + use<B>> {
    let exact = env.resolve(env.expand_vars(hint));
    let exact = fs::canonicalize(&exact)
        .ok()
        .filter(|path| is_readable(path));
    if let Some(path) = &exact {
        debug!("hint {} resolved exactly to {}", hint, path.display());
    }

    let fallback = name_walker(hint, &env.resolve(base))?.walk_files();
    Ok(exact.into_iter().chain(fallback))
}

/// Walker over the files below `base` whose name starts with `hint`.
///
/// Glob syntax in the hint is honoured when it compiles; otherwise the hint is
/// matched literally.
fn name_walker(hint: &str, base: &Path) -> Result<TreeWalker> {
    let name = glob::Pattern::new(&format!("{hint}*")).or_else(|_| {
        let literal = format!("{}*", glob::Pattern::escape(hint));
        glob::Pattern::new(&literal).map_err(|e| Error::Pattern {
            pattern: literal.clone(),
            reason: e.to_string(),
        })
    })?;
    Ok(TreeWalker::new(base).filter_file_name(move |file_name| name.matches(file_name)))
}

/// The best candidate for `hint`, or [`Error::NotFound`] naming `base` and `hint`.
///
/// Stops walking as soon as a candidate is found.
pub fn resolve_first(hint: &str, base: impl AsRef<Path>, env: &Environment) -> Result<PathBuf> {
    let base = base.as_ref();
    resolve_candidates(hint, base, env)?
        .next()
        .ok_or_else(|| Error::NotFound {
            base: base.to_path_buf(),
            hint: hint.to_string(),
        })
}
