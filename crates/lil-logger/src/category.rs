//! Category derivation: a caller's source path relative to the project's
//! source root.
//!
//! The root depends on [`Mode`]: development code runs straight from
//! `<cwd>/<dev_dir>`, production code from the build output one level down,
//! `<cwd>/<prod_dir>/<dev_dir>`. Paths are compared lexically, so the file
//! does not have to live under the root; files outside it get leading `..`
//! segments.

use std::path::{Component, Path, PathBuf};

use url::Url;

use crate::config::{DirConfig, Mode};

/// The directory categories are computed relative to.
pub fn reference_root(mode: Mode, dirs: &DirConfig, cwd: &Path) -> PathBuf {
    let mut root = cwd.to_path_buf();
    if mode == Mode::Production {
        root.push(&dirs.prod_dir);
    }
    root.push(&dirs.dev_dir);
    root
}

/// Map a source file path to its category.
pub fn categorize(file_path: &Path, mode: Mode, dirs: &DirConfig, cwd: &Path) -> String {
    let root = normalize(&reference_root(mode, dirs, cwd));
    let target = normalize(&cwd.join(file_path));
    relative_path(&root, &target).to_string_lossy().into_owned()
}

/// Like [`categorize`], for `file://` module URLs.
///
/// Anything that does not parse as a `file` URL is treated as a plain path.
pub fn categorize_module_url(module_url: &str, mode: Mode, dirs: &DirConfig, cwd: &Path) -> String {
    let path = module_url_to_path(module_url);
    categorize(&path, mode, dirs, cwd)
}

/// Resolve a `file://` URL to a file system path.
pub fn module_url_to_path(module_url: &str) -> PathBuf {
    match Url::parse(module_url) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .unwrap_or_else(|_| PathBuf::from(url.path())),
        _ => PathBuf::from(module_url),
    }
}

/// Absolute path of a source file given the crate's manifest directory and
/// the `file!()` of a call site.
///
/// `file!()` is relative to the directory rustc was started in, which for
/// workspace members is the workspace root (`crates/foo/src/lib.rs`) and for
/// standalone packages the package itself (`src/lib.rs`). Overlaps between
/// the tail of `manifest_dir` and the head of `file` are tried longest
/// first and only accepted when the resulting file exists. Without a match
/// the whole of `file` is joined onto `manifest_dir`.
pub fn source_file_path(manifest_dir: &Path, file: &Path) -> PathBuf {
    if file.is_absolute() {
        return file.to_path_buf();
    }

    let manifest: Vec<Component<'_>> = manifest_dir.components().collect();
    let file_parts: Vec<Component<'_>> = file.components().collect();

    let join_from = |overlap: usize| {
        let mut path = manifest_dir.to_path_buf();
        for component in &file_parts[overlap..] {
            path.push(component.as_os_str());
        }
        path
    };

    let max = manifest.len().min(file_parts.len().saturating_sub(1));
    (0..=max)
        .rev()
        .filter(|&k| manifest[manifest.len() - k..] == file_parts[..k])
        .map(join_from)
        .find(|candidate| candidate.is_file())
        .unwrap_or_else(|| join_from(0))
}

/// Lexically clean a path: drop `.`, fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(
                    out.components().next_back(),
                    Some(Component::Normal(_))
                );
                if can_pop {
                    out.pop();
                } else if !out.has_root() {
                    out.push("..");
                }
                // `..` at the filesystem root stays at the root
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Path from `base` to `target`, both already normalized.
fn relative_path(base: &Path, target: &Path) -> PathBuf {
    let base: Vec<Component<'_>> = base.components().collect();
    let target: Vec<Component<'_>> = target.components().collect();

    let common = base
        .iter()
        .zip(target.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..base.len() {
        rel.push("..");
    }
    for component in &target[common..] {
        rel.push(component.as_os_str());
    }
    rel
}
