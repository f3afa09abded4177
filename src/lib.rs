//! # Smali bridge
//!
//! Drives a long lived dex-editor worker over a line delimited JSON protocol, and edits
//! method bodies in smali text without a full grammar.
//!
//! * [`bridge`] - the worker process, its framing and its command set
//! * [`editor`] - a thread safe session on top of one worker
//! * [`smali_edit`] - extract / replace / insert on raw smali text
//! * [`types`] - the scanned class model, see [`types::SmaliClass::from_smali`]
//! * [`smali_write`] - snippet builders for common injections
//! * [`search`] - text and regex search across a decoded project
//!
use crate::types::SmaliError;
use serde::Serialize;
use std::path::{Path, PathBuf};

pub mod bridge;
pub mod editor;
pub mod search;
pub mod smali_edit;
mod smali_parse;
pub mod smali_write;
mod tests;
pub mod types;

/// A smali file found under a decoded project
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SmaliClassFile {
    /// Descriptor inferred from the path, e.g. `Lcom/example/Main;`
    pub class_name: String,
    /// Path relative to the project directory
    pub file_path: PathBuf,
    /// Name of the `smali*` directory holding the file
    pub smali_dir: String,
}

fn io_error(path: &Path, source: std::io::Error) -> SmaliError {
    SmaliError::Io {
        path: PathBuf::from(path),
        source,
    }
}

/// Recurses a base path, typically a 'smali' folder from apktool, returning every .smali file found
///
/// # Examples
///
/// ```no_run
///  use smali_bridge::find_smali_files;
///  use std::path::Path;
///
///  let files = find_smali_files(Path::new("smali")).unwrap();
///  println!("{:} smali files found.", files.len());
/// ```
pub fn find_smali_files(dir: &Path) -> Result<Vec<PathBuf>, SmaliError> {
    find_files(dir, &|path: &Path| path.extension().map_or(false, |x| x == "smali"))
}

/// Recurses `dir` and returns the sorted paths of every file `keep` accepts
pub(crate) fn find_files(dir: &Path, keep: &dyn Fn(&Path) -> bool) -> Result<Vec<PathBuf>, SmaliError> {
    let mut results = vec![];

    for entry in dir.read_dir().map_err(|e| io_error(dir, e))? {
        let entry = entry.map_err(|e| io_error(dir, e))?;
        let path = entry.path();
        let file_type = entry.file_type().map_err(|e| io_error(&path, e))?;
        if file_type.is_dir() {
            results.extend(find_files(&path, keep)?);
        } else if keep(&path) {
            results.push(path);
        }
    }

    results.sort();
    Ok(results)
}

/// The `smali`, `smali_classes2`, ... directories directly under a decoded project
fn smali_dirs(project_dir: &Path) -> Result<Vec<PathBuf>, SmaliError> {
    let mut dirs = vec![];
    for entry in project_dir.read_dir().map_err(|e| io_error(project_dir, e))? {
        let entry = entry.map_err(|e| io_error(project_dir, e))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && entry.file_name().to_string_lossy().starts_with("smali") {
            dirs.push(entry.path());
        }
    }
    dirs.sort();
    Ok(dirs)
}

/// Lists every class of a decoded project, inferring descriptors from file paths
pub fn list_smali_classes(project_dir: &Path) -> Result<Vec<SmaliClassFile>, SmaliError> {
    let mut classes = vec![];
    for dir in smali_dirs(project_dir)? {
        let smali_dir = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        for file in find_smali_files(&dir)? {
            let Ok(relative) = file.strip_prefix(&dir) else { continue };
            let class_path: Vec<String> = relative
                .with_extension("")
                .components()
                .map(|c| c.as_os_str().to_string_lossy().into_owned())
                .collect();
            classes.push(SmaliClassFile {
                class_name: format!("L{};", class_path.join("/")),
                file_path: file.strip_prefix(project_dir).unwrap_or(&file).to_path_buf(),
                smali_dir: smali_dir.clone(),
            });
        }
    }
    Ok(classes)
}

/// Relative file path of a class given as `Lcom/example/Main;` or `com.example.Main`
pub fn class_file_path(class_name: &str) -> PathBuf {
    let internal = match class_name.strip_prefix('L').and_then(|s| s.strip_suffix(';')) {
        Some(jni) => jni.to_string(),
        None => class_name.replace('.', "/"),
    };
    PathBuf::from(format!("{internal}.smali"))
}

/// Finds the .smali file of a class in any `smali*` directory of a decoded project
pub fn find_smali_class(project_dir: &Path, class_name: &str) -> Result<Option<PathBuf>, SmaliError> {
    let relative = class_file_path(class_name);
    for dir in smali_dirs(project_dir)? {
        let candidate = dir.join(&relative);
        if candidate.is_file() {
            return Ok(Some(candidate));
        }
    }
    Ok(None)
}
