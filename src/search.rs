/* Line oriented search over the files of a decoded project. */

use std::fs;
use std::path::{Path, PathBuf};

use log::{debug, warn};
use regex::{Regex, RegexBuilder};
use serde::Serialize;

use crate::smali_write::escape_string;
use crate::types::SmaliError;
use crate::find_files;

/// Extensions that are never read as text
const BINARY_EXTENSIONS: [&str; 7] = ["dex", "so", "png", "jpg", "gif", "zip", "apk"];

/// How [`search_in_files`] matches and how much it returns
#[derive(Debug, Clone)]
pub struct SearchOptions {
    /// Only files with one of these extensions are searched, e.g. `[".smali", ".xml"]`.
    /// Empty searches every text file.
    pub extensions: Vec<String>,
    pub case_sensitive: bool,
    /// Treat the pattern as a regex instead of literal text
    pub is_regex: bool,
    /// Stop after this many hits
    pub max_results: usize,
    /// Lines of context kept on each side of a hit
    pub context_lines: usize,
}

impl Default for SearchOptions {
    fn default() -> Self {
        SearchOptions {
            extensions: vec![],
            case_sensitive: false,
            is_regex: false,
            max_results: 100,
            context_lines: 2,
        }
    }
}

/// One matching line
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SearchHit {
    /// Path relative to the searched directory
    pub file: PathBuf,
    /// 1-based line number
    pub line_number: usize,
    /// The matching line, trimmed
    pub line: String,
    /// The hit and its surrounding lines, untrimmed
    pub context: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SearchResults {
    pub results: Vec<SearchHit>,
    pub files_searched: usize,
    /// True if more hits existed past `max_results`
    pub truncated: bool,
}

impl SearchResults {
    pub fn total_found(&self) -> usize {
        self.results.len()
    }
}

fn compile(pattern: &str, options: &SearchOptions) -> Result<Regex, SmaliError> {
    let source = if options.is_regex {
        pattern.to_string()
    } else {
        regex::escape(pattern)
    };
    RegexBuilder::new(&source)
        .case_insensitive(!options.case_sensitive)
        .build()
        .map_err(|source| SmaliError::InvalidPattern {
            pattern: pattern.to_string(),
            source,
        })
}

fn wanted(path: &Path, extensions: &[String]) -> bool {
    let ext = match path.extension() {
        Some(e) => e.to_string_lossy().to_lowercase(),
        None => String::new(),
    };
    if BINARY_EXTENSIONS.contains(&ext.as_str()) {
        return false;
    }
    extensions.is_empty()
        || extensions
            .iter()
            .any(|e| e.trim_start_matches('.').eq_ignore_ascii_case(&ext))
}

/// Searches every text file under `dir` line by line.
///
/// # Examples
///
/// ```no_run
///  use smali_bridge::search::{search_in_files, SearchOptions};
///  use std::path::Path;
///
///  let options = SearchOptions { extensions: vec![".smali".to_string()], ..Default::default() };
///  let found = search_in_files(Path::new("app"), "isRooted", &options).unwrap();
///  for hit in found.results {
///      println!("{}:{}: {}", hit.file.display(), hit.line_number, hit.line);
///  }
/// ```
pub fn search_in_files(dir: &Path, pattern: &str, options: &SearchOptions) -> Result<SearchResults, SmaliError> {
    let regex = compile(pattern, options)?;
    let files = find_files(dir, &|p: &Path| wanted(p, &options.extensions))?;
    let mut found = SearchResults::default();

    for path in files {
        let bytes = match fs::read(&path) {
            Ok(b) => b,
            Err(e) => {
                warn!("Skipping unreadable file {}: {}", path.display(), e);
                continue;
            }
        };
        found.files_searched += 1;
        let text = String::from_utf8_lossy(&bytes);
        let lines: Vec<&str> = text.split('\n').map(|l| l.trim_end_matches('\r')).collect();

        for (i, line) in lines.iter().enumerate() {
            if !regex.is_match(line) {
                continue;
            }
            if found.results.len() >= options.max_results {
                found.truncated = true;
                debug!("Search for {pattern} stopped at {} hits", options.max_results);
                return Ok(found);
            }
            let start = i.saturating_sub(options.context_lines);
            let end = (i + options.context_lines + 1).min(lines.len());
            found.results.push(SearchHit {
                file: path.strip_prefix(dir).unwrap_or(&path).to_path_buf(),
                line_number: i + 1,
                line: line.trim().to_string(),
                context: lines[start..end].iter().map(|l| l.to_string()).collect(),
            });
        }
    }

    Ok(found)
}

fn smali_options(case_sensitive: bool, is_regex: bool, max_results: usize) -> SearchOptions {
    SearchOptions {
        extensions: vec![".smali".to_string()],
        case_sensitive,
        is_regex,
        max_results,
        ..Default::default()
    }
}

/// Finds references to a method, e.g. `Landroid/util/Log;->d`, as literal case sensitive text
pub fn search_smali_method(dir: &Path, method_pattern: &str, max_results: usize) -> Result<SearchResults, SmaliError> {
    search_in_files(dir, method_pattern, &smali_options(true, false, max_results))
}

/// Finds `const-string` instructions loading `value`. The value is matched as it is written
/// in smali, so quotes and control characters are escaped first.
pub fn search_smali_string(dir: &Path, value: &str, max_results: usize) -> Result<SearchResults, SmaliError> {
    let pattern = format!("const-string.*\"{}\"", regex::escape(&escape_string(value)));
    search_in_files(dir, &pattern, &smali_options(true, true, max_results))
}
