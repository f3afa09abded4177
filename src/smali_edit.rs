//! In-place editing of method spans in raw smali text.
//!
//! These functions never go through [`SmaliClass`](crate::types::SmaliClass): they split the
//! text on `\n`, locate the target span by its structural markers and join the lines back,
//! so everything outside the edited region is preserved byte for byte.
//!
//! A target given as a plain `&str` matches the first `.method` line that *contains* it.
//! `"init"` therefore also matches `<init>` and `initViews`, and a name that is a prefix of
//! another method can select the wrong one. Use [`MethodTarget::Name`] to compare against
//! the parsed method name instead.

use std::path::Path;
use std::str::FromStr;

use log::debug;

use crate::smali_parse::{is_locals_line, is_method_end, is_method_start, method_header, LOCALS};
use crate::types::{read_smali, write_smali, SmaliError};

/// Selects which method an edit applies to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MethodTarget<'a> {
    /// First `.method` line containing the text anywhere
    Substring(&'a str),
    /// First `.method` line whose method name is exactly this
    Name(&'a str),
}

impl<'a> From<&'a str> for MethodTarget<'a> {
    fn from(s: &'a str) -> Self {
        MethodTarget::Substring(s)
    }
}

impl<'a> MethodTarget<'a> {
    fn matches(&self, line: &str) -> bool {
        match self {
            MethodTarget::Substring(s) => line.contains(s),
            MethodTarget::Name(n) => method_header(line).map_or(false, |h| h.name == *n),
        }
    }

    fn as_str(&self) -> &'a str {
        match self {
            MethodTarget::Substring(s) | MethodTarget::Name(s) => *s,
        }
    }
}

/// Where [`insert_code`] places the new line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InsertPosition {
    /// Directly after the method's `.locals` line
    Start,
    /// Directly before `.end method`
    End,
}

impl FromStr for InsertPosition {
    type Err = SmaliError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "start" => Ok(InsertPosition::Start),
            "end" => Ok(InsertPosition::End),
            _ => Err(SmaliError::InvalidPosition(s.to_string())),
        }
    }
}

/// A method span cut out of a document. Line numbers are 1-based and inclusive.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MethodSpan {
    pub text: String,
    pub start_line: usize,
    pub end_line: usize,
}

/// 0-based indexes of the target's `.method` and `.end method` lines
fn locate(lines: &[&str], target: MethodTarget) -> Result<(usize, usize), SmaliError> {
    let start = lines
        .iter()
        .position(|l| is_method_start(l) && target.matches(l))
        .ok_or_else(|| SmaliError::MethodNotFound {
            target: target.as_str().to_string(),
        })?;

    let end = lines[start + 1..]
        .iter()
        .position(|l| is_method_end(l))
        .map(|offset| start + 1 + offset)
        .ok_or_else(|| SmaliError::UnterminatedMethod {
            target: target.as_str().to_string(),
            start_line: start + 1,
        })?;

    debug!("Located method {} at lines {}..={}", target.as_str(), start + 1, end + 1);
    Ok((start, end))
}

/// Returns the full span of the first method matching `target`
///
/// # Examples
///
/// ```
///  use smali_bridge::smali_edit::extract_method;
///
///  let smali = ".class LA;\n.method public foo()V\n    return-void\n.end method";
///  let span = extract_method(smali, "foo").unwrap();
///  assert_eq!(span.start_line, 2);
///  assert_eq!(span.end_line, 4);
///  assert_eq!(span.text, ".method public foo()V\n    return-void\n.end method");
/// ```
pub fn extract_method<'a, T: Into<MethodTarget<'a>>>(
    content: &str,
    target: T,
) -> Result<MethodSpan, SmaliError> {
    let lines: Vec<&str> = content.split('\n').collect();
    let (start, end) = locate(&lines, target.into())?;
    Ok(MethodSpan {
        text: lines[start..=end].join("\n"),
        start_line: start + 1,
        end_line: end + 1,
    })
}

/// Swaps the whole span of the first matching method for `new_method`, which is emitted
/// verbatim and must carry its own `.method` / `.end method` lines.
pub fn replace_method<'a, T: Into<MethodTarget<'a>>>(
    content: &str,
    target: T,
    new_method: &str,
) -> Result<String, SmaliError> {
    let lines: Vec<&str> = content.split('\n').collect();
    let (start, end) = locate(&lines, target.into())?;

    let mut out: Vec<&str> = Vec::with_capacity(lines.len());
    out.extend_from_slice(&lines[..start]);
    out.push(new_method);
    out.extend_from_slice(&lines[end + 1..]);
    Ok(out.join("\n"))
}

/// Inserts `code` as a new line in the first matching method
///
/// `Start` puts it after the first `.locals` line of the method and fails with
/// [`SmaliError::AnchorNotFound`] when the method declares none. `End` puts it right
/// before `.end method`.
pub fn insert_code<'a, T: Into<MethodTarget<'a>>>(
    content: &str,
    target: T,
    code: &str,
    position: InsertPosition,
) -> Result<String, SmaliError> {
    let target = target.into();
    let mut lines: Vec<&str> = content.split('\n').collect();
    let (start, end) = locate(&lines, target)?;

    let at = match position {
        InsertPosition::Start => {
            let locals = lines[start + 1..end]
                .iter()
                .position(|l| is_locals_line(l))
                .ok_or_else(|| SmaliError::AnchorNotFound {
                    target: target.as_str().to_string(),
                    anchor: LOCALS.to_string(),
                })?;
            start + 1 + locals + 1
        }
        InsertPosition::End => end,
    };

    lines.insert(at, code);
    Ok(lines.join("\n"))
}

/// Reads a smali file, applies `edit` to its text and writes the result back.
///
/// A read failure or an edit failure is returned as is and the file is left untouched.
pub fn edit_file<F>(path: &Path, edit: F) -> Result<String, SmaliError>
where
    F: FnOnce(&str) -> Result<String, SmaliError>,
{
    let content = read_smali(path)?;
    let edited = edit(&content)?;
    write_smali(path, &edited)?;
    Ok(edited)
}
