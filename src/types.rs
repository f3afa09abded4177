/* Records produced by the smali scanner, plus the error type shared by the text engine. */
/* Class and type names are kept in the smali native (also JNI) format e.g. Ljava/lang/Object; */

use crate::smali_parse::parse_class;
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::path::{Path, PathBuf};
use std::{fmt, fs, io};

/// Errors from scanning or editing smali text.
///
/// Edit failures are returned as values and never abort unrelated work; the text the
/// caller passed in is never modified when one of these is returned.
#[derive(Debug)]
pub enum SmaliError {
    /// No method start line matched the requested target
    MethodNotFound { target: String },
    /// A method matched but the text ended before its `.end method`
    UnterminatedMethod { target: String, start_line: usize },
    /// The insertion anchor (e.g. `.locals`) is missing from the target method
    AnchorNotFound { target: String, anchor: String },
    /// Insert position other than `start` / `end`
    InvalidPosition(String),
    /// A `.method` line was found while another method was still open
    NestedMethod { line: usize, open_method: String },
    /// The text ended while a method was still open
    UnterminatedClassMethod { line: usize, open_method: String },
    /// A generated snippet would need a register the instruction cannot address
    RegisterOutOfRange { register: u16, max: u16 },
    /// A search pattern failed to compile
    InvalidPattern { pattern: String, source: regex::Error },
    /// Reading or writing a smali file failed
    Io { path: PathBuf, source: io::Error },
}

impl SmaliError {
    /// True for the "method not found" family of failures
    pub fn is_not_found(&self) -> bool {
        matches!(self, SmaliError::MethodNotFound { .. })
    }
}

impl fmt::Display for SmaliError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            SmaliError::MethodNotFound { target } => write!(f, "Method not found: {target}"),
            SmaliError::UnterminatedMethod { target, start_line } => write!(
                f,
                "Method {target} starting at line {start_line} has no .end method"
            ),
            SmaliError::AnchorNotFound { target, anchor } => {
                write!(f, "Anchor {anchor} not found in method {target}")
            }
            SmaliError::InvalidPosition(p) => {
                write!(f, "Invalid insert position: {p} (expected start or end)")
            }
            SmaliError::NestedMethod { line, open_method } => write!(
                f,
                "Unexpected .method at line {line} while {open_method} is still open"
            ),
            SmaliError::UnterminatedClassMethod { line, open_method } => write!(
                f,
                "Method {open_method} opened at line {line} is never closed"
            ),
            SmaliError::RegisterOutOfRange { register, max } => {
                write!(f, "Register v{register} is out of range (highest usable is v{max})")
            }
            SmaliError::InvalidPattern { pattern, source } => {
                write!(f, "Invalid search pattern {pattern}: {source}")
            }
            SmaliError::Io { path, source } => {
                write!(f, "Error accessing file {}: {}", path.display(), source)
            }
        }
    }
}

impl Error for SmaliError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            SmaliError::Io { source, .. } => Some(source),
            SmaliError::InvalidPattern { source, .. } => Some(source),
            _ => None,
        }
    }
}

/// Struct representing a `.field` directive
///
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaliField {
    /// Modifiers as written, e.g. `private static final`
    pub access: String,
    /// Name of the field
    pub name: String,
    /// JNI type of the field
    #[serde(rename = "type")]
    pub field_type: String,
}

/// Struct representing a method found by the scanner.
///
/// This is a snapshot of one scan pass, edits go back to the raw text through
/// [`crate::smali_edit`] rather than through this struct.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaliMethod {
    /// Modifiers as written, e.g. `public static`. Empty for package private methods.
    pub access: String,
    /// Method name, `<init>` and `<clinit>` included
    pub name: String,
    /// The JNI parameter list without the parentheses, e.g. `ILjava/lang/String;`
    pub params: String,
    /// JNI return type
    pub return_type: String,
    /// The trimmed `.method` line
    pub full_signature: String,
    /// Raw lines from the `.method` line through `.end method` inclusive
    pub body_lines: Vec<String>,
    /// 0-based index of the `.method` line in the scanned text
    pub start_line: usize,
    /// 0-based index of the `.end method` line in the scanned text
    pub end_line: usize,
}

impl SmaliMethod {
    pub fn line_count(&self) -> usize {
        self.body_lines.len()
    }

    /// The method span joined back into text
    pub fn body(&self) -> String {
        self.body_lines.join("\n")
    }

    /// The method descriptor in `name(params)return` form
    pub fn descriptor(&self) -> String {
        format!("{}({}){}", self.name, self.params, self.return_type)
    }
}

/// Represents a smali class i.e. the whole .smali file
///
/// # Examples
///
/// ```
///  use smali_bridge::types::SmaliClass;
///
///  let smali = ".class public Lcom/basic/Test;\n.super Ljava/lang/Object;\n";
///  let c = SmaliClass::from_smali(smali).expect("Parse error");
///  assert_eq!(c.class_name, "Lcom/basic/Test;");
///  assert_eq!(c.super_class, "Ljava/lang/Object;");
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SmaliClass {
    /// The name of this class
    pub class_name: String,
    /// The class' superclass, empty if the text has no `.super`
    pub super_class: String,
    /// The source filename if included in the smali doc
    pub source_file: String,
    /// Interfaces in declaration order, without duplicates
    pub interfaces: Vec<String>,
    /// All the fields defined by the class
    pub fields: Vec<SmaliField>,
    /// All the methods defined by the class
    pub methods: Vec<SmaliMethod>,
}

impl SmaliClass {
    /// Scans a String containing a smali document
    pub fn from_smali(s: &str) -> Result<SmaliClass, SmaliError> {
        parse_class(s)
    }

    /// Creates a SmaliClass from a file containing a smali document
    ///
    /// # Examples
    ///
    /// ```no_run
    ///  use std::path::Path;
    ///  use smali_bridge::types::SmaliClass;
    ///
    ///  let c = SmaliClass::read_from_file(Path::new("smali/com/cool/Class.smali")).expect("Uh oh, does the file exist?");
    ///  println!("{} has {} methods", c.class_name, c.methods.len());
    /// ```
    pub fn read_from_file(path: &Path) -> Result<SmaliClass, SmaliError> {
        let s = read_smali(path)?;
        SmaliClass::from_smali(&s)
    }

    /// Looks up a method by its exact name, first declaration wins
    pub fn method(&self, name: &str) -> Option<&SmaliMethod> {
        self.methods.iter().find(|m| m.name == name)
    }

    pub(crate) fn add_interface(&mut self, interface: String) {
        if !self.interfaces.contains(&interface) {
            self.interfaces.push(interface);
        }
    }
}

/// Reads a smali file into a String
pub fn read_smali(path: &Path) -> Result<String, SmaliError> {
    fs::read_to_string(path).map_err(|e| SmaliError::Io {
        path: PathBuf::from(path),
        source: e,
    })
}

/// Writes smali text to a file, replacing its contents
pub fn write_smali(path: &Path, smali: &str) -> Result<(), SmaliError> {
    fs::write(path, smali).map_err(|e| SmaliError::Io {
        path: PathBuf::from(path),
        source: e,
    })
}
