//! Wire records and the mapping from logical editor operations to worker commands.
//!
//! A request is one line of JSON, `{"command": "...", "args": ["..."]}`. A response is a
//! JSON object with `success`, optional `data` and optional `error`.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use super::error::BridgeError;

/// Default page size for paged reads
pub const DEFAULT_PAGE_LIMIT: usize = 10000;

/// One request frame
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Command {
    #[serde(rename = "command")]
    pub name: String,
    pub args: Vec<String>,
}

impl Command {
    pub fn new<S: Into<String>>(name: S, args: Vec<String>) -> Self {
        Command {
            name: name.into(),
            args,
        }
    }

    pub(crate) fn to_frame(&self) -> Result<String, BridgeError> {
        let mut line = serde_json::to_string(self).map_err(BridgeError::Encode)?;
        line.push('\n');
        Ok(line)
    }
}

/// One response frame, either read from the worker or built locally from a [`BridgeError`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    /// Any other top level fields the worker sent
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl Response {
    pub fn ok(data: Option<Value>) -> Self {
        Response {
            success: true,
            data,
            error: None,
            extra: Map::new(),
        }
    }

    pub fn failure<S: Into<String>>(error: S) -> Self {
        Response {
            success: false,
            data: None,
            error: Some(error.into()),
            extra: Map::new(),
        }
    }

    /// Splits on `success`; a worker side failure keeps its error text unchanged
    pub fn into_result(self) -> Result<Option<Value>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.error.unwrap_or_default())
        }
    }
}

impl From<&BridgeError> for Response {
    fn from(e: &BridgeError) -> Self {
        Response::failure(e.to_string())
    }
}

impl From<BridgeError> for Response {
    fn from(e: BridgeError) -> Self {
        Response::from(&e)
    }
}

/// The logical operations the worker understands
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DexRequest<'a> {
    Open { apk_path: &'a str },
    ListClasses { dex_name: Option<&'a str> },
    GetClass { class_name: &'a str },
    GetMethod { class_name: &'a str, method_name: &'a str },
    ModifyClass { class_name: &'a str, smali: &'a str },
    Save { output_path: Option<&'a str> },
    SearchClass { pattern: &'a str },
    SearchString { text: &'a str },
    Summary { class_name: &'a str },
    GetPaged { class_name: &'a str, offset: usize, limit: usize },
    ToJava { class_name: &'a str },
    Deobfuscate { class_name: &'a str },
    BatchDecompile { package_pattern: &'a str },
    SetJadx { path: &'a str },
    Close,
}

fn args(values: &[&str]) -> Vec<String> {
    values.iter().map(|v| v.to_string()).collect()
}

impl<'a> DexRequest<'a> {
    pub fn name(&self) -> &'static str {
        match self {
            DexRequest::Open { .. } => "open",
            DexRequest::ListClasses { .. } => "list_classes",
            DexRequest::GetClass { .. } => "get_class",
            DexRequest::GetMethod { .. } => "get_method",
            DexRequest::ModifyClass { .. } => "modify_class",
            DexRequest::Save { .. } => "save",
            DexRequest::SearchClass { .. } => "search_class",
            DexRequest::SearchString { .. } => "search_string",
            DexRequest::Summary { .. } => "summary",
            DexRequest::GetPaged { .. } => "get_paged",
            DexRequest::ToJava { .. } => "to_java",
            DexRequest::Deobfuscate { .. } => "deobf",
            DexRequest::BatchDecompile { .. } => "batch_decompile",
            DexRequest::SetJadx { .. } => "set_jadx",
            DexRequest::Close => "close",
        }
    }

    /// Positional arguments; absent optionals are left out, paged reads always carry both numbers
    pub fn to_command(&self) -> Command {
        let a = match *self {
            DexRequest::Open { apk_path } => args(&[apk_path]),
            DexRequest::ListClasses { dex_name } => dex_name.map(|d| args(&[d])).unwrap_or_default(),
            DexRequest::GetClass { class_name }
            | DexRequest::Summary { class_name }
            | DexRequest::ToJava { class_name }
            | DexRequest::Deobfuscate { class_name } => args(&[class_name]),
            DexRequest::GetMethod { class_name, method_name } => args(&[class_name, method_name]),
            DexRequest::ModifyClass { class_name, smali } => args(&[class_name, smali]),
            DexRequest::Save { output_path } => output_path.map(|p| args(&[p])).unwrap_or_default(),
            DexRequest::SearchClass { pattern } => args(&[pattern]),
            DexRequest::SearchString { text } => args(&[text]),
            DexRequest::GetPaged { class_name, offset, limit } => {
                vec![class_name.to_string(), offset.to_string(), limit.to_string()]
            }
            DexRequest::BatchDecompile { package_pattern } => args(&[package_pattern]),
            DexRequest::SetJadx { path } => args(&[path]),
            DexRequest::Close => vec![],
        };
        Command::new(self.name(), a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn request_frame_is_one_json_line() {
        let c = Command::new("get_method", vec!["Lcom/a/B;".to_string(), "foo".to_string()]);
        let frame = c.to_frame().unwrap();
        assert!(frame.ends_with('\n'));
        assert_eq!(frame.matches('\n').count(), 1);
        let v: Value = serde_json::from_str(frame.trim_end()).unwrap();
        assert_eq!(v, json!({"command": "get_method", "args": ["Lcom/a/B;", "foo"]}));
    }

    #[test]
    fn multiline_arguments_stay_on_one_line() {
        let c = DexRequest::ModifyClass { class_name: "LA;", smali: ".class LA;\n.super LB;\n" }.to_command();
        let frame = c.to_frame().unwrap();
        assert_eq!(frame.matches('\n').count(), 1);
    }

    #[test]
    fn optional_arguments_are_omitted() {
        assert!(DexRequest::ListClasses { dex_name: None }.to_command().args.is_empty());
        assert_eq!(
            DexRequest::ListClasses { dex_name: Some("classes2.dex") }.to_command().args,
            vec!["classes2.dex"]
        );
        assert!(DexRequest::Save { output_path: None }.to_command().args.is_empty());
        assert!(DexRequest::Close.to_command().args.is_empty());
    }

    #[test]
    fn paged_read_is_positional() {
        let c = DexRequest::GetPaged { class_name: "LA;", offset: 0, limit: DEFAULT_PAGE_LIMIT }.to_command();
        assert_eq!(c.name, "get_paged");
        assert_eq!(c.args, vec!["LA;", "0", "10000"]);
    }

    #[test]
    fn command_names() {
        assert_eq!(DexRequest::Deobfuscate { class_name: "LA;" }.name(), "deobf");
        assert_eq!(DexRequest::BatchDecompile { package_pattern: "com.a" }.name(), "batch_decompile");
        assert_eq!(DexRequest::Summary { class_name: "LA;" }.name(), "summary");
    }

    #[test]
    fn response_keeps_extra_fields() {
        let r: Response = serde_json::from_str(r#"{"success": true, "data": {"n": 1}, "count": 3}"#).unwrap();
        assert!(r.success);
        assert_eq!(r.data, Some(json!({"n": 1})));
        assert_eq!(r.error, None);
        assert_eq!(r.extra.get("count"), Some(&json!(3)));
    }

    #[test]
    fn worker_failure_passes_through() {
        let r: Response = serde_json::from_str(r#"{"success": false, "error": "Class not found: LA;"}"#).unwrap();
        assert_eq!(r.into_result(), Err("Class not found: LA;".to_string()));
    }

    #[test]
    fn local_failure_shape() {
        let r = Response::from(BridgeError::NoResponse);
        assert!(!r.success);
        assert_eq!(r.error.as_deref(), Some("no response from worker"));
    }
}
