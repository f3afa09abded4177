/* Small templated smali snippets, meant to be fed to smali_edit::insert_code or spliced into a replacement method. */

use crate::types::SmaliError;

/// Highest register a non-range `invoke-static` can name
const MAX_INVOKE_REGISTER: u16 = 15;

/// Escapes text for use inside a smali string literal
pub(crate) fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '\\' => out.push_str("\\\\"),
            '"' => out.push_str("\\\""),
            '\n' => out.push_str("\\n"),
            '\r' => out.push_str("\\r"),
            '\t' => out.push_str("\\t"),
            _ => out.push(c),
        }
    }
    out
}

/// Builds a `Log.d(tag, message)` call using registers `v{register}` and `v{register + 1}`.
/// The method needs `.locals` of at least `register + 2`. Both registers must fit the 4 bit
/// operands of `invoke-static`, so `register` can be at most 14.
///
/// # Examples
///
/// ```
///  use smali_bridge::smali_write::log_call;
///
///  let code = log_call("Hook", "called", 0).unwrap();
///  assert!(code.contains("invoke-static {v0, v1}, Landroid/util/Log;->d"));
/// ```
pub fn log_call(tag: &str, message: &str, register: u16) -> Result<String, SmaliError> {
    let next = match register.checked_add(1) {
        Some(n) if n <= MAX_INVOKE_REGISTER => n,
        _ => {
            return Err(SmaliError::RegisterOutOfRange {
                register,
                max: MAX_INVOKE_REGISTER - 1,
            })
        }
    };
    let t = format!("v{register}");
    let m = format!("v{next}");
    Ok(format!(
        "    const-string {t}, \"{}\"\n    const-string {m}, \"{}\"\n    invoke-static {{{t}, {m}}}, Landroid/util/Log;->d(Ljava/lang/String;Ljava/lang/String;)I",
        escape_string(tag),
        escape_string(message)
    ))
}

/// Builds the instructions that return `value` (or the type's zero) from a method
/// returning the JNI type `return_type`. Uses `v0`, or `v0`/`v1` for wide types.
pub fn return_value(return_type: &str, value: Option<&str>) -> String {
    match return_type.chars().next() {
        Some('V') | None => "    return-void".to_string(),
        Some('Z') => {
            let v = if value == Some("true") { "0x1" } else { "0x0" };
            format!("    const/4 v0, {v}\n    return v0")
        }
        Some('I') | Some('S') | Some('B') | Some('C') | Some('F') => {
            format!("    const v0, {}\n    return v0", value.unwrap_or("0x0"))
        }
        Some('J') | Some('D') => {
            format!("    const-wide v0, {}\n    return-wide v0", value.unwrap_or("0x0"))
        }
        Some('L') | Some('[') => {
            if value == Some("null") {
                "    const/4 v0, 0x0\n    return-object v0".to_string()
            } else {
                "    return-object v0".to_string()
            }
        }
        Some(_) => "    return-void".to_string(),
    }
}
