mod bridge_tests;

#[cfg(test)]
mod tests {
    use crate::smali_edit::{extract_method, insert_code, InsertPosition};
    use crate::smali_write::{log_call, return_value};
    use crate::types::SmaliClass;

    const CLASS: &str = r#".class public Lcom/example/Gate;
.super Ljava/lang/Object;

.method public static isAllowed()Z
    .locals 1

    const/4 v0, 0x0

    return v0
.end method
"#;

    #[test]
    fn patch_boolean_method_with_generated_return() {
        let patched = crate::smali_edit::replace_method(
            CLASS,
            "isAllowed",
            &format!(
                ".method public static isAllowed()Z\n    .locals 1\n{}\n.end method",
                return_value("Z", Some("true"))
            ),
        )
        .unwrap();
        let c = SmaliClass::from_smali(&patched).unwrap();
        let m = c.method("isAllowed").unwrap();
        assert_eq!(m.return_type, "Z");
        assert!(m.body_lines.iter().any(|l| l.trim() == "const/4 v0, 0x1"));
    }

    #[test]
    fn inject_log_call_at_start() {
        let code = log_call("Gate", "isAllowed called", 0).unwrap();
        let patched = insert_code(CLASS, "isAllowed", &code, InsertPosition::Start).unwrap();
        let span = extract_method(&patched, "isAllowed").unwrap();
        let lines: Vec<&str> = span.text.lines().collect();
        assert_eq!(lines[1], "    .locals 1");
        assert_eq!(lines[2], "    const-string v0, \"Gate\"");
        assert_eq!(span.end_line - span.start_line + 1, lines.len());
        assert!(SmaliClass::from_smali(&patched).is_ok());
    }
}
