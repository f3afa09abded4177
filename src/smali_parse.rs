use log::warn;
use nom::bytes::complete::{tag, take_while, take_while1};
use nom::character::complete::{char, space0, space1};
use nom::combinator::recognize;
use nom::sequence::{delimited, tuple};
use nom::IResult;
use crate::types::*;

pub(crate) const METHOD_START: &str = ".method";
pub(crate) const METHOD_END: &str = ".end method";
pub(crate) const LOCALS: &str = ".locals";

/// The parts of a `.method` line
#[derive(Debug, PartialEq, Eq)]
pub(crate) struct MethodHeader<'a> {
    pub access: String,
    pub name: &'a str,
    pub params: &'a str,
    pub return_type: &'a str,
}

/// True if the line opens a method span
pub(crate) fn is_method_start(line: &str) -> bool
{
    let t = line.trim_start();
    match t.strip_prefix(METHOD_START) {
        Some(rest) => rest.is_empty() || rest.starts_with(char::is_whitespace),
        None => false,
    }
}

/// True if the line closes a method span, only an exact match after trimming counts
pub(crate) fn is_method_end(line: &str) -> bool
{
    line.trim() == METHOD_END
}

pub(crate) fn is_locals_line(line: &str) -> bool
{
    line.trim_start().starts_with(LOCALS)
}

fn is_class_char(c: char) -> bool
{
    c.is_alphanumeric() || c == '_' || c == '/' || c == '$'
}

fn class_descriptor(i: &str) -> IResult<&str, &str>
{
    recognize(tuple((char('L'), take_while1(is_class_char), char(';'))))(i)
}

fn word(i: &str) -> IResult<&str, &str>
{
    take_while1(|c: char| !c.is_whitespace())(i)
}

/// Collects leading modifier words until `item` matches the rest of the line.
/// Returns the modifiers joined with single spaces alongside the item.
fn modifiers_then<'a, O, F>(smali: &'a str, item: F) -> IResult<&'a str, (String, O)>
where
    F: Fn(&'a str) -> IResult<&'a str, O>,
{
    let mut modifiers: Vec<&str> = vec![];
    let mut input = smali;
    loop {
        let (o, _) = space0(input)?;
        if let Ok((o, found)) = item(o) {
            return Ok((o, (modifiers.join(" "), found)));
        }
        let (o, m) = word(o)?;
        modifiers.push(m);
        input = o;
    }
}

fn parse_class_line(smali: &str) -> IResult<&str, Option<&str>>
{
    let (input, _) = tag(".class")(smali)?;
    let (input, _) = space1(input)?;
    let name = input.split_whitespace().find_map(|t| match class_descriptor(t) {
        Ok(("", d)) => Some(d),
        _ => None,
    });
    Ok(("", name))
}

fn parse_super_line(smali: &str) -> IResult<&str, &str>
{
    let (input, _) = tag(".super")(smali)?;
    let (input, _) = space1(input)?;
    class_descriptor(input)
}

fn parse_implements_line(smali: &str) -> IResult<&str, &str>
{
    let (input, _) = tag(".implements")(smali)?;
    let (input, _) = space1(input)?;
    class_descriptor(input)
}

fn parse_source_line(smali: &str) -> IResult<&str, &str>
{
    let (input, _) = tag(".source")(smali)?;
    let (input, _) = space1(input)?;
    delimited(char('"'), take_while(|c| c != '"'), char('"'))(input)
}

fn field_name_and_type(smali: &str) -> IResult<&str, (&str, &str)>
{
    let (input, name) = take_while1(|c: char| c != ':' && !c.is_whitespace())(smali)?;
    let (input, _) = char(':')(input)?;
    let (input, field_type) = take_while1(|c: char| c != '=' && !c.is_whitespace())(input)?;
    Ok((input, (name, field_type)))
}

fn parse_field_line(smali: &str) -> IResult<&str, SmaliField>
{
    let (input, _) = tag(".field")(smali)?;
    let (input, _) = space1(input)?;
    let (input, (access, (name, field_type))) = modifiers_then(input, field_name_and_type)?;
    Ok((
        input,
        SmaliField {
            access,
            name: name.to_string(),
            field_type: field_type.to_string(),
        },
    ))
}

fn method_name_and_proto(smali: &str) -> IResult<&str, (&str, &str, &str)>
{
    let (input, name) = take_while1(|c: char| c != '(' && !c.is_whitespace())(smali)?;
    let (input, params) = delimited(char('('), take_while(|c| c != ')'), char(')'))(input)?;
    let (input, return_type) = word(input)?;
    Ok((input, (name, params, return_type)))
}

fn parse_method_line(smali: &str) -> IResult<&str, MethodHeader<'_>>
{
    let (input, _) = tag(METHOD_START)(smali)?;
    let (input, _) = space1(input)?;
    let (input, (access, (name, params, return_type))) =
        modifiers_then(input, method_name_and_proto)?;
    Ok((
        input,
        MethodHeader {
            access,
            name,
            params,
            return_type,
        },
    ))
}

/// Splits a `.method` line into access, name, params and return type
pub(crate) fn method_header(line: &str) -> Option<MethodHeader<'_>>
{
    parse_method_line(line.trim()).ok().map(|(_, h)| h)
}

enum ScanState {
    OutsideMethod,
    InsideMethod(SmaliMethod),
}

fn open_method(line: &str, index: usize) -> SmaliMethod
{
    let trimmed = line.trim();
    let mut method = SmaliMethod {
        access: String::new(),
        name: String::new(),
        params: String::new(),
        return_type: String::new(),
        full_signature: trimmed.to_string(),
        body_lines: vec![line.to_string()],
        start_line: index,
        end_line: index,
    };
    match method_header(trimmed) {
        Some(h) => {
            method.access = h.access;
            method.name = h.name.to_string();
            method.params = h.params.to_string();
            method.return_type = h.return_type.to_string();
        }
        None => warn!("Unrecognised method declaration at line {}: {}", index + 1, trimmed),
    }
    method
}

fn scan_header_line(class: &mut SmaliClass, line: &str)
{
    let t = line.trim();
    if t.starts_with(".class") {
        if let Ok((_, Some(name))) = parse_class_line(t) {
            class.class_name = name.to_string();
        }
    } else if t.starts_with(".super") {
        if let Ok((_, name)) = parse_super_line(t) {
            class.super_class = name.to_string();
        }
    } else if t.starts_with(".source") {
        if let Ok((_, source)) = parse_source_line(t) {
            class.source_file = source.to_string();
        }
    } else if t.starts_with(".implements") {
        if let Ok((_, name)) = parse_implements_line(t) {
            class.add_interface(name.to_string());
        }
    } else if t.starts_with(".field") {
        if let Ok((_, field)) = parse_field_line(t) {
            class.fields.push(field);
        }
    } else if is_method_end(t) {
        warn!("Ignoring {METHOD_END} outside of a method");
    }
}

/// Single forward pass over the lines of a smali document.
///
/// Header directives are only recognised outside of a method. A `.method` line inside an
/// open method, or text ending inside a method, is reported rather than dropped.
pub(crate) fn parse_class(smali: &str) -> Result<SmaliClass, SmaliError>
{
    let mut class = SmaliClass::default();
    let mut state = ScanState::OutsideMethod;

    for (index, line) in smali.split('\n').enumerate() {
        state = match state {
            ScanState::OutsideMethod => {
                if is_method_start(line) {
                    ScanState::InsideMethod(open_method(line, index))
                } else {
                    scan_header_line(&mut class, line);
                    ScanState::OutsideMethod
                }
            }
            ScanState::InsideMethod(mut method) => {
                if is_method_start(line) {
                    return Err(SmaliError::NestedMethod {
                        line: index + 1,
                        open_method: method.full_signature,
                    });
                }
                method.body_lines.push(line.to_string());
                if is_method_end(line) {
                    method.end_line = index;
                    class.methods.push(method);
                    ScanState::OutsideMethod
                } else {
                    ScanState::InsideMethod(method)
                }
            }
        };
    }

    if let ScanState::InsideMethod(method) = state {
        return Err(SmaliError::UnterminatedClassMethod {
            line: method.start_line + 1,
            open_method: method.full_signature,
        });
    }

    Ok(class)
}
