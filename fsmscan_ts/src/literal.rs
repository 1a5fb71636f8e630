//! Conversion of literal syntax into plain data values.

use crate::syntax::Syntax;
use fsmscan_core::Descriptor;
use log::trace;
use serde_json::{Map, Number, Value};

/// Converts a literal expression into a plain value.
///
/// Strings, numbers, booleans, `null`, object and array literals map to the
/// corresponding [`Value`]; a bare name is captured as its text.
/// Any other shape (functions, calls, `undefined`, templates with substitutions...)
/// yields `None`, and is left out of the enclosing object or array.
pub fn parse_literal(node: Syntax<'_>) -> Option<Value> {
    let node = node.unwrap_transparent();
    match node.kind() {
        "string" | "template_string" => string_value(node).map(Value::String),
        "number" => parse_number(node.text(), false),
        "unary_expression" => {
            let operator = node.field("operator")?.kind();
            let argument = node.field("argument")?.unwrap_transparent();
            match (operator, argument.kind()) {
                ("-", "number") => parse_number(argument.text(), true),
                ("+", "number") => parse_number(argument.text(), false),
                _ => None,
            }
        }
        "true" => Some(Value::Bool(true)),
        "false" => Some(Value::Bool(false)),
        "null" => Some(Value::Null),
        "identifier" | "shorthand_property_identifier" => Some(Value::String(node.text().to_string())),
        "object" => Some(Value::Object(parse_object(node))),
        "array" => Some(Value::Array(
            node.named_children()
                .into_iter()
                .filter_map(parse_literal)
                .collect(),
        )),
        kind => {
            trace!(target: "extractor", "`{kind}` is not a literal");
            None
        }
    }
}

fn parse_object(node: Syntax<'_>) -> Map<String, Value> {
    let mut object = Map::new();
    for property in node.named_children() {
        match property.kind() {
            "pair" => {
                let key = property.field("key").and_then(property_key);
                let value = property.field("value").and_then(parse_literal);
                if let (Some(key), Some(value)) = (key, value) {
                    object.insert(key, value);
                } else {
                    trace!(target: "extractor", "omitting property {property:?}");
                }
            }
            "shorthand_property_identifier" => {
                let name = property.text().to_string();
                object.insert(name.clone(), Value::String(name));
            }
            // spreads, methods
            _ => trace!(target: "extractor", "omitting property {property:?}"),
        }
    }
    object
}

/// The name of an object property or class member.
/// Computed names (`[key]`) have no static name.
pub(crate) fn property_key(node: Syntax<'_>) -> Option<String> {
    match node.kind() {
        "property_identifier" | "private_property_identifier" | "identifier" | "number" => {
            Some(node.text().to_string())
        }
        "string" => string_value(node),
        _ => None,
    }
}

/// Content of a string literal, or of a template literal without substitutions.
pub(crate) fn string_value(node: Syntax<'_>) -> Option<String> {
    match node.kind() {
        "string" => {}
        "template_string"
            if !node
                .named_children()
                .iter()
                .any(|child| child.kind() == "template_substitution") => {}
        _ => return None,
    }
    // strip the delimiters, which are all single-byte
    let text = node.text();
    let raw = text.get(1..text.len().checked_sub(1)?)?;
    Some(unescape(raw))
}

fn unescape(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut chars = raw.chars().peekable();
    while let Some(c) = chars.next() {
        if c != '\\' {
            out.push(c);
            continue;
        }
        match chars.next() {
            Some('n') => out.push('\n'),
            Some('t') => out.push('\t'),
            Some('r') => out.push('\r'),
            Some('b') => out.push('\u{8}'),
            Some('f') => out.push('\u{c}'),
            Some('v') => out.push('\u{b}'),
            Some('0') => out.push('\0'),
            Some('x') => {
                let hex: String = chars.by_ref().take(2).collect();
                push_code_point(&mut out, &hex);
            }
            Some('u') if chars.peek() == Some(&'{') => {
                chars.next();
                let hex: String = chars.by_ref().take_while(|c| *c != '}').collect();
                push_code_point(&mut out, &hex);
            }
            Some('u') => {
                let hex: String = chars.by_ref().take(4).collect();
                push_code_point(&mut out, &hex);
            }
            // line continuation
            Some('\n') => {}
            Some('\r') => {
                chars.next_if_eq(&'\n');
            }
            Some(other) => out.push(other),
            None => out.push('\\'),
        }
    }
    out
}

fn push_code_point(out: &mut String, hex: &str) {
    match u32::from_str_radix(hex, 16).ok().and_then(char::from_u32) {
        Some(c) => out.push(c),
        None => out.push(char::REPLACEMENT_CHARACTER),
    }
}

fn parse_number(text: &str, negative: bool) -> Option<Value> {
    let text = text.replace('_', "");
    let text = text.strip_suffix('n').unwrap_or(&text);
    let radix = match text.get(..2) {
        Some("0x" | "0X") => Some(16),
        Some("0o" | "0O") => Some(8),
        Some("0b" | "0B") => Some(2),
        _ => None,
    };
    let integer = match radix {
        Some(radix) => i64::from_str_radix(&text[2..], radix).ok(),
        None => text.parse::<i64>().ok(),
    };
    if let Some(integer) = integer {
        return Some(Value::from(if negative { -integer } else { integer }));
    }
    let float = text.parse::<f64>().ok()?;
    Number::from_f64(if negative { -float } else { float }).map(Value::Number)
}

/// Reads a guard or action descriptor.
///
/// Accepts `{ name, description? }` objects, or a plain string or bare name used as the name.
/// Anything else, including an empty name, is malformed and yields `None`.
pub fn parse_descriptor(node: Syntax<'_>) -> Option<Descriptor> {
    let descriptor = match parse_literal(node)? {
        Value::String(name) => Descriptor::new(name),
        Value::Object(mut fields) => {
            let Some(Value::String(name)) = fields.remove("name") else {
                return None;
            };
            let description = match fields.remove("description") {
                Some(Value::String(description)) => Some(description),
                _ => None,
            };
            Descriptor { name, description }
        }
        _ => return None,
    };
    Some(descriptor).filter(|descriptor| !descriptor.name.is_empty())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::syntax::testing::*;
    use serde_json::json;

    fn literal(expr: &str) -> Option<Value> {
        let file = parse(&format!("const x = {expr};"));
        parse_literal(value_of(&file, "x"))
    }

    #[test]
    fn scalars() {
        assert_eq!(literal(r#""go green""#), Some(json!("go green")));
        assert_eq!(literal("'single'"), Some(json!("single")));
        assert_eq!(literal("`template`"), Some(json!("template")));
        assert_eq!(literal("42"), Some(json!(42)));
        assert_eq!(literal("-7"), Some(json!(-7)));
        assert_eq!(literal("1.5"), Some(json!(1.5)));
        assert_eq!(literal("0x1F"), Some(json!(31)));
        assert_eq!(literal("1_000"), Some(json!(1000)));
        assert_eq!(literal("true"), Some(json!(true)));
        assert_eq!(literal("false"), Some(json!(false)));
        assert_eq!(literal("null"), Some(Value::Null));
        assert_eq!(literal("someName"), Some(json!("someName")));
    }

    #[test]
    fn escapes() {
        assert_eq!(literal(r#""a\"b\\c\nd""#), Some(json!("a\"b\\c\nd")));
        assert_eq!(literal(r#"'it\'s'"#), Some(json!("it's")));
        assert_eq!(literal(r#""A\u{1F600}\x42""#), Some(json!("A\u{1F600}B")));
    }

    #[test]
    fn non_literals() {
        assert_eq!(literal("undefined"), None);
        assert_eq!(literal("() => 1"), None);
        assert_eq!(literal("compute(1)"), None);
        assert_eq!(literal("`a ${b} c`"), None);
    }

    #[test]
    fn nested_structures() {
        assert_eq!(
            literal(r#"{ name: "isReady", weight: 2, tags: ["a", fn(), "b"], nested: { ok: true }, skip: () => 1, "quoted": 'q', shorthand }"#),
            Some(json!({
                "name": "isReady",
                "weight": 2,
                "tags": ["a", "b"],
                "nested": {"ok": true},
                "quoted": "q",
                "shorthand": "shorthand"
            }))
        );
        assert_eq!(literal("{ [computed]: 1, ...rest }"), Some(json!({})));
        assert_eq!(literal("({ a: 1 } as const)"), Some(json!({"a": 1})));
    }

    fn descriptor(expr: &str) -> Option<Descriptor> {
        let file = parse(&format!("const x = {expr};"));
        parse_descriptor(value_of(&file, "x"))
    }

    #[test]
    fn descriptors() {
        assert_eq!(
            descriptor(r#"{ name: "isReady", description: "checks readiness" }"#),
            Some(Descriptor {
                name: "isReady".to_string(),
                description: Some("checks readiness".to_string()),
            })
        );
        assert_eq!(descriptor(r#""log""#), Some(Descriptor::new("log")));
        assert_eq!(descriptor("logEntry"), Some(Descriptor::new("logEntry")));
        assert_eq!(descriptor(r#"{ name: "n", description: 3 }"#), Some(Descriptor::new("n")));
    }

    #[test]
    fn malformed_descriptors() {
        assert_eq!(descriptor("{}"), None);
        assert_eq!(descriptor(r#"{ description: "nameless" }"#), None);
        assert_eq!(descriptor("{ name: 3 }"), None);
        assert_eq!(descriptor(r#""""#), None);
        assert_eq!(descriptor("[1, 2]"), None);
        assert_eq!(descriptor("() => true"), None);
    }
}
