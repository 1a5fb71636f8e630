//! Resolution of symbolic state references to stable names.

use crate::syntax::Syntax;
use log::warn;

/// Name given to references that cannot be resolved statically.
pub const UNKNOWN: &str = "unknown";

/// Resolves a reference to a state definition.
///
/// Accepts a bare name (`Green`) or a deferred type-of reference,
/// in value (`typeof Green`) or type position (`target<typeof Green>`).
/// Anything else resolves to [`UNKNOWN`] with a warning.
pub fn resolve_name(node: Syntax<'_>) -> String {
    match bare_name(node.unwrap_transparent()) {
        Some(name) => name.to_string(),
        None => {
            warn!(target: "extractor", "cannot resolve state reference {node:?}, using `{UNKNOWN}`");
            UNKNOWN.to_string()
        }
    }
}

fn bare_name(node: Syntax<'_>) -> Option<&str> {
    match node.kind() {
        "identifier" | "type_identifier" | "shorthand_property_identifier" => Some(node.text()),
        "unary_expression" if node.field("operator")?.kind() == "typeof" => {
            bare_name(node.field("argument")?.unwrap_transparent())
        }
        "type_query" => bare_name(node.first_named_child()?),
        _ => None,
    }
}
