//! Naming conventions for the Cypher text emitted by the compiler.
//!
//! Values are always bound as parameters. Labels and aliases cannot be bound
//! in Cypher, so they go through [`quote_identifier`] before interpolation.

/// Node label convention: first letter upper-cased, rest untouched
pub fn node_label(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Relationship type convention: fully upper-cased
pub fn edge_label(name: &str) -> String {
    name.to_uppercase()
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_ascii_alphabetic() || first == '_' => {
            chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
        }
        _ => false,
    }
}

/// Emit `name` as-is when it is a plain identifier, backtick-quoted otherwise
pub fn quote_identifier(name: &str) -> String {
    if is_plain_identifier(name) {
        name.to_string()
    } else {
        format!("`{}`", name.replace('`', "``"))
    }
}
