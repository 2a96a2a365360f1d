//! Helpers for building per-probe SQL fragments

/// Separator between generated fragments
pub const FRAGMENT_SEPARATOR: &str = ",\n";

/// Join fragments with [`FRAGMENT_SEPARATOR`], indenting every line after
/// the first by `indent` spaces.
pub fn join_fragments<S: AsRef<str>>(fragments: &[S], indent: usize) -> String {
    let separator = format!("{FRAGMENT_SEPARATOR}{}", " ".repeat(indent));
    fragments
        .iter()
        .map(AsRef::as_ref)
        .collect::<Vec<_>>()
        .join(&separator)
}

/// `STRUCT<a T, b U>` from `(name, type)` pairs.
pub fn struct_type(fields: &[(&str, &str)]) -> String {
    let members = fields
        .iter()
        .map(|(name, ty)| format!("{name} {ty}"))
        .collect::<Vec<_>>()
        .join(", ");
    format!("STRUCT<{members}>")
}

/// A typed array literal, `ARRAY<element>[...]`.
///
/// The explicit element type keeps the literal valid when there are no
/// elements: `ARRAY<STRUCT<...>>[]`.
pub fn typed_array<S: AsRef<str>>(element_type: &str, elements: &[S], indent: usize) -> String {
    if elements.is_empty() {
        return format!("ARRAY<{element_type}>[]");
    }
    let pad = " ".repeat(indent);
    format!(
        "ARRAY<{element_type}>[\n{pad}{}\n{}]",
        join_fragments(elements, indent),
        " ".repeat(indent.saturating_sub(2))
    )
}

/// Quote a probe name as a SQL string literal.
///
/// Probe columns are plain identifiers, so no escaping is needed beyond
/// the surrounding quotes.
pub fn literal(value: &str) -> String {
    format!("'{value}'")
}

/// Indent every non-empty line of `text` by `indent` spaces.
pub fn indent_lines(text: &str, indent: usize) -> String {
    let pad = " ".repeat(indent);
    text.lines()
        .map(|line| {
            if line.is_empty() {
                String::new()
            } else {
                format!("{pad}{line}")
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}
