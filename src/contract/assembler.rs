//! Substitutes form values into a template body.

use std::collections::HashMap;

use super::fields::extract_fields;

/// Replaces every `[FIELD]` placeholder of `body` with its value from `values`.
///
/// Placeholders without a value, or whose value is empty, are left untouched so that
/// unresolved fields stay visible in the output.
pub fn assemble(body: &str, values: &HashMap<String, String>) -> String {
    let mut content = body.to_string();

    for field in extract_fields(body) {
        let Some(value) = values.get(&field).filter(|v| !v.is_empty()) else {
            continue;
        };
        let placeholder = format!("[{}]", field);
        content = content.replace(&placeholder, value);
    }

    content
}

/// Placeholders still present in assembled content.
pub fn unresolved_placeholders(content: &str) -> Vec<String> {
    extract_fields(content)
}
