use std::collections::HashMap;

/// Replaces `${name}` markers with values from `vars`. Keys are trimmed and
/// matched case-insensitively; absent keys expand to the empty string. An
/// opening marker with no closing `}` drops the rest of the template: callers
/// get truncated output, not an error.
pub fn substitute(template: &str, vars: &HashMap<String, String>) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(start) = rest.find("${") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return out;
        };
        let key = after[..end].trim().to_lowercase();
        if let Some(value) = vars.get(&key) {
            out.push_str(value);
        }
        rest = &after[end + 1..];
    }

    out.push_str(rest);
    out
}

/// True when the template contains a well-formed `${name}` marker for `name`.
pub fn references(template: &str, name: &str) -> bool {
    let mut rest = template;
    while let Some(start) = rest.find("${") {
        let after = &rest[start + 2..];
        let Some(end) = after.find('}') else {
            return false;
        };
        if after[..end].trim().eq_ignore_ascii_case(name) {
            return true;
        }
        rest = &after[end + 1..];
    }
    false
}
