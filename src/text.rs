/// Phrases the listing site (and our own fallbacks) use for "not specified".
const ABSENT_PLACEHOLDERS: &[&str] = &["?", "не указано", "не указана", "не указан", "нет данных"];

/// Collapse every whitespace run (NBSP and narrow NBSP included) into one space and trim.
pub fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Remove a unit token such as `м²` or `м` from a value. Input without the
/// unit comes back untouched.
pub fn strip_unit(value: &str, unit: &str) -> String {
    if unit.is_empty() || !value.contains(unit) {
        return value.to_string();
    }
    value.replace(unit, "").trim().to_string()
}

pub fn is_absent(value: Option<&str>) -> bool {
    match value {
        None => true,
        Some(v) => {
            let v = v.trim();
            let lower = v.to_lowercase();
            v.is_empty() || ABSENT_PLACEHOLDERS.contains(&lower.as_str())
        }
    }
}

/// First character upper-cased, the rest lower-cased.
pub fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

/// Group digits by three with a plain space: `21347430` -> `21 347 430`.
pub fn group_thousands(n: i64) -> String {
    let digits = n.unsigned_abs().to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3 + 1);
    if n < 0 {
        out.push('-');
    }
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(' ');
        }
        out.push(c);
    }
    out
}

pub fn escape_html(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}
