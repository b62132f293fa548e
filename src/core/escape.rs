/// Shell argument quoting
///
/// Values made only of `[A-Za-z0-9._/-]` pass through untouched; anything
/// else is wrapped in double quotes with `\`, `$`, `"` and `` ` `` escaped.

/// Quote a value for safe inclusion in a POSIX-style command line
pub fn escape(value: &str) -> String {
    if is_plain(value) {
        return value.to_string();
    }

    let mut quoted = String::with_capacity(value.len() + 2);
    quoted.push('"');
    for c in value.chars() {
        if matches!(c, '\\' | '$' | '"' | '`') {
            quoted.push('\\');
        }
        quoted.push(c);
    }
    quoted.push('"');
    quoted
}

// Empty string is not plain: it has to become `""` to survive as an argument.
fn is_plain(value: &str) -> bool {
    !value.is_empty()
        && value
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '/' | '-'))
}
