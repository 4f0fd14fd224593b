use std::borrow::Cow;
use std::fmt;

fn escape_single_quotes(input: &str) -> Cow<'_, str> {
    if input.contains('\'') {
        Cow::Owned(input.replace('\'', "\\'"))
    } else {
        Cow::Borrowed(input)
    }
}

fn format_operation(scope: &str, operation: &str, target: Option<&str>) -> String {
    match target {
        Some(target) => {
            let escaped = escape_single_quotes(target);
            format!("{scope}.{operation}('{}') failed", escaped)
        }
        None => format!("{scope}.{operation} failed"),
    }
}

pub fn io_error(operation: &str, error: impl fmt::Display) -> String {
    format!("{}: {error}", format_operation("sel.io", operation, None))
}

/// Context line for a failed script operation; the cause follows it.
pub fn script_error(operation: &str, path: &str) -> String {
    format_operation("sel.script", operation, Some(path))
}

/// Double-quoted rendering of some text, with control characters escaped.
pub fn quoted(input: &str) -> String {
    let mut out = String::with_capacity(input.len() + 2);
    out.push('"');
    for ch in input.chars() {
        match ch {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            '\x07' => out.push_str("\\a"),
            '\x08' => out.push_str("\\b"),
            '\t' => out.push_str("\\t"),
            '\n' => out.push_str("\\n"),
            '\x0b' => out.push_str("\\v"),
            '\x0c' => out.push_str("\\f"),
            '\r' => out.push_str("\\r"),
            '\x1b' => out.push_str("\\e"),
            other if other.is_control() => out.push_str(&format!("\\x{:02x}", other as u32)),
            other => out.push(other),
        }
    }
    out.push('"');
    out
}

/// Greedy word wrap; words longer than `width` get a line of their own.
pub fn wrap_words(text: &str, width: usize) -> Vec<String> {
    let mut lines = Vec::new();
    let mut current = String::new();
    for word in text.split_whitespace() {
        if !current.is_empty() && current.len() + 1 + word.len() > width {
            lines.push(std::mem::take(&mut current));
        }
        if !current.is_empty() {
            current.push(' ');
        }
        current.push_str(word);
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quoted_escapes_controls() {
        assert_eq!(quoted("a\"b\n"), "\"a\\\"b\\n\"");
        assert_eq!(quoted("coucou"), "\"coucou\"");
    }

    #[test]
    fn wrap_words_breaks_on_width() {
        let lines = wrap_words("the quick brown fox jumps", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps"]);
        assert!(wrap_words("   ", 10).is_empty());
    }

    #[test]
    fn operation_errors_name_their_target() {
        assert_eq!(
            script_error("read", "it's.sel"),
            "sel.script.read('it\\'s.sel') failed"
        );
        assert_eq!(io_error("write", "closed"), "sel.io.write failed: closed");
    }
}
