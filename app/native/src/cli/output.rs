//! CLI output formatting utilities.
//!
//! - JSON syntax highlighting
//! - Compact rect and flag rendering for tables

use colored::Colorize;

use crate::modules::board::state::Rect;

/// Prints JSON with syntax highlighting.
///
/// Keys are cyan, strings green, numbers yellow, booleans and null magenta.
pub fn print_highlighted_json(value: &serde_json::Value) {
    let json = serde_json::to_string_pretty(value).unwrap_or_else(|_| "{}".to_string());
    println!("{}", highlight_json(&json));
}

/// Colorizes a pretty-printed JSON document.
#[must_use]
pub fn highlight_json(json: &str) -> String {
    let mut out = String::with_capacity(json.len() * 2);
    let mut chars = json.chars().peekable();
    let mut after_colon = false;

    while let Some(ch) = chars.next() {
        match ch {
            '"' => {
                let mut literal = String::from('"');
                let mut escaped = false;
                for next in chars.by_ref() {
                    literal.push(next);
                    match next {
                        '\\' if !escaped => escaped = true,
                        '"' if !escaped => break,
                        _ => escaped = false,
                    }
                }
                if after_colon {
                    out.push_str(&literal.green().to_string());
                } else {
                    out.push_str(&literal.cyan().to_string());
                }
                after_colon = false;
            }
            ':' => {
                out.push(':');
                after_colon = true;
            }
            '{' | '}' | '[' | ']' => {
                out.push_str(&ch.to_string().white().bold().to_string());
                after_colon = false;
            }
            ',' => {
                out.push(',');
                after_colon = false;
            }
            c if c.is_whitespace() => out.push(c),
            _ => {
                let mut scalar = String::from(ch);
                while let Some(&next) = chars.peek() {
                    if matches!(next, ',' | '}' | ']') || next.is_whitespace() {
                        break;
                    }
                    scalar.push(next);
                    chars.next();
                }
                if matches!(scalar.as_str(), "true" | "false" | "null") {
                    out.push_str(&scalar.magenta().to_string());
                } else {
                    out.push_str(&scalar.yellow().to_string());
                }
                after_colon = false;
            }
        }
    }

    out
}

/// Truncates a string to a maximum number of characters, adding an ellipsis.
#[must_use]
pub fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        return s.to_string();
    }
    if max_chars <= 1 {
        return "…".to_string();
    }
    let cut = s.char_indices().nth(max_chars - 1).map_or(s.len(), |(idx, _)| idx);
    format!("{}…", &s[..cut])
}

/// Formats a boolean as a colored mark.
#[must_use]
pub fn format_bool(value: bool) -> String {
    if value { "✓".green().to_string() } else { "✗".red().to_string() }
}

/// `x, y` rounded to whole pixels.
#[must_use]
pub fn format_position(rect: &Rect) -> String { format!("{:.0}, {:.0}", rect.x, rect.y) }

/// `w×h` rounded to whole pixels.
#[must_use]
pub fn format_size(rect: &Rect) -> String { format!("{:.0}×{:.0}", rect.width, rect.height) }

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("hello", 10), "hello");
        assert_eq!(truncate("hello world", 8), "hello w…");
        assert_eq!(truncate("hello", 1), "…");
        assert_eq!(truncate("hello 🌍 world", 8), "hello 🌍…");
    }

    #[test]
    fn test_highlight_keeps_text() {
        colored::control::set_override(false);
        let json = "{\n  \"a\": \"x, \\\"y\\\"\",\n  \"b\": [1, true, null]\n}";
        assert_eq!(highlight_json(json), json);
        colored::control::unset_override();
    }

    #[test]
    fn test_format_rect() {
        let rect = Rect::new(10.4, 20.6, 300.0, 199.7);
        assert_eq!(format_position(&rect), "10, 21");
        assert_eq!(format_size(&rect), "300×200");
    }

    #[test]
    fn test_format_bool() {
        assert!(format_bool(true).contains('✓'));
        assert!(format_bool(false).contains('✗'));
    }
}
