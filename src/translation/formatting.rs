/*!
 * Line-break placeholders for backend payloads.
 *
 * Multi-line subtitle text is flattened before it reaches a backend so that
 * every entry travels as a single line, then expanded again on the way back.
 */

use once_cell::sync::Lazy;
use regex::{Captures, Regex};

/// Placeholder that stands in for a line break inside a payload item
pub const LINE_BREAK_PLACEHOLDER: &str = "[BR]";

/// Placeholder in any letter case, with the spaces on either side captured
static LINE_BREAK_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)([ \t]*)\[br\]([ \t]*)").unwrap()
});

/// Replace every newline with the placeholder
pub fn encode_line_breaks(text: &str) -> String {
    text.replace('\n', LINE_BREAK_PLACEHOLDER)
}

/// Turn placeholders back into newlines and trim the result
///
/// Models tend to change the case of the placeholder or pad it with spaces,
/// so both are tolerated. Padding is only dropped after the placeholder when
/// there is padding before it too; otherwise it is the indentation of the
/// next line and stays.
pub fn restore_line_breaks(text: &str) -> String {
    LINE_BREAK_REGEX
        .replace_all(text, |caps: &Captures| {
            let before = caps.get(1).map_or("", |m| m.as_str());
            let after = caps.get(2).map_or("", |m| m.as_str());
            if before.is_empty() {
                format!("\n{}", after)
            } else {
                "\n".to_string()
            }
        })
        .trim()
        .to_string()
}
