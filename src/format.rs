//! Inline styling: one [`TextRun`] to one Markdown inline string.

use crate::contract::TextRun;

/// Leading character that turns a plain text run into a block quote.
pub const QUOTE_SENTINEL: char = '^';

/// Format a single styled run.
///
/// Wraps nest in a fixed order, each around the previous result: link, bold,
/// italic, strikethrough, code. A quote prefix goes on last. Empty text still
/// receives its wraps.
pub fn format_run(run: &TextRun) -> String {
    let trimmed = run.text.trim();

    let (mut text, is_quote) = if trimmed.starts_with(QUOTE_SENTINEL) {
        // sentinel plus one separator character
        let rest: String = trimmed.chars().skip(2).collect();
        (rest.trim_start().to_string(), true)
    } else {
        (trimmed.to_string(), false)
    };

    if let Some(url) = &run.link {
        text = format!("[{text}]({url})");
    }
    if run.emphasis.bold {
        text = format!("**{text}**");
    }
    if run.emphasis.italic {
        text = format!("*{text}*");
    }
    if run.emphasis.strikethrough {
        text = format!("~~{text}~~");
    }
    if run.emphasis.code {
        text = format!("`{text}`");
    }
    if is_quote {
        text = format!("> {text}");
    }

    text
}
