//! Line wrapping, truncation and escaping for text embedded in filter-graph descriptions.

/// Greedy whitespace wrap. Lines never exceed `max_chars` unless a single word does; words are
/// never split. Input with no words yields the original string as the only line.
pub fn wrap(text: &str, max_chars: usize) -> Vec<String> {
    let max_chars = max_chars.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let word_len = word.chars().count();
        if current_len == 0 {
            current.push_str(word);
            current_len = word_len;
        } else if current_len + 1 + word_len <= max_chars {
            current.push(' ');
            current.push_str(word);
            current_len += 1 + word_len;
        } else {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_len = word_len;
        }
    }
    if current_len > 0 {
        lines.push(current);
    }

    if lines.is_empty() {
        lines.push(text.to_string());
    }
    lines
}

/// Escape `text` for a single-quoted filter option value.
///
/// Backslash and colon are backslash-escaped. The grammar has no way to escape a single quote
/// inside a quoted value, so ASCII apostrophes become U+2019.
pub fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len() + 8);
    for ch in text.chars() {
        match ch {
            '\\' => out.push_str("\\\\"),
            ':' => out.push_str("\\:"),
            '\'' => out.push('\u{2019}'),
            c => out.push(c),
        }
    }
    out
}

/// Keep `text` when it is shorter than `budget` chars, otherwise cut it to `budget - 3` chars
/// followed by `...`.
pub fn truncate(text: &str, budget: usize) -> String {
    if text.chars().count() < budget {
        return text.to_string();
    }
    let keep = budget.saturating_sub(3);
    let mut out: String = text.chars().take(keep).collect();
    out.push_str("...");
    out
}

#[cfg(test)]
#[path = "../../tests/unit/text/layout.rs"]
mod tests;
