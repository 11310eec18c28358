/// Escapes text for Telegram's HTML parse mode.
///
/// Model replies and user-supplied strings go through this before being sent with
/// `ParseMode::Html`, so stray `<`, `>` or `&` never break entity parsing.
///
/// # Example
///
/// ```
/// use compass::core::utils::escape_html;
///
/// assert_eq!(escape_html("a < b & c"), "a &lt; b &amp; c");
/// ```
pub fn escape_html(text: &str) -> String {
    let mut result = String::with_capacity(text.len() + text.len() / 8);

    for c in text.chars() {
        match c {
            '&' => result.push_str("&amp;"),
            '<' => result.push_str("&lt;"),
            '>' => result.push_str("&gt;"),
            _ => result.push(c),
        }
    }

    result
}

/// Renders the light Markdown the model is asked to use as Telegram HTML.
///
/// The text is escaped first, then `*bold*` / `**bold**`, `_italic_` and
/// `` `code` `` spans become `<b>`, `<i>` and `<code>`. A span must open and close
/// on the same line, hug its content and not sit inside a word; anything else is
/// left as typed, so tags are always balanced.
///
/// ```
/// use compass::core::utils::markdown_to_html;
///
/// assert_eq!(markdown_to_html("*Важно*: a < b"), "<b>Важно</b>: a &lt; b");
/// assert_eq!(markdown_to_html("snake_case_name"), "snake_case_name");
/// ```
pub fn markdown_to_html(text: &str) -> String {
    let chars: Vec<char> = escape_html(text).chars().collect();
    let mut result = String::with_capacity(chars.len() + 16);
    let mut i = 0;

    while i < chars.len() {
        if let Some((tag, width)) = inline_marker(&chars, i) {
            let opens = i == 0 || !chars[i - 1].is_alphanumeric();
            if let Some(end) = opens.then(|| closing_marker(&chars, i + width, &chars[i..i + width])).flatten() {
                let inner: String = chars[i + width..end].iter().collect();
                result.push_str(&format!("<{tag}>{inner}</{tag}>"));
                i = end + width;
                continue;
            }
        }
        result.push(chars[i]);
        i += 1;
    }

    result
}

fn inline_marker(chars: &[char], i: usize) -> Option<(&'static str, usize)> {
    match chars[i] {
        '*' if chars.get(i + 1) == Some(&'*') => Some(("b", 2)),
        '*' => Some(("b", 1)),
        '_' => Some(("i", 1)),
        '`' => Some(("code", 1)),
        _ => None,
    }
}

/// Index of the marker closing a span whose content starts at `start`.
fn closing_marker(chars: &[char], start: usize, marker: &[char]) -> Option<usize> {
    let first = *chars.get(start)?;
    if first.is_whitespace() || first == marker[0] {
        return None;
    }

    let mut j = start + 1;
    while j + marker.len() <= chars.len() {
        if chars[j] == '\n' {
            return None;
        }
        if chars[j..j + marker.len()] == *marker {
            let hugs = !chars[j - 1].is_whitespace();
            let word_ends = chars.get(j + marker.len()).map_or(true, |c| !c.is_alphanumeric());
            if hugs && word_ends {
                return Some(j);
            }
        }
        j += 1;
    }
    None
}

/// Shortens text for log lines without splitting a UTF-8 character.
pub fn preview(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut trimmed: String = text.chars().take(max_chars).collect();
    trimmed.push('…');
    trimmed
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_escape_html() {
        assert_eq!(escape_html("<b>bold</b>"), "&lt;b&gt;bold&lt;/b&gt;");
        assert_eq!(escape_html("Tom & Jerry"), "Tom &amp; Jerry");
        assert_eq!(escape_html("*markdown* stays"), "*markdown* stays");
        assert_eq!(escape_html("Привет"), "Привет");
    }

    #[test]
    fn test_markdown_spans_become_tags() {
        assert_eq!(
            markdown_to_html("*Сбор* в _субботу_, код `QA-7`"),
            "<b>Сбор</b> в <i>субботу</i>, код <code>QA-7</code>"
        );
        assert_eq!(markdown_to_html("**Важно** знать"), "<b>Важно</b> знать");
    }

    #[test]
    fn test_markdown_escapes_before_tagging() {
        assert_eq!(markdown_to_html("*<script>*"), "<b>&lt;script&gt;</b>");
        assert_eq!(markdown_to_html("`a & b`"), "<code>a &amp; b</code>");
    }

    #[test]
    fn test_markdown_leaves_unpaired_markers() {
        assert_eq!(markdown_to_html("* пункт списка"), "* пункт списка");
        assert_eq!(markdown_to_html("2*3 = 6"), "2*3 = 6");
        assert_eq!(markdown_to_html("file_name_here"), "file_name_here");
        assert_eq!(markdown_to_html("*начало\nконец*"), "*начало\nконец*");
        assert_eq!(markdown_to_html("**"), "**");
    }

    #[test]
    fn test_preview_keeps_short_text() {
        assert_eq!(preview("short", 10), "short");
    }

    #[test]
    fn test_preview_cuts_on_char_boundary() {
        assert_eq!(preview("Расскажи о проекте", 8), "Расскажи…");
    }
}
