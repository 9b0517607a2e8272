//! Turning raw generator output into a single speakable line.

/// Longest line shown in a speech bubble, in characters
pub const MAX_LINE_CHARS: usize = 160;

const RESPONSE_LABEL: &str = "response:";
const META_LABELS: [&str; 2] = ["is_farewell:", "friendship_adjustment:"];

/// Pulls the spoken line out of a model response.
///
/// Understands the labelled format (`RESPONSE: <line>`) and falls back to
/// the first unlabelled, non-empty line.
pub fn extract_line(raw: &str) -> Option<String> {
    let labelled = raw.lines().find_map(|line| {
        let trimmed = line.trim();
        strip_prefix_ignore_case(trimmed, RESPONSE_LABEL)
    });
    if let Some(line) = labelled {
        return clean_line(line);
    }

    raw.lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .filter(|line| {
            !META_LABELS
                .iter()
                .any(|label| strip_prefix_ignore_case(line, label).is_some())
        })
        .find_map(clean_line)
}

/// Trims whitespace and wrapping quotes, collapses inner whitespace and caps
/// the length. `None` if nothing speakable is left.
pub fn clean_line(raw: &str) -> Option<String> {
    let mut text = raw.trim();
    loop {
        let unquoted = strip_wrapping_quotes(text).trim();
        if unquoted.len() == text.len() {
            break;
        }
        text = unquoted;
    }

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if collapsed.is_empty() {
        return None;
    }

    if collapsed.chars().count() > MAX_LINE_CHARS {
        let truncated: String = collapsed.chars().take(MAX_LINE_CHARS - 3).collect();
        Some(format!("{}...", truncated.trim_end()))
    } else {
        Some(collapsed)
    }
}

fn strip_wrapping_quotes(text: &str) -> &str {
    const QUOTES: [(char, char); 3] = [('"', '"'), ('\'', '\''), ('\u{201c}', '\u{201d}')];
    for (open, close) in QUOTES {
        if let Some(inner) = text
            .strip_prefix(open)
            .and_then(|rest| rest.strip_suffix(close))
        {
            return inner;
        }
    }
    text
}

fn strip_prefix_ignore_case<'a>(text: &'a str, prefix: &str) -> Option<&'a str> {
    let head = text.get(..prefix.len())?;
    if head.eq_ignore_ascii_case(prefix) {
        text.get(prefix.len()..)
    } else {
        None
    }
}
