//! Text helpers shared by the streaming speech paths.

/// Split text into sentences for incremental TTS playback. Avoids breaking
/// on decimal points, currency amounts, a.m./p.m., and single-letter
/// abbreviations.
pub fn split_sentences(text: &str) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    let mut sentences = Vec::new();
    let mut current = String::new();

    for (i, &ch) in chars.iter().enumerate() {
        current.push(ch);

        if ch != '.' && ch != ':' {
            continue;
        }

        let prev = if i > 0 { chars[i - 1] } else { '\0' };
        let next = if i + 1 < chars.len() { chars[i + 1] } else { '\0' };

        let window_start = i.saturating_sub(5);
        let window_end = (i + 3).min(chars.len());
        let around: String =
            chars[window_start..window_end].iter().collect::<String>().to_ascii_lowercase();

        let mut should_split = true;
        if ["a.m", "p.m", "am.", "pm."].iter().any(|marker| around.contains(marker)) {
            should_split = false;
        } else if prev.is_ascii_digit()
            && (next.is_ascii_digit() || (i >= 2 && chars[i - 2].is_ascii_digit()))
        {
            should_split = false;
        } else if prev.is_ascii_alphanumeric() && (i < 2 || chars[i - 2].is_whitespace()) {
            should_split = false;
        }

        if should_split {
            let trimmed = current.trim();
            if !trimmed.is_empty() {
                sentences.push(trimmed.to_string());
            }
            current.clear();
        }
    }

    let trimmed = current.trim();
    if !trimmed.is_empty() {
        sentences.push(trimmed.to_string());
    }

    sentences
}

/// True when `buffer` ends at a speakable sentence boundary: a terminal '.'
/// or ':' that does not follow a digit (decimal amounts keep streaming).
/// Trailing whitespace from token-level stream deltas is ignored.
pub fn ends_at_sentence_boundary(buffer: &str) -> bool {
    let mut chars = buffer.trim_end().chars().rev();
    let Some(last) = chars.next() else {
        return false;
    };
    if last != '.' && last != ':' {
        return false;
    }
    if last == '.' {
        if let Some(prev) = chars.next() {
            if prev.is_ascii_digit() {
                return false;
            }
        }
    }
    true
}

/// Collapse runs of whitespace into single spaces.
pub fn normalize_whitespace(text: &str) -> String {
    text.replace("\\\"", "").split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Strip blank lines and per-line padding from an LLM response.
pub fn clean_response(text: &str) -> String {
    text.lines().map(str::trim).filter(|line| !line.is_empty()).collect::<Vec<_>>().join("\n")
}

#[cfg(test)]
mod tests {
    use super::{clean_response, ends_at_sentence_boundary, normalize_whitespace, split_sentences};

    #[test]
    fn splits_plain_sentences() {
        let sentences = split_sentences("The permit is approved. The fee is due.");
        assert_eq!(sentences, vec!["The permit is approved.", "The fee is due."]);
    }

    #[test]
    fn keeps_decimals_and_meridiems_intact() {
        let sentences = split_sentences("Delivery at 9 a.m. costs $120.50 total.");
        assert_eq!(sentences.len(), 1);

        let sentences = split_sentences("The total is 75.25. Thanks.");
        assert_eq!(sentences, vec!["The total is 75.25. Thanks."]);
    }

    #[test]
    fn boundary_check_matches_streaming_rules() {
        assert!(ends_at_sentence_boundary("The permit is approved."));
        assert!(ends_at_sentence_boundary("The permit is approved. "));
        assert!(ends_at_sentence_boundary("Here are the fees:"));
        assert!(!ends_at_sentence_boundary("The fee is 120."));
        assert!(!ends_at_sentence_boundary("The fee is"));
        assert!(!ends_at_sentence_boundary(""));
    }

    #[test]
    fn normalizes_whitespace_runs() {
        assert_eq!(normalize_whitespace("a\n  b\t c"), "a b c");
    }

    #[test]
    fn cleans_response_lines() {
        assert_eq!(clean_response("  first \n\n  second  "), "first\nsecond");
    }
}
