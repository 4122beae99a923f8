//! Plain-text helpers shared by the detector, chunker, and rewrite rules.
//!
//! Sentence splitting is deliberately simple: terminal punctuation followed
//! by whitespace and an uppercase letter, digit, or opening quote ends a
//! sentence, unless the period belongs to a known abbreviation. Markdown
//! headings are dropped and list items become their own sentences.

use std::collections::HashSet;

const ABBREVIATIONS: &[&str] = &[
    "e.g", "i.e", "etc", "vs", "mr", "mrs", "ms", "dr", "prof", "fig", "no", "approx", "cf",
    "inc", "ltd", "st", "chap", "sec", "vol", "ca", "max", "min",
];

const STOPWORDS: &[&str] = &[
    "a", "an", "and", "are", "as", "at", "be", "by", "for", "from", "has", "have", "in", "is",
    "it", "its", "of", "on", "or", "that", "the", "this", "to", "was", "were", "will", "with",
    "you", "your", "can", "not", "but", "if", "so", "do", "does", "than", "then", "there",
    "these", "those", "which", "who", "when", "what", "how", "all", "any", "into", "also",
];

/// Split prose into sentences.
pub fn split_sentences(text: &str) -> Vec<String> {
    let mut sentences = Vec::new();
    for unit in logical_lines(text) {
        split_unit(&unit, &mut sentences);
    }
    sentences
}

/// Join wrapped lines back into paragraphs; headings are skipped and each
/// list item or colon-terminated lead-in starts a new unit.
fn logical_lines(text: &str) -> Vec<String> {
    let mut units = Vec::new();
    for para in text.split("\n\n") {
        let mut buf = String::new();
        for line in para.lines() {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            if trimmed.starts_with('#') {
                if !buf.is_empty() {
                    units.push(std::mem::take(&mut buf));
                }
                continue;
            }
            let item = strip_list_marker(trimmed);
            let starts_new = item.len() != trimmed.len() || buf.ends_with(':');
            if starts_new && !buf.is_empty() {
                units.push(std::mem::take(&mut buf));
            }
            if !buf.is_empty() {
                buf.push(' ');
            }
            buf.push_str(item);
        }
        if !buf.is_empty() {
            units.push(buf);
        }
    }
    units
}

fn strip_list_marker(line: &str) -> &str {
    for marker in ["- ", "* ", "+ "] {
        if let Some(rest) = line.strip_prefix(marker) {
            return rest.trim_start();
        }
    }
    let digits = line.chars().take_while(|c| c.is_ascii_digit()).count();
    if digits > 0 {
        let rest = &line[digits..];
        if let Some(rest) = rest.strip_prefix(". ").or_else(|| rest.strip_prefix(") ")) {
            return rest.trim_start();
        }
    }
    line
}

fn split_unit(unit: &str, out: &mut Vec<String>) {
    let chars: Vec<(usize, char)> = unit.char_indices().collect();
    let mut start = 0usize;

    for (pos, &(byte, c)) in chars.iter().enumerate() {
        if !matches!(c, '.' | '!' | '?') || byte < start {
            continue;
        }
        let mut end_pos = pos + 1;
        while end_pos < chars.len() && matches!(chars[end_pos].1, '"' | '\'' | ')' | '”' | '’') {
            end_pos += 1;
        }
        let Some(&(end_byte, next)) = chars.get(end_pos) else {
            continue;
        };
        if !next.is_whitespace() {
            continue;
        }
        let following = chars[end_pos..]
            .iter()
            .map(|(_, ch)| *ch)
            .find(|ch| !ch.is_whitespace());
        let Some(following) = following else {
            continue;
        };
        let opens_sentence = following.is_uppercase()
            || following.is_ascii_digit()
            || matches!(following, '"' | '\'' | '(' | '“');
        if !opens_sentence {
            continue;
        }
        if c == '.' && is_abbreviation(&unit[start..byte]) {
            continue;
        }
        let sentence = unit[start..end_byte].trim();
        if !sentence.is_empty() {
            out.push(sentence.to_string());
        }
        start = end_byte;
    }

    let rest = unit[start..].trim();
    if !rest.is_empty() {
        out.push(rest.to_string());
    }
}

fn is_abbreviation(before_period: &str) -> bool {
    let last = before_period
        .rsplit(char::is_whitespace)
        .next()
        .unwrap_or_default()
        .trim_start_matches(['(', '"', '\''])
        .to_lowercase();
    if last.chars().count() == 1 && last.chars().all(char::is_alphabetic) {
        return true;
    }
    ABBREVIATIONS.contains(&last.as_str())
}

/// Whitespace-delimited word count.
pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Lowercased alphanumeric terms of at least two characters, without
/// stopwords. Used for lexical scoring.
pub fn tokenize(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| t.chars().count() >= 2)
        .map(str::to_lowercase)
        .filter(|t| !STOPWORDS.contains(&t.as_str()))
        .collect()
}

/// Words with their byte offsets, surrounding punctuation trimmed.
/// Internal hyphens and apostrophes are kept (`"e-mail"`, `"don't"`).
pub fn word_spans(text: &str) -> Vec<(usize, &str)> {
    let mut out = Vec::new();
    let mut offset = 0usize;
    for raw in text.split_inclusive(char::is_whitespace) {
        let start = offset;
        offset += raw.len();
        let lead = raw.len() - raw.trim_start_matches(|c: char| !c.is_alphanumeric()).len();
        let word = raw.trim_matches(|c: char| !c.is_alphanumeric());
        if !word.is_empty() {
            out.push((start + lead, word));
        }
    }
    out
}

/// Lowercased words with surrounding punctuation removed.
pub fn normalized_words(text: &str) -> Vec<String> {
    text.split_whitespace()
        .map(|w| w.trim_matches(|c: char| !c.is_alphanumeric()).to_lowercase())
        .filter(|w| !w.is_empty())
        .collect()
}

/// Jaccard overlap of the two texts' word sets, in `[0, 1]`.
pub fn word_overlap(a: &str, b: &str) -> f64 {
    let a: HashSet<String> = normalized_words(a).into_iter().collect();
    let b: HashSet<String> = normalized_words(b).into_iter().collect();
    if a.is_empty() && b.is_empty() {
        return 1.0;
    }
    let shared = a.intersection(&b).count() as f64;
    let union = a.union(&b).count() as f64;
    shared / union
}

/// True when the last non-closing character is `.`, `!`, or `?`.
pub fn ends_with_terminal(text: &str) -> bool {
    text.trim_end()
        .trim_end_matches(['"', '\'', ')', '”', '’'])
        .ends_with(['.', '!', '?'])
}

/// Split off trailing terminal punctuation: `("Body", ".")`.
pub fn split_terminal(text: &str) -> (&str, &str) {
    let trimmed = text.trim_end();
    let body = trimmed.trim_end_matches(['.', '!', '?', ':', ';']);
    (body.trim_end(), &trimmed[body.len()..])
}

/// Ensure the text ends with terminal punctuation, appending a period.
pub fn with_period(text: &str) -> String {
    let trimmed = text.trim().trim_end_matches([',', ';', ':']);
    if ends_with_terminal(trimmed) {
        trimmed.to_string()
    } else {
        format!("{}.", trimmed)
    }
}

pub fn capitalize_first(text: &str) -> String {
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Lowercase the first character unless the first word is an acronym or
/// otherwise mixed-case (`"IE app"`, `"iPhone"`) or the pronoun `"I"`.
pub fn lowercase_first(text: &str) -> String {
    let first_word = text.split_whitespace().next().unwrap_or_default();
    let keep = first_word == "I"
        || first_word.starts_with("I'")
        || first_word
            .chars()
            .skip(1)
            .any(|c| c.is_uppercase() || c.is_ascii_digit());
    if keep {
        return text.to_string();
    }
    let mut chars = text.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

/// Collapse runs of whitespace into single spaces.
pub fn squash_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_basic_sentences() {
        let s = split_sentences("The app starts. Then it loads data! Does it work? Yes.");
        assert_eq!(
            s,
            vec!["The app starts.", "Then it loads data!", "Does it work?", "Yes."]
        );
    }

    #[test]
    fn test_split_respects_abbreviations() {
        let s = split_sentences("Use a format, e.g. JSON or TOML. Save the file.");
        assert_eq!(s.len(), 2, "got {:?}", s);
        assert!(s[0].contains("e.g. JSON"));
    }

    #[test]
    fn test_split_colon_lead_in_and_list() {
        let text = "The following requirement must be met:\n- Access to the IED on which the IE app is installed.";
        let s = split_sentences(text);
        assert_eq!(
            s,
            vec![
                "The following requirement must be met:",
                "Access to the IED on which the IE app is installed."
            ]
        );
    }

    #[test]
    fn test_split_skips_headings_and_joins_wrapped_lines() {
        let text = "# Setup\n\nOpen the settings\ndialog first. Then save.";
        let s = split_sentences(text);
        assert_eq!(s, vec!["Open the settings dialog first.", "Then save."]);
    }

    #[test]
    fn test_tokenize_drops_stopwords_and_case() {
        assert_eq!(tokenize("The Passive voice is weak"), vec!["passive", "voice", "weak"]);
    }

    #[test]
    fn test_lowercase_first_keeps_acronyms() {
        assert_eq!(lowercase_first("Access to the IED"), "access to the IED");
        assert_eq!(lowercase_first("IE apps run"), "IE apps run");
        assert_eq!(lowercase_first("I agree"), "I agree");
    }

    #[test]
    fn test_terminal_helpers() {
        assert!(ends_with_terminal("Done.\""));
        assert!(!ends_with_terminal("Not done,"));
        assert_eq!(split_terminal("It works."), ("It works", "."));
        assert_eq!(with_period("It works,"), "It works.");
    }

    #[test]
    fn test_word_spans_offsets() {
        let text = "Send the e-mail, (now).";
        let spans = word_spans(text);
        let words: Vec<&str> = spans.iter().map(|(_, w)| *w).collect();
        assert_eq!(words, vec!["Send", "the", "e-mail", "now"]);
        for (start, word) in spans {
            assert_eq!(&text[start..start + word.len()], word);
        }
    }

    #[test]
    fn test_word_overlap_bounds() {
        assert!((word_overlap("a b c", "a b c") - 1.0).abs() < 1e-9);
        assert_eq!(word_overlap("a b", "c d"), 0.0);
    }
}
