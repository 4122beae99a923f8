use crate::detect::article_mismatch;
use crate::text::word_spans;

use super::RuleContext;

/// `"Open the the file"` → `"Open the file"`.
pub(super) fn collapse_repeated(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    let mut out = String::with_capacity(sentence.len());
    let mut cursor = 0;
    for pair in words.windows(2) {
        let (s1, w1) = pair[0];
        let (s2, w2) = pair[1];
        let between = &sentence[s1 + w1.len()..s2];
        let repeated = w1.eq_ignore_ascii_case(w2)
            && w1.chars().all(char::is_alphabetic)
            && !matches!(w1.to_lowercase().as_str(), "that" | "had");
        if repeated && between.trim().is_empty() && s1 >= cursor {
            out.push_str(&sentence[cursor..s1 + w1.len()]);
            cursor = s2 + w2.len();
        }
    }
    if cursor == 0 {
        return None;
    }
    out.push_str(&sentence[cursor..]);
    Some(out)
}

/// Swap `a`/`an` where the following word's sound calls for the other.
pub(super) fn fix_articles(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    let mut out = String::with_capacity(sentence.len() + 4);
    let mut cursor = 0;
    for pair in words.windows(2) {
        let (s1, article) = pair[0];
        let (s2, next) = pair[1];
        if !sentence[s1 + article.len()..s2].trim().is_empty() || !article_mismatch(article, next) {
            continue;
        }
        let replacement = match article {
            "a" => "an",
            "A" => "An",
            "an" => "a",
            "An" | "AN" => "A",
            _ => continue,
        };
        out.push_str(&sentence[cursor..s1]);
        out.push_str(replacement);
        cursor = s1 + article.len();
    }
    if cursor == 0 {
        return None;
    }
    out.push_str(&sentence[cursor..]);
    Some(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{DocumentType, Issue, IssueKind};
    use crate::transform::SubjectPolicy;

    fn run(f: fn(&str, &RuleContext<'_>) -> Option<String>, s: &str) -> Option<String> {
        let issue = Issue::whole_sentence(IssueKind::Grammar, s);
        let policy = SubjectPolicy::default();
        let ctx = RuleContext {
            issue: &issue,
            policy: &policy,
            document_type: DocumentType::General,
        };
        f(s, &ctx)
    }

    #[test]
    fn test_collapse_repeated() {
        assert_eq!(
            run(collapse_repeated, "Open the the file.").as_deref(),
            Some("Open the file.")
        );
        assert!(run(collapse_repeated, "Open the file.").is_none());
    }

    #[test]
    fn test_fix_articles() {
        assert_eq!(
            run(fix_articles, "A error occurs in an module.").as_deref(),
            Some("An error occurs in a module.")
        );
        assert!(run(fix_articles, "An hour is a unit.").is_none());
    }
}
