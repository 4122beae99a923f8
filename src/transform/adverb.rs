use crate::detect::misplaced_limiter;
use crate::lexicon::{is_one_of, POSITION_SENSITIVE_ADVERBS, WEAK_ADVERBS};
use crate::text::word_spans;

use super::RuleContext;

/// `"You can only access the logs"` → `"You can access only the logs"`:
/// the limiter moves in front of the noun phrase right after the verb.
pub(super) fn reposition_limiter(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let words = word_spans(sentence);
    let i = (0..words.len())
        .find(|&i| is_one_of(words[i].1, POSITION_SENSITIVE_ADVERBS) && misplaced_limiter(&words, i))?;
    let (adv_start, adverb) = words[i];
    let (verb_start, verb) = words[i + 1];
    let (object_start, _) = words[i + 2];
    Some(format!(
        "{}{} {} {}",
        &sentence[..adv_start],
        &sentence[verb_start..verb_start + verb.len()],
        adverb.to_lowercase(),
        &sentence[object_start..]
    ))
}

/// Drop intensifiers ("very", "really", ...) and the space after them.
pub(super) fn remove_weak(sentence: &str, _ctx: &RuleContext<'_>) -> Option<String> {
    let mut out = String::with_capacity(sentence.len());
    let mut cursor = 0;
    let mut removed = false;
    for (start, word) in word_spans(sentence) {
        if !is_one_of(word, WEAK_ADVERBS) || start < cursor {
            continue;
        }
        out.push_str(&sentence[cursor..start]);
        let end = start + word.len();
        let rest = &sentence[end..];
        cursor = end + (rest.len() - rest.trim_start().len());
        removed = true;
    }
    if !removed {
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
        let issue = Issue::whole_sentence(IssueKind::Adverb, s);
        let policy = SubjectPolicy::default();
        let ctx = RuleContext {
            issue: &issue,
            policy: &policy,
            document_type: DocumentType::General,
        };
        f(s, &ctx)
    }

    #[test]
    fn test_reposition_only() {
        assert_eq!(
            run(reposition_limiter, "You can only access the logs from the portal.").as_deref(),
            Some("You can access only the logs from the portal.")
        );
        assert!(run(reposition_limiter, "Only admins can edit it.").is_none());
    }

    #[test]
    fn test_remove_weak() {
        assert_eq!(
            run(remove_weak, "The update is very really fast.").as_deref(),
            Some("The update is fast.")
        );
        assert!(run(remove_weak, "The update is fast.").is_none());
    }
}
