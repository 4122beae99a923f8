//! Just enough English verb morphology for voice and clause rewrites.

use crate::lexicon::{E_FINAL_VERBS, IMPERATIVE_VERBS, IRREGULAR_VERBS, PURPOSE_VERBS};

fn restores_e(stem: &str) -> bool {
    let with_e = format!("{}e", stem);
    [E_FINAL_VERBS, IMPERATIVE_VERBS, PURPOSE_VERBS]
        .iter()
        .any(|list| list.contains(&with_e.as_str()))
}

fn undouble(stem: &str) -> Option<&str> {
    let bytes = stem.as_bytes();
    let n = bytes.len();
    if n >= 4 && bytes[n - 1] == bytes[n - 2] && !b"lsz".contains(&bytes[n - 1]) && bytes[n - 1].is_ascii_alphabetic() {
        Some(&stem[..n - 1])
    } else {
        None
    }
}

/// `"configured"` → `"configure"`, `"written"` → `"write"`.
pub fn base_form(participle: &str) -> String {
    let p = participle.to_lowercase();
    if let Some((_, _, base)) = IRREGULAR_VERBS.iter().find(|(part, _, _)| *part == p) {
        return base.to_string();
    }
    if p.len() > 4 && p.ends_with("ied") {
        return format!("{}y", &p[..p.len() - 3]);
    }
    let Some(stem) = p.strip_suffix("ed") else {
        return p;
    };
    if restores_e(stem) {
        return format!("{}e", stem);
    }
    undouble(stem).unwrap_or(stem).to_string()
}

/// Simple past from a participle: regular verbs are unchanged.
pub fn past_tense(participle: &str) -> String {
    let p = participle.to_lowercase();
    IRREGULAR_VERBS
        .iter()
        .find(|(part, _, _)| *part == p)
        .map(|(_, past, _)| past.to_string())
        .unwrap_or(p)
}

/// Third-person singular present: `"install"` → `"installs"`.
pub fn third_person(base: &str) -> String {
    match base {
        "have" => return "has".to_string(),
        "be" => return "is".to_string(),
        _ => {}
    }
    let ends_consonant_y = base.len() > 1
        && base.ends_with('y')
        && !base[..base.len() - 1].ends_with(['a', 'e', 'i', 'o', 'u']);
    if ends_consonant_y {
        format!("{}ies", &base[..base.len() - 1])
    } else if base.ends_with(['s', 'x', 'z', 'o']) || base.ends_with("ch") || base.ends_with("sh") {
        format!("{}es", base)
    } else {
        format!("{}s", base)
    }
}

/// `"allowing"` → `"allow"`, `"enabling"` → `"enable"`.
pub fn base_from_ing(word: &str) -> Option<String> {
    let w = word.to_lowercase();
    let stem = w.strip_suffix("ing")?;
    if stem.len() < 2 {
        return None;
    }
    if restores_e(stem) {
        return Some(format!("{}e", stem));
    }
    Some(undouble(stem).unwrap_or(stem).to_string())
}
