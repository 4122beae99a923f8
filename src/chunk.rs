//! Heading- and paragraph-aware knowledge chunker.
//!
//! Splits a reference document into [`KnowledgeChunk`]s of roughly 2–8
//! sentences and 128–400 tokens. Markdown headings (`#`..`######`) start a
//! new section and always close the current chunk; blank lines close it
//! once the minimum size is reached.
//!
//! Each chunk's `content_hash` is the SHA-256 of its whitespace-normalized
//! text and its ID is a UUIDv5 of that hash, so re-ingesting identical
//! content produces identical chunks and the index can skip them.
//!
//! # Algorithm
//!
//! 1. Walk the document line by line, tracking the current section title.
//! 2. Split each paragraph into sentences.
//! 3. Append sentences to a buffer, flushing before `max_sentences` or
//!    `max_tokens` would be exceeded.
//! 4. At a paragraph end, flush once both minimums are met.
//! 5. At a section end, flush; an undersized tail merges into the previous
//!    chunk of the same section when it still fits.

use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::config::ChunkingConfig;
use crate::lexicon::ISSUE_TAG_CUES;
use crate::models::{KnowledgeChunk, ReferenceDocument};
use crate::text::{split_sentences, squash_whitespace};

/// Approximate characters-per-token ratio.
const CHARS_PER_TOKEN: usize = 4;

pub fn estimate_tokens(text: &str) -> usize {
    text.chars().count().div_ceil(CHARS_PER_TOKEN)
}

struct Pending {
    section: String,
    /// `(sentence, starts_paragraph)`
    sentences: Vec<(String, bool)>,
    tokens: usize,
}

impl Pending {
    fn new(section: &str) -> Self {
        Self {
            section: section.to_string(),
            sentences: Vec::new(),
            tokens: 0,
        }
    }

    fn text(&self) -> String {
        let mut out = String::new();
        for (i, (sentence, starts_paragraph)) in self.sentences.iter().enumerate() {
            if i > 0 {
                out.push_str(if *starts_paragraph { "\n\n" } else { " " });
            }
            out.push_str(sentence);
        }
        out
    }
}

struct Chunker<'a> {
    cfg: &'a ChunkingConfig,
    done: Vec<Pending>,
    current: Pending,
}

impl<'a> Chunker<'a> {
    fn push_sentence(&mut self, sentence: String, starts_paragraph: bool) {
        let tokens = estimate_tokens(&sentence);
        let full = self.current.sentences.len() >= self.cfg.max_sentences
            || self.current.tokens + tokens > self.cfg.max_tokens;
        if full && !self.current.sentences.is_empty() {
            self.flush();
        }
        let starts_paragraph = starts_paragraph && !self.current.sentences.is_empty();
        self.current.sentences.push((sentence, starts_paragraph));
        self.current.tokens += tokens;
    }

    fn end_paragraph(&mut self) {
        if self.current.sentences.len() >= self.cfg.min_sentences
            && self.current.tokens >= self.cfg.min_tokens
        {
            self.flush();
        }
    }

    fn end_section(&mut self, next_section: &str) {
        if !self.current.sentences.is_empty() && self.current.sentences.len() < self.cfg.min_sentences {
            if let Some(prev) = self.done.last_mut() {
                let fits = prev.section == self.current.section
                    && prev.sentences.len() + self.current.sentences.len() <= self.cfg.max_sentences
                    && prev.tokens + self.current.tokens <= self.cfg.max_tokens;
                if fits {
                    let tail = std::mem::replace(&mut self.current, Pending::new(next_section));
                    let mut sentences = tail.sentences.into_iter();
                    if let Some((first, _)) = sentences.next() {
                        prev.sentences.push((first, true));
                    }
                    prev.sentences.extend(sentences);
                    prev.tokens += tail.tokens;
                    return;
                }
            }
        }
        self.flush();
        self.current.section = next_section.to_string();
    }

    fn flush(&mut self) {
        if self.current.sentences.is_empty() {
            return;
        }
        let section = self.current.section.clone();
        self.done
            .push(std::mem::replace(&mut self.current, Pending::new(&section)));
    }
}

/// Split a reference document into knowledge chunks.
///
/// Malformed input (blank body, binary content) is logged and yields an
/// empty list; this function never fails.
pub fn chunk_document(doc: &ReferenceDocument, cfg: &ChunkingConfig) -> Vec<KnowledgeChunk> {
    if doc.body.trim().is_empty() {
        tracing::warn!(source = %doc.source_id, "reference document is empty, nothing to chunk");
        return Vec::new();
    }
    if looks_binary(&doc.body) {
        tracing::warn!(source = %doc.source_id, "reference document looks binary, skipping");
        return Vec::new();
    }

    let initial_section = doc.title.clone().unwrap_or_default();
    let mut chunker = Chunker {
        cfg,
        done: Vec::new(),
        current: Pending::new(&initial_section),
    };

    let mut paragraph = String::new();
    for line in doc.body.lines().chain(std::iter::once("")) {
        let trimmed = line.trim();
        if let Some(title) = heading_title(trimmed) {
            feed_paragraph(&mut chunker, &paragraph);
            paragraph.clear();
            chunker.end_section(title);
            continue;
        }
        if trimmed.is_empty() {
            feed_paragraph(&mut chunker, &paragraph);
            paragraph.clear();
            continue;
        }
        paragraph.push_str(line);
        paragraph.push('\n');
    }
    chunker.end_section("");

    chunker
        .done
        .into_iter()
        .enumerate()
        .map(|(i, pending)| make_chunk(doc, i as i64, &pending))
        .collect()
}

fn feed_paragraph(chunker: &mut Chunker<'_>, paragraph: &str) {
    if paragraph.trim().is_empty() {
        return;
    }
    for (i, sentence) in split_sentences(paragraph).into_iter().enumerate() {
        chunker.push_sentence(sentence, i == 0);
    }
    chunker.end_paragraph();
}

fn heading_title(line: &str) -> Option<&str> {
    let hashes = line.chars().take_while(|c| *c == '#').count();
    if !(1..=6).contains(&hashes) {
        return None;
    }
    let rest = &line[hashes..];
    if !rest.starts_with(' ') {
        return None;
    }
    Some(rest.trim())
}

fn looks_binary(body: &str) -> bool {
    if body.contains('\0') {
        return true;
    }
    let total = body.chars().count().max(1);
    let control = body
        .chars()
        .filter(|c| c.is_control() && !c.is_whitespace())
        .count();
    control * 10 > total
}

fn make_chunk(doc: &ReferenceDocument, index: i64, pending: &Pending) -> KnowledgeChunk {
    let text = pending.text();
    let mut hasher = Sha256::new();
    hasher.update(squash_whitespace(&text).as_bytes());
    let hash = format!("{:x}", hasher.finalize());

    KnowledgeChunk {
        id: Uuid::new_v5(&Uuid::NAMESPACE_OID, hash.as_bytes()).to_string(),
        source_id: doc.source_id.clone(),
        section_title: pending.section.clone(),
        chunk_index: index,
        token_count: estimate_tokens(&text),
        tags: derive_tags(doc, &pending.section, &text),
        text,
        embedding: Vec::new(),
        document_type: doc.document_type,
        content_hash: hash,
        ingested_at: doc.updated_at,
    }
}

/// Document type, caller tags, and issue kinds the chunk talks about.
fn derive_tags(doc: &ReferenceDocument, section: &str, text: &str) -> Vec<String> {
    let haystack = format!("{}\n{}", section, text).to_lowercase();
    let mut tags: Vec<String> = vec![doc.document_type.as_str().to_string()];
    tags.extend(doc.tags.iter().map(|t| t.to_lowercase()));
    for (cue, tag) in ISSUE_TAG_CUES {
        if haystack.contains(cue) {
            tags.push(tag.to_string());
        }
    }
    tags.sort();
    tags.dedup();
    tags
}

/// Text sent to the embedder: section and source metadata prefixed to the
/// chunk body.
pub fn embedding_text(chunk: &KnowledgeChunk) -> String {
    format!(
        "source: {}\nsection: {}\n\n{}",
        chunk.source_id, chunk.section_title, chunk.text
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small_cfg() -> ChunkingConfig {
        ChunkingConfig {
            min_sentences: 2,
            max_sentences: 8,
            min_tokens: 10,
            max_tokens: 400,
        }
    }

    fn doc(body: &str) -> ReferenceDocument {
        let mut d = ReferenceDocument::new("guide.md", body);
        d.updated_at = 1_700_000_000;
        d
    }

    const GUIDE: &str = "# Active voice\n\n\
        Prefer the active voice in procedures. Passive constructions hide who acts. \
        Name the actor first.\n\n\
        # Sentence length\n\n\
        Keep sentences under 25 words. Split long sentences at conjunctions. \
        One idea per sentence is easier to translate.";

    #[test]
    fn test_headings_start_new_chunks() {
        let chunks = chunk_document(&doc(GUIDE), &small_cfg());
        assert_eq!(chunks.len(), 2, "chunks: {:?}", chunks.iter().map(|c| &c.text).collect::<Vec<_>>());
        assert_eq!(chunks[0].section_title, "Active voice");
        assert_eq!(chunks[1].section_title, "Sentence length");
        assert!(chunks[0].tags.contains(&"passive-voice".to_string()));
        assert!(chunks[1].tags.contains(&"long-sentence".to_string()));
    }

    #[test]
    fn test_indices_contiguous() {
        let body = (0..40)
            .map(|i| format!("Rule number {} keeps prose direct and short.", i))
            .collect::<Vec<_>>()
            .join(" ");
        let chunks = chunk_document(&doc(&body), &small_cfg());
        assert!(chunks.len() >= 5);
        for (i, c) in chunks.iter().enumerate() {
            assert_eq!(c.chunk_index, i as i64);
        }
    }

    #[test]
    fn test_sentence_bounds() {
        let body = (0..30)
            .map(|i| format!("Guideline {} says to write plainly.", i))
            .collect::<Vec<_>>()
            .join(" ");
        for c in chunk_document(&doc(&body), &small_cfg()) {
            let n = split_sentences(&c.text).len();
            assert!((2..=8).contains(&n), "chunk has {} sentences: {}", n, c.text);
        }
    }

    #[test]
    fn test_token_limit_flushes() {
        let cfg = ChunkingConfig {
            min_sentences: 1,
            max_sentences: 8,
            min_tokens: 1,
            max_tokens: 20,
        };
        let body = "This sentence is roughly forty characters. \
                    This sentence is roughly forty characters too. \
                    And this third sentence is also about that.";
        let chunks = chunk_document(&doc(body), &cfg);
        assert!(chunks.len() >= 2);
        for c in &chunks {
            assert!(c.token_count <= 20 || split_sentences(&c.text).len() == 1);
        }
    }

    #[test]
    fn test_short_tail_merges_into_previous() {
        let cfg = ChunkingConfig {
            min_sentences: 2,
            max_sentences: 8,
            min_tokens: 1,
            max_tokens: 400,
        };
        let body = "# Tone\n\nBe direct. Be kind.\n\nAvoid jargon.";
        let chunks = chunk_document(&doc(body), &cfg);
        assert_eq!(chunks.len(), 1);
        assert!(chunks[0].text.ends_with("Avoid jargon."));
    }

    #[test]
    fn test_deterministic_ids_and_hashes() {
        let a = chunk_document(&doc(GUIDE), &small_cfg());
        let b = chunk_document(&doc(GUIDE), &small_cfg());
        assert_eq!(a.len(), b.len());
        for (x, y) in a.iter().zip(b.iter()) {
            assert_eq!(x.id, y.id);
            assert_eq!(x.content_hash, y.content_hash);
        }
    }

    #[test]
    fn test_malformed_input_yields_no_chunks() {
        assert!(chunk_document(&doc("   \n\n  "), &small_cfg()).is_empty());
        assert!(chunk_document(&doc("bin\0ary\u{1}\u{2}\u{3}"), &small_cfg()).is_empty());
    }

    #[test]
    fn test_embedding_text_has_metadata_prefix() {
        let chunks = chunk_document(&doc(GUIDE), &small_cfg());
        let text = embedding_text(&chunks[0]);
        assert!(text.starts_with("source: guide.md\nsection: Active voice"));
    }
}
