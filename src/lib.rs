//! # Prose Harness
//!
//! A local-first writing assistant: rule-based issue detection plus a
//! suggestion cascade that is grounded in a knowledge base of style
//! guidance.
//!
//! Detection is cheap pattern matching. The work is in turning a flagged
//! sentence into one concise, well-typed rewrite even when the knowledge
//! index is empty, the local inference service is down, or the model
//! answers in the wrong format.
//!
//! ## Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────────┐   ┌──────────────┐
//! │ Reference  │──▶│ Chunk+Embed │──▶│ SQLite store │
//! │ documents  │   │  (ingest)   │   │ + snapshot   │
//! └────────────┘   └─────────────┘   └──────┬───────┘
//!                                           │ hybrid retrieval
//! ┌────────────┐   ┌─────────────┐   ┌──────▼───────┐
//! │  Detector  │──▶│ Orchestrator│──▶│  Validator   │──▶ SuggestionResult
//! │  (rules)   │   │  (cascade)  │   │ (normalize)  │
//! └────────────┘   └──────┬──────┘   └──────────────┘
//!                         │ last resort
//!                  ┌──────▼──────┐
//!                  │ Transformer │
//!                  │ (rule table)│
//!                  └─────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! prose init                          # create database
//! prose ingest ./style-guide          # index reference documents
//! prose check "The file was saved."   # list detected issues
//! prose suggest "The file was saved by the user." --issue passive-voice
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`error`] | Stage failure taxonomy |
//! | [`text`] | Sentence splitting and word helpers |
//! | [`lexicon`] | Word lists used by detection and rewriting |
//! | [`detect`] | Rule-based issue detection |
//! | [`transform`] | Deterministic rewrite rule table |
//! | [`chunk`] | Section-aware document chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`index`] | Immutable knowledge index snapshots |
//! | [`cache`] | Retrieval result cache |
//! | [`retrieve`] | Hybrid lexical + semantic retrieval |
//! | [`connector_fs`] | Filesystem reference documents |
//! | [`ingest`] | Chunk, embed, persist and publish |
//! | [`store`] | Chunk persistence |
//! | [`llm`] | Local inference client |
//! | [`prompt`] | Grounded prompt construction |
//! | [`generate`] | Generative rewriting |
//! | [`validate`] | Output normalization |
//! | [`orchestrator`] | Suggestion cascade |
//! | [`harness`] | Top-level wiring |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |
//! | [`logger`] | Logging setup |

pub mod cache;
pub mod chunk;
pub mod config;
pub mod connector_fs;
pub mod db;
pub mod detect;
pub mod embedding;
pub mod error;
pub mod generate;
pub mod harness;
pub mod index;
pub mod ingest;
pub mod lexicon;
pub mod llm;
pub mod logger;
pub mod migrate;
pub mod models;
pub mod orchestrator;
pub mod prompt;
pub mod retrieve;
pub mod store;
pub mod text;
pub mod transform;
pub mod validate;

pub use harness::ProseHarness;
