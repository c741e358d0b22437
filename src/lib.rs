//! # Claim Advisor
//!
//! A construction-claim advisory assistant. Project documents filed under
//! six categories are extracted, chunked and embedded into a vector
//! collection; a language model surfaces the top five claim risks; each risk
//! can then be discussed in a retrieval-augmented chat that answers from
//! the contractor, owner and arbitrator viewpoints.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────┐   ┌───────────┐   ┌────────────┐   ┌──────────┐
//! │ Uploads  │──▶│ Extractor │──▶│  Indexer   │──▶│  SQLite  │
//! │ 6 categ. │   │ pdf/docx/ │   │ chunk+embed│   │ vectors  │
//! └──────────┘   │ xlsx/txt  │   └────────────┘   └────┬─────┘
//!                └─────┬─────┘                         │
//!                      ▼                               ▼
//!               ┌──────────────┐               ┌──────────────┐
//!               │Risk Extractor│               │  Retriever   │
//!               │  top 5 risks │               └──────┬───────┘
//!               └──────┬───────┘                      ▼
//!                      └────────────────────▶ ┌──────────────┐
//!                                             │Chat Responder│
//!                                             └──────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```bash
//! cadv init
//! cadv analyze --input ./project-docs
//! cadv chat --file contract=./gcc.pdf --file daily=./site-log.xlsx
//! cadv search "notice of delay"
//! ```
//!
//! ## Modules
//!
//! | Module | Purpose |
//! |--------|---------|
//! | [`config`] | TOML configuration parsing |
//! | [`models`] | Core data types |
//! | [`extract`] | Text extraction from PDF, DOCX, XLSX and TXT |
//! | [`chunk`] | Overlapping token-window chunking |
//! | [`embedding`] | Embedding provider abstraction |
//! | [`store`] | Vector collections (SQLite and in-memory) |
//! | [`index`] | Reset-and-repopulate indexing |
//! | [`retrieve`] | Nearest-neighbour retrieval |
//! | [`llm`] | Chat-completion client |
//! | [`prompts`] | Prompt templates and rendering |
//! | [`risk`] | Top-five risk extraction |
//! | [`chat`] | RAG answers and follow-up questions |
//! | [`session`] | Session state machine |
//! | [`scan`] | Input directory scanning |
//! | [`console`] | `analyze` and `chat` commands |
//! | [`db`] | Database connection |
//! | [`migrate`] | Schema migrations |

pub mod chat;
pub mod chunk;
pub mod config;
pub mod console;
pub mod db;
pub mod embedding;
pub mod extract;
pub mod index;
pub mod llm;
pub mod migrate;
pub mod models;
pub mod prompts;
pub mod retrieve;
pub mod risk;
pub mod scan;
pub mod session;
pub mod store;
