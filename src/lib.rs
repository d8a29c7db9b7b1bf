//! # codeask — retrieval-augmented Q&A over your codebases
//!
//! Clones configured GitHub repositories, embeds their source files locally
//! with an ONNX MiniLM model, persists a flat JSON snapshot of the vectors,
//! and answers natural-language questions by retrieving the most similar
//! files and forwarding them as context to a hosted chat model.
//!
//! ## Architecture
//!
//! - **[`config`]** — Configuration loading, validation, and env secrets
//! - **[`embedder`]** — Text embedding via ONNX Runtime (all-MiniLM-L6-v2)
//! - **[`store`]** — Flat-file vector store: snapshot load/save + cosine top-K search
//! - **[`ingest`]** — Clone repositories, discover source files, build the snapshot
//! - **[`chat`]** — OpenRouter chat completion client (answer composer)

pub mod chat;
pub mod config;
pub mod embedder;
pub mod ingest;
pub mod store;
