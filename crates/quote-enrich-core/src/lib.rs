//! # quote-enrich core
//!
//! Runtime-free logic shared by the `qenrich` binary and anything else that
//! reads an enriched quote dataset: the quote model, the tag→emotion
//! classifier, the annotator contract, the dataset store abstraction, and
//! exploration helpers (filters, pagination, statistics).
//!
//! This crate has no tokio, HTTP, or filesystem dependencies. Concrete
//! annotators and the file-backed store live in the `quote-enrich` crate.

pub mod annotate;
pub mod emotion;
pub mod error;
pub mod explore;
pub mod models;
pub mod store;
