//! Core pipeline and domain logic for newsdigest.
//!
//! This crate ties together language resolution, document collection,
//! prompt composition, local model inference, and document assembly into
//! one run (see [`pipeline::run`]).

pub mod assembler;
pub mod inference;
pub mod language;
pub mod output;
pub mod pipeline;
pub mod prompt;
