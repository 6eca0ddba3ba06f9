//! Cross-crate integration tests
//!
//! Everything runs against the real pipeline tasks spawned by
//! `BlockProducerBuilder`, wired to the in-memory adapters.

#[cfg(test)]
mod fixtures;
pub mod sealing_pipeline;
