//! # Shared Types Crate
//!
//! Chain entities shared by the block production pipeline and the
//! collaborators it talks to (chain store, transaction source, consensus
//! engines).
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: Every cross-crate type is defined here.
//! - **Stable Seal Identity**: `Header::seal_hash` excludes the seal so that
//!   differently-sealed copies of one candidate share a key.

pub mod entities;

pub use entities::*;
