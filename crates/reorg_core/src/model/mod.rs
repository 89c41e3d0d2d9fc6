//! Domain model for extracted notes.
//!
//! # Responsibility
//! - Define the structured note record shared by every pipeline phase.
//! - Own the pure key-derivation function.
//!
//! # Invariants
//! - A note's identity inside the manifest is its derived key, never its
//!   source id.

pub mod note;
