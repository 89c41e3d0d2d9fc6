//! Core use-case services.
//!
//! # Responsibility
//! - Compose parsing, manifest access and bulk writes into use-case APIs.
//! - Keep the CLI decoupled from filesystem and executor details.

pub mod note_service;

pub use note_service::{NoteService, NoteServiceError, NoteServiceResult};
