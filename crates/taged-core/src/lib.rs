//! Taged Core Types
//!
//! This crate provides the domain types shared by the taged client:
//! - Note search filter and its query-string codec
//! - Notes, drafts and pagination
//! - User profile, permissions and credentials
//! - Thumbnail naming and size formatting helpers

pub mod error;
pub mod filter;
pub mod format;
pub mod note;
pub mod thumbnails;
pub mod user;

pub use error::{Error, Result};
pub use filter::{NoteSearchFilter, QueryValue};
pub use note::{DetailNote, Note, NoteDraft, NoteFile, NoteValidation, NotesPage, Paginator};
pub use user::{Credentials, StoredSession, User, UserPermissions};
