//! Document reading assistant.
//!
//! A document is uploaded to a backend that splits it into segments; segments
//! are spoken one at a time through a remote text-to-speech service while the
//! reader tracks the spoken word, the current page, bookmarks, and questions
//! asked about the surrounding text.

pub mod api;
pub mod app;
pub mod assistant;
pub mod audio;
pub mod bookmarks;
pub mod cache;
pub mod cancellation;
pub mod config;
pub mod document;
pub mod error;
pub mod pagination;
pub mod playback;
pub mod settings;
pub mod text_utils;

pub use app::{Command, Notice, ReaderApp, ReaderSnapshot};
pub use error::{ReaderError, Result};
