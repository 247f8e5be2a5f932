//! # PWZ Common Library
//!
//! Shared code for the property wizard services including:
//! - Database initialization and the drafts schema
//! - Draft lifecycle events (DraftEvent enum) and the EventBus
//! - Bootstrap configuration loading
//! - Timestamp and UUID helpers

pub mod config;
pub mod db;
pub mod error;
pub mod events;
pub mod time;
pub mod uuid_utils;

pub use error::{Error, Result};
pub use events::{DraftEvent, EventBus};
