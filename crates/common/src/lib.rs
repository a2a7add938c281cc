//! Common utilities and shared types for courier.
//!
//! This crate provides foundational components used across all courier crates:
//!
//! - **Configuration**: Application settings via [`Config`]
//! - **Error handling**: Unified error types via [`AppError`] and [`AppResult`]
//! - **ID Generation**: Attachment key generation via [`IdGenerator`]
//! - **Storage**: Blob store client for binary attachments
//!
//! # Example
//!
//! ```no_run
//! use courier_common::{Config, IdGenerator, MediaKind, AppResult};
//!
//! fn example() -> AppResult<()> {
//!     let config = Config::load()?;
//!     let id_gen = IdGenerator::new();
//!     let key = id_gen.attachment_key(MediaKind::Image);
//!     println!("Generated key: {}", key);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod id;
pub mod storage;

pub use config::Config;
pub use error::{AppError, AppResult};
pub use id::IdGenerator;
pub use storage::{BlobStore, BlobStoreService, HttpBlobStore, MediaKind};
