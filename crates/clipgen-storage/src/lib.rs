//! Clip artifact storage.
//!
//! This crate provides:
//! - Cloudflare R2 upload with public or presigned download URLs
//! - A local artifact store served by the API itself
//! - The `ArtifactStore` trait both implement

pub mod artifact;
pub mod client;
pub mod error;

pub use artifact::{ArtifactStore, LocalArtifactStore, R2ArtifactStore};
pub use client::{R2Client, R2Config};
pub use error::{StorageError, StorageResult};
