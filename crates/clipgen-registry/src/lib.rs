//! Job and clip registry for the ClipGen backend.
//!
//! Two implementations of [`Registry`]:
//! - [`InMemoryRegistry`] for single-process deployments and tests
//! - [`RestRegistry`] persisting to a PostgREST endpoint, with retries,
//!   tracing spans and request metrics
//!
//! Both resolve records exactly once: a second resolution of a job or clip
//! fails with [`RegistryError::AlreadyResolved`] and leaves the record as it
//! was.

pub mod error;
pub mod memory;
pub mod metrics;
pub mod registry;
pub mod rest;
pub mod retry;

pub use error::{RegistryError, RegistryResult};
pub use memory::InMemoryRegistry;
pub use registry::{CacheLookup, Registry};
pub use rest::{RestRegistry, RestRegistryConfig};
pub use retry::RetryConfig;
