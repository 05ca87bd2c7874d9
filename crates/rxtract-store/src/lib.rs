#![forbid(unsafe_code)]
#![cfg_attr(docsrs, feature(doc_cfg))]
#![doc = include_str!("../README.md")]

mod config;
mod credentials;
mod error;
mod object;

pub mod document;

pub use config::{ObjectBackend, ObjectStoreConfig};
pub use credentials::GcpCredentials;
pub use document::{BoxedDocumentStore, DocumentStore, DocumentUpdate, FirestoreStore, MemoryStore};
pub use error::{StorageError, StorageResult};
pub use object::{ImageStore, StoredImage};

/// Tracing target for object-storage operations.
pub const TRACING_TARGET_OBJECT: &str = "rxtract_store::object";

/// Tracing target for document-store operations.
pub const TRACING_TARGET_DOCUMENT: &str = "rxtract_store::document";
