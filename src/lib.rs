//! Store PDF documents per user and stamp a text signature onto one of their pages.
//!
//! The "signature" is rendered text, not a cryptographic signature.
//! Signing a document stores a new copy next to the original under
//! [`artifact_store::signed_key`] and marks the document record as signed.

pub mod artifact_store;
pub mod codec;
pub mod config;
pub mod document;
mod error;
pub mod fonts;
mod lopdf_utils;
pub mod metadata_store;
mod pdf_object;
pub mod placement;
pub mod request;
pub mod service;

pub use artifact_store::{ArtifactStore, FsArtifactStore, InMemoryArtifactStore};
pub use codec::{FontHandle, PDFStampDocument, Page};
pub use config::Config;
pub use document::{Document, DocumentStatus, Signature};
pub use error::{Error, ErrorKind};
pub use metadata_store::{InMemoryMetadataStore, JsonFileMetadataStore, MetadataStore};
pub use request::{SignRequest, SignResponse};
pub use service::DocumentService;

pub use lopdf;
