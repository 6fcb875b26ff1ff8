//! # edmschema
//!
//! A compiler for entity data model schemas: conceptual (CSDL), storage (SSDL)
//! and provider manifest documents.
//!
//! Documents are loaded into a [`SchemaManager`], which resolves every name
//! across documents and checks the rules of the model. Problems never abort
//! the compilation: they are collected as [`Diagnostic`]s, and a model with
//! any error diagnostic must not be trusted.
//!
//! ## Features
//!
//! - Conceptual and storage schemas of versions 1.0 to 3.0
//! - Namespace aliases and `Using` declarations
//! - Entity, complex and enum types with inheritance
//! - Associations, referential constraints and multiplicity inference
//! - Entity containers with extension, entity set and association set binding
//! - Functions, function imports and overload signatures
//! - Primitive type facets checked against the EDM or a provider catalogue
//! - Foreign-namespace annotations preserved on the nodes
//!
//! ## Example
//!
//! ```rust,ignore
//! use edmschema::SchemaManager;
//!
//! let mut manager = SchemaManager::new();
//! manager.load_file("model.csdl");
//! if manager.compile() {
//!     let customer = manager.lookup_type("Model.Customer");
//! } else {
//!     for diagnostic in manager.diagnostics().items() {
//!         eprintln!("{}", diagnostic);
//!     }
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

// Foundation
pub mod error;
pub mod limits;

// Utilities
pub mod locations;
pub mod names;
pub mod namespaces;

// Input and output
pub mod diagnostics;
pub mod documents;

// Model and compiler
pub mod schema;

// Re-exports for convenience
pub use diagnostics::{Diagnostic, Diagnostics, ErrorCode, Severity};
pub use documents::{EventList, EventSource, XmlAttribute, XmlEvent, XmlEventReader};
pub use error::{Error, Result};
pub use limits::Limits;
pub use locations::LineInfo;
pub use namespaces::{Dialect, SchemaVersion};
pub use schema::{CompileOptions, CompileState, Model, NodeId, NodeKind, SchemaManager};

/// Version of the edmschema library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
