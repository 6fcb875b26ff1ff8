//! Schema model and compiler
//!
//! Documents are parsed into one [`Model`] arena, registered in global tables
//! and then compiled in passes (see [`manager`]).

// Model
pub mod aliases;
pub mod builtins;
pub mod facets;
pub mod kinds;
pub mod model;
pub mod table;

// Compilation
pub mod manager;
mod context;
mod handlers;
mod parsing;
mod resolve;
mod validation;

// Re-exports
pub use aliases::{AliasError, AliasResolver};
pub use builtins::{
    edm_provider_manifest, EdmProviderManifest, ManifestCatalog, PrimitiveKind, PrimitiveTypeDescriptor,
    ProviderManifest,
};
pub use facets::{FacetBuilder, FacetDescription, FacetName, FacetProblem, FacetValue};
pub use kinds::{Action, ElementKind, EndBinding, Multiplicity, NodeKind, ParameterMode, TypeUsage};
pub use manager::{CompileOptions, CompileState, SchemaManager};
pub use model::{ForeignContent, Model, Node, NodeId, Progress};
pub use table::{AddOutcome, FilteredView, NamedTable};
