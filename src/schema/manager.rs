//! Compilation units
//!
//! A [`SchemaManager`] owns everything one compilation needs: the node arena,
//! the global tables and the diagnostics. Documents are loaded one by one and
//! registered as they arrive; [`SchemaManager::compile`] then runs the passes
//! over all of them:
//!
//! 1. version check (all documents must share one epoch),
//! 2. top-level resolution,
//! 3. second-level resolution,
//! 4. validation, followed by the cross-document duplicate table check.
//!
//! Each step runs only if no error has been reported so far.
//!
//! ```rust,ignore
//! use edmschema::SchemaManager;
//!
//! let mut manager = SchemaManager::new();
//! manager.load_file("model.csdl");
//! manager.load_file("store.ssdl");
//! if !manager.compile() {
//!     for diagnostic in manager.diagnostics().errors() {
//!         eprintln!("{}", diagnostic);
//!     }
//! }
//! ```

use std::fmt;
use std::path::Path;
use std::sync::Arc;

use indexmap::{IndexMap, IndexSet};

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::documents::{EventSource, XmlEventReader};
use crate::error::Error;
use crate::limits::Limits;
use crate::locations::LineInfo;
use crate::names::qualify;
use crate::namespaces::{Dialect, SchemaVersion, EDM_NAMESPACE};

use super::builtins::{edm_provider_manifest, ProviderManifest};
use super::context::Context;
use super::kinds::{NodeKind, PrimitiveTypeData, SchemaData};
use super::model::{Model, NodeId, Progress};
use super::parsing::Parser;
use super::resolve::{resolve_second_level, resolve_top_level};
use super::table::{AddOutcome, NamedTable};
use super::validation::{check_duplicate_tables, validate_document};

/// Options of one compilation
#[derive(Debug, Clone, Default)]
pub struct CompileOptions {
    /// Processing limits
    pub limits: Limits,
    /// Primitive type catalogue of storage documents; the EDM catalogue when unset
    pub store_provider: Option<Arc<dyn ProviderManifest>>,
}

impl CompileOptions {
    /// Default options
    pub fn new() -> Self {
        Self::default()
    }

    /// Use the given limits
    pub fn with_limits(mut self, limits: Limits) -> Self {
        self.limits = limits;
        self
    }

    /// Use a store provider catalogue for storage documents
    pub fn with_store_provider(mut self, provider: Arc<dyn ProviderManifest>) -> Self {
        self.store_provider = Some(provider);
        self
    }
}

/// How far compilation has progressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum CompileState {
    /// Documents loaded, nothing resolved
    Parsed,
    /// Type, relationship and container references resolved
    TopLevelResolved,
    /// Roles, keys and entity set references resolved
    SecondLevelResolved,
    /// All rules checked
    Validated,
}

impl fmt::Display for CompileState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            CompileState::Parsed => "parsed",
            CompileState::TopLevelResolved => "top-level resolved",
            CompileState::SecondLevelResolved => "second-level resolved",
            CompileState::Validated => "validated",
        };
        write!(f, "{}", text)
    }
}

/// One compilation unit of conceptual, storage and provider manifest documents
pub struct SchemaManager {
    model: Model,
    documents: Vec<NodeId>,
    primitive_documents: IndexMap<String, NodeId>,
    types: NamedTable,
    containers: NamedTable,
    functions: NamedTable,
    namespaces: IndexSet<String>,
    diagnostics: Diagnostics,
    options: CompileOptions,
    state: CompileState,
    compiled: bool,
}

impl fmt::Debug for SchemaManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SchemaManager")
            .field("documents", &self.documents.len())
            .field("types", &self.types.len())
            .field("state", &self.state)
            .field("diagnostics", &self.diagnostics.len())
            .finish()
    }
}

impl Default for SchemaManager {
    fn default() -> Self {
        Self::new()
    }
}

impl SchemaManager {
    /// Create a manager with default options
    pub fn new() -> Self {
        Self::with_options(CompileOptions::default())
    }

    /// Create a manager with the given options
    pub fn with_options(options: CompileOptions) -> Self {
        Self {
            model: Model::new(),
            documents: Vec::new(),
            primitive_documents: IndexMap::new(),
            types: NamedTable::new(),
            containers: NamedTable::new(),
            functions: NamedTable::new(),
            namespaces: IndexSet::new(),
            diagnostics: Diagnostics::new(options.limits.max_errors),
            options,
            state: CompileState::Parsed,
            compiled: false,
        }
    }

    // =========================================================================
    // Loading
    // =========================================================================

    /// Load a document from XML text; `None` if it could not be read
    pub fn load_str(&mut self, xml: &str, location: &str) -> Option<NodeId> {
        if let Err(err) = self.options.limits.check_xml_size(xml.len()) {
            self.report_fatal(&err, Some(location));
            return None;
        }
        let mut reader = XmlEventReader::from_str(xml).with_location(location);
        self.load_events(&mut reader)
    }

    /// Load a document from a file
    pub fn load_file(&mut self, path: impl AsRef<Path>) -> Option<NodeId> {
        let path = path.as_ref();
        let location = path.display().to_string();
        match std::fs::read_to_string(path) {
            Ok(xml) => self.load_str(&xml, &location),
            Err(err) => {
                self.report_fatal(&Error::Io(err), Some(&location));
                None
            }
        }
    }

    /// Load a document from an event source
    pub fn load_events(&mut self, events: &mut dyn EventSource) -> Option<NodeId> {
        if self.compiled {
            log::warn!("documents cannot be added after compilation; ignoring {:?}", events.source_location());
            return None;
        }
        if self.diagnostics.is_halted() {
            return None;
        }
        let location = events.source_location().map(str::to_string);
        let store_namespace = self.store_namespace().to_string();

        let parsed = {
            let mut parser = Parser::new(&mut self.model, &mut self.diagnostics, &self.options.limits, events);
            parser.parse_document(&store_namespace)
        };
        match parsed {
            Ok(Some(document)) => {
                self.register_document(document);
                Some(document)
            }
            Ok(None) => None,
            Err(err) => {
                self.report_fatal(&err, location.as_deref());
                None
            }
        }
    }

    fn store_namespace(&self) -> &str {
        match &self.options.store_provider {
            Some(provider) => provider.namespace(),
            None => EDM_NAMESPACE,
        }
    }

    fn report_fatal(&mut self, err: &Error, location: Option<&str>) {
        let code = match err {
            Error::Io(_) => ErrorCode::IoError,
            Error::LimitExceeded(_) => ErrorCode::LimitExceeded,
            _ => ErrorCode::XmlError,
        };
        log::debug!("cannot read {}: {}", location.unwrap_or("<unnamed>"), err);
        let diagnostic = Diagnostic::error(code, err.to_string()).at(location, LineInfo::unknown());
        self.diagnostics.report(diagnostic);
    }

    fn report_at(&mut self, id: NodeId, code: ErrorCode, message: String) {
        let location = self.model.schema_of(id).and_then(|s| s.source_location.clone());
        let diagnostic = Diagnostic::error(code, message).at(location.as_deref(), self.model[id].line_info);
        self.diagnostics.report(diagnostic);
    }

    // =========================================================================
    // Registration
    // =========================================================================

    fn register_document(&mut self, document: NodeId) {
        self.documents.push(document);
        let Some(schema) = self.model.schema(document) else {
            return;
        };
        let dialect = schema.dialect;
        let namespace = schema.namespace.clone();
        let types = schema.types.clone();
        let containers = schema.containers.clone();

        match dialect {
            Dialect::Conceptual => self.ensure_primitive_document(edm_provider_manifest()),
            Dialect::Storage => match self.options.store_provider.clone() {
                Some(provider) => self.ensure_primitive_document(provider.as_ref()),
                None => self.ensure_primitive_document(edm_provider_manifest()),
            },
            Dialect::ProviderManifest => {}
        }

        let Some(namespace) = namespace else {
            return;
        };
        log::debug!("registering {} document for namespace {}", dialect, namespace);
        self.namespaces.insert(namespace.clone());
        self.register_types(&namespace, &types);

        for container in containers {
            let name = self.model[container].name.clone();
            if let AddOutcome::Duplicate(_) = self.containers.add(name.as_deref(), container) {
                self.report_at(
                    container,
                    ErrorCode::AlreadyDefined,
                    format!("An entity container named '{}' is already defined", name.unwrap_or_default()),
                );
            }
        }
    }

    fn register_types(&mut self, namespace: &str, types: &[NodeId]) {
        for id in types {
            let Some(name) = self.model[*id].name.clone() else {
                continue;
            };
            let key = qualify(namespace, &name);
            if let AddOutcome::Duplicate(_) = self.types.add(Some(&key), *id) {
                self.report_at(
                    *id,
                    ErrorCode::AlreadyDefined,
                    format!("A type named '{}' is already defined", key),
                );
            }
        }
    }

    /// Synthesize the document holding the primitive types of a catalogue
    fn ensure_primitive_document(&mut self, catalog: &dyn ProviderManifest) {
        let namespace = catalog.namespace().to_string();
        if self.primitive_documents.contains_key(&namespace) {
            return;
        }
        let dialect = if namespace == EDM_NAMESPACE {
            Dialect::Conceptual
        } else {
            Dialect::Storage
        };
        let mut data = SchemaData::new(dialect, SchemaVersion::V3_0, namespace.clone());
        data.namespace = Some(namespace.clone());
        data.is_primitive = true;

        let document = self.model.add_root(NodeKind::Schema(data), LineInfo::unknown());
        self.model[document].progress = Progress::complete();
        let mut types = Vec::with_capacity(catalog.primitive_types().len());
        for descriptor in catalog.primitive_types() {
            let kind = NodeKind::PrimitiveType(PrimitiveTypeData {
                kind: Some(descriptor.kind),
                facets: descriptor.facets.clone(),
            });
            let id = self.model.add_child(document, kind, LineInfo::unknown());
            self.model[id].name = Some(descriptor.name.clone());
            self.model[id].progress = Progress::complete();
            types.push(id);
        }
        if let Some(schema) = self.model.schema_mut(document) {
            schema.types = types.clone();
        }

        log::debug!("synthesized {} primitive types in namespace {}", types.len(), namespace);
        self.namespaces.insert(namespace.clone());
        self.register_types(&namespace, &types);
        self.primitive_documents.insert(namespace, document);
    }

    // =========================================================================
    // Compilation
    // =========================================================================

    fn should_stop(&self) -> bool {
        self.diagnostics.has_errors() || self.diagnostics.is_halted()
    }

    fn context(&mut self) -> Context<'_> {
        Context {
            model: &mut self.model,
            types: &self.types,
            containers: &self.containers,
            functions: &mut self.functions,
            namespaces: &self.namespaces,
            primitive_documents: &self.primitive_documents,
            diagnostics: &mut self.diagnostics,
        }
    }

    /// All documents of a unit must declare the same version epoch
    ///
    /// Provider manifests carry no epoch. A 1.1 conceptual document pairs
    /// with the 1.0 storage grammar, which has no 1.1 revision.
    fn check_versions(&mut self) -> bool {
        let mut conceptual: Option<SchemaVersion> = None;
        let mut epoch: Option<SchemaVersion> = None;
        let mut mixed = false;
        for document in &self.documents {
            let Some(schema) = self.model.schema(*document) else {
                continue;
            };
            let major = match schema.version {
                SchemaVersion::V1_1 => SchemaVersion::V1_0,
                other => other,
            };
            match schema.dialect {
                Dialect::ProviderManifest => continue,
                Dialect::Conceptual => {
                    mixed |= *conceptual.get_or_insert(schema.version) != schema.version;
                }
                Dialect::Storage => {}
            }
            mixed |= *epoch.get_or_insert(major) != major;
        }
        if mixed {
            let versions: IndexSet<String> = self
                .documents
                .iter()
                .filter_map(|d| self.model.schema(*d))
                .filter(|s| s.dialect != Dialect::ProviderManifest)
                .map(|s| format!("{} {}", s.dialect, s.version))
                .collect();
            let message = format!(
                "Documents of different versions cannot be compiled together ({})",
                versions.into_iter().collect::<Vec<_>>().join(", ")
            );
            self.diagnostics.report(Diagnostic::error(ErrorCode::MixedVersions, message));
        }
        !mixed
    }

    /// Run every pass; `true` when no error was reported
    ///
    /// The result is cached: calling `compile` again does not rerun anything.
    pub fn compile(&mut self) -> bool {
        if self.compiled {
            return !self.diagnostics.has_errors();
        }
        self.compiled = true;
        log::debug!("compiling {} documents", self.documents.len());

        if self.should_stop() || !self.check_versions() {
            return self.finish();
        }

        let documents = self.documents.clone();
        {
            let mut ctx = self.context();
            for document in &documents {
                resolve_top_level(&mut ctx, *document);
            }
        }
        log::debug!("top-level resolution done, {} functions registered", self.functions.len());
        if self.should_stop() {
            return self.finish();
        }
        self.state = CompileState::TopLevelResolved;

        {
            let mut ctx = self.context();
            for document in &documents {
                resolve_second_level(&mut ctx, *document);
            }
        }
        log::debug!("second-level resolution done");
        if self.should_stop() {
            return self.finish();
        }
        self.state = CompileState::SecondLevelResolved;

        {
            let mut ctx = self.context();
            for document in &documents {
                validate_document(&mut ctx, *document);
            }
        }
        if !self.diagnostics.is_halted() {
            check_duplicate_tables(&self.model, &self.documents, &mut self.diagnostics);
        }
        log::debug!("validation done");
        self.state = CompileState::Validated;
        self.finish()
    }

    fn finish(&mut self) -> bool {
        log::info!(
            "compiled {} documents ({}): {} errors, {} warnings",
            self.documents.len(),
            self.state,
            self.diagnostics.error_count(),
            self.diagnostics.warning_count()
        );
        !self.diagnostics.has_errors()
    }

    // =========================================================================
    // Accessors
    // =========================================================================

    /// Node arena of all loaded documents
    pub fn model(&self) -> &Model {
        &self.model
    }

    /// Loaded documents in load order (synthesized primitive documents excluded)
    pub fn documents(&self) -> &[NodeId] {
        &self.documents
    }

    /// Synthesized primitive documents keyed by namespace
    pub fn primitive_documents(&self) -> &IndexMap<String, NodeId> {
        &self.primitive_documents
    }

    /// Diagnostics in report order
    pub fn diagnostics(&self) -> &Diagnostics {
        &self.diagnostics
    }

    /// Options the manager was created with
    pub fn options(&self) -> &CompileOptions {
        &self.options
    }

    /// Compilation progress
    pub fn state(&self) -> CompileState {
        self.state
    }

    /// Whether [`compile`](Self::compile) has run
    pub fn is_compiled(&self) -> bool {
        self.compiled
    }

    /// Type by qualified name, `Namespace.Name`
    pub fn lookup_type(&self, qualified_name: &str) -> Option<NodeId> {
        self.types.get(qualified_name)
    }

    /// Function by signature, `Namespace.Name(In Edm.Int32, ...)`
    pub fn lookup_function(&self, signature: &str) -> Option<NodeId> {
        self.functions.get(signature)
    }

    /// Entity container by name
    pub fn lookup_container(&self, name: &str) -> Option<NodeId> {
        self.containers.get(name)
    }

    /// Registered types in registration order
    pub fn types(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.types.iter()
    }

    /// Registered functions by signature
    pub fn functions(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.functions.iter()
    }

    /// Registered entity containers
    pub fn containers(&self) -> impl Iterator<Item = (&str, NodeId)> + '_ {
        self.containers.iter()
    }
}
