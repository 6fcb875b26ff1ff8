//! Event-driven document parsing
//!
//! A [`Parser`] pulls events from an [`EventSource`] and builds nodes in the
//! [`Model`]. For each element it offers the attributes, then the child
//! elements and text, to the handler of the node's kind (see
//! [`handlers`](super::handlers)). Whatever no handler accepts is preserved
//! when it belongs to a foreign namespace and reported otherwise.

use crate::diagnostics::{Diagnostic, Diagnostics, ErrorCode};
use crate::documents::{EventSource, XmlAttribute, XmlEvent};
use crate::error::{Error, Result};
use crate::limits::Limits;
use crate::locations::LineInfo;
use crate::names::is_valid_identifier;
use crate::namespaces::{dialect_of, is_grammar_namespace, Dialect, QName, SchemaVersion, EDM_NAMESPACE};

use super::handlers::handler_for;
use super::kinds::{NodeKind, SchemaData};
use super::model::{ForeignAttribute, ForeignContent, ForeignElement, Model, NodeId};
use super::table::AddOutcome;

/// Handler of the child elements of a wrapper element
pub(crate) type WrapperChild = fn(&mut Parser<'_>, NodeId, &QName, LineInfo) -> Result<bool>;

/// Builds the node tree of one document
pub(crate) struct Parser<'a> {
    pub(crate) model: &'a mut Model,
    diagnostics: &'a mut Diagnostics,
    limits: &'a Limits,
    events: &'a mut dyn EventSource,
    peeked: Option<XmlEvent>,
    source_location: Option<String>,
    pub(crate) dialect: Dialect,
    pub(crate) version: SchemaVersion,
    own_namespace: String,
    depth: usize,
}

impl<'a> Parser<'a> {
    pub(crate) fn new(
        model: &'a mut Model,
        diagnostics: &'a mut Diagnostics,
        limits: &'a Limits,
        events: &'a mut dyn EventSource,
    ) -> Self {
        let source_location = events.source_location().map(str::to_string);
        Self {
            model,
            diagnostics,
            limits,
            events,
            peeked: None,
            source_location,
            dialect: Dialect::Conceptual,
            version: SchemaVersion::V1_0,
            own_namespace: String::new(),
            depth: 0,
        }
    }

    // =========================================================================
    // Event plumbing
    // =========================================================================

    fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        match self.peeked.take() {
            Some(event) => Ok(Some(event)),
            None => self.events.next_event(),
        }
    }

    fn next_attribute(&mut self) -> Result<Option<XmlAttribute>> {
        match self.next_event()? {
            Some(XmlEvent::Attribute(attr)) => Ok(Some(attr)),
            other => {
                self.peeked = other;
                Ok(None)
            }
        }
    }

    fn enter(&mut self) -> Result<()> {
        self.depth += 1;
        self.limits.check_xml_depth(self.depth)
    }

    fn leave(&mut self) {
        self.depth -= 1;
    }

    // =========================================================================
    // Diagnostics
    // =========================================================================

    /// Report an error at a position
    pub(crate) fn error(&mut self, line_info: LineInfo, code: ErrorCode, message: impl Into<String>) {
        let diagnostic = Diagnostic::error(code, message).at(self.source_location.as_deref(), line_info);
        self.diagnostics.report(diagnostic);
    }

    // =========================================================================
    // Documents and elements
    // =========================================================================

    /// Parse a whole document; `None` when the root is not a schema
    ///
    /// `store_namespace` is the namespace unqualified storage type names
    /// resolve in.
    pub(crate) fn parse_document(&mut self, store_namespace: &str) -> Result<Option<NodeId>> {
        let (name, line_info) = loop {
            match self.next_event()? {
                Some(XmlEvent::StartElement { name, line_info }) => break (name, line_info),
                Some(XmlEvent::Text { text, line_info }) if !text.trim().is_empty() => {
                    self.error(line_info, ErrorCode::TextNotAllowed, "Text is not allowed before the root element");
                }
                Some(_) => continue,
                None => return Err(Error::Xml("document contains no root element".to_string())),
            }
        };

        let declared = name.namespace.as_deref().and_then(dialect_of);
        let (dialect, version) = match declared {
            Some((dialect, version)) if dialect.root_element() == name.local_name => (dialect, version),
            _ => {
                self.error(
                    line_info,
                    ErrorCode::UnexpectedRootElement,
                    format!("'{}' is not the root element of a schema document", name),
                );
                return Ok(None);
            }
        };
        self.dialect = dialect;
        self.version = version;
        self.own_namespace = name.namespace.clone().unwrap_or_default();

        let primitive_namespace = match dialect {
            Dialect::Conceptual => EDM_NAMESPACE,
            Dialect::Storage => store_namespace,
            // Filled in from the Namespace attribute.
            Dialect::ProviderManifest => "",
        };
        let mut data = SchemaData::new(dialect, version, primitive_namespace);
        data.source_location = self.source_location.clone();

        log::debug!(
            "parsing {} document {} ({})",
            dialect,
            self.source_location.as_deref().unwrap_or("<unnamed>"),
            version
        );
        let root = self.model.add_root(NodeKind::Schema(data), line_info);
        self.parse_element(root)?;
        Ok(Some(root))
    }

    /// Create a child node and parse its element
    pub(crate) fn parse_child(&mut self, parent: NodeId, kind: NodeKind, line_info: LineInfo) -> Result<NodeId> {
        self.limits.check_nodes(self.model.len() + 1)?;
        let id = self.model.add_child(parent, kind, line_info);
        self.parse_element(id)?;
        Ok(id)
    }

    /// Dispatch the attributes and content of the element of `id`
    fn parse_element(&mut self, id: NodeId) -> Result<()> {
        self.enter()?;
        let handler = handler_for(&self.model[id].kind);

        let mut count = 0;
        while let Some(attr) = self.next_attribute()? {
            count += 1;
            self.limits.check_attributes(count)?;
            if attr.invalid {
                continue;
            }
            if !handler.handle_attribute(self, id, &attr) {
                self.unhandled_attribute(id, attr);
            }
        }
        handler.attributes_complete(self, id);

        loop {
            match self.next_event()? {
                Some(XmlEvent::StartElement { .. }) if self.diagnostics.is_halted() => {
                    self.skip_element()?;
                }
                Some(XmlEvent::StartElement { name, line_info }) => {
                    if !handler.handle_element(self, id, &name, line_info)? {
                        self.unhandled_element(id, name, line_info)?;
                    }
                }
                Some(XmlEvent::Text { text, line_info }) => {
                    if text.trim().is_empty() {
                        continue;
                    }
                    if !handler.handle_text(self, id, &text, line_info) {
                        let kind = self.model[id].element_kind();
                        self.error(
                            line_info,
                            ErrorCode::TextNotAllowed,
                            format!("Text is not allowed in element '{}'", kind),
                        );
                    }
                }
                Some(XmlEvent::EndElement { .. }) => break,
                Some(XmlEvent::Attribute(attr)) => {
                    return Err(Error::Xml(format!(
                        "attribute '{}' does not follow a start element",
                        attr.name
                    )));
                }
                None => return Err(Error::Xml("unexpected end of document".to_string())),
            }
        }

        handler.children_complete(self, id);
        self.leave();
        Ok(())
    }

    fn unhandled_attribute(&mut self, id: NodeId, attr: XmlAttribute) {
        if is_grammar_namespace(attr.name.namespace.as_deref()) {
            let kind = self.model[id].element_kind();
            self.error(
                attr.line_info,
                ErrorCode::UnexpectedXmlAttribute,
                format!("The attribute '{}' is not allowed on element '{}'", attr.name, kind),
            );
        } else {
            self.model[id].foreign.push(ForeignContent::Attribute(ForeignAttribute {
                name: attr.name,
                value: attr.value,
            }));
        }
    }

    fn unhandled_element(&mut self, id: NodeId, name: QName, line_info: LineInfo) -> Result<()> {
        if is_grammar_namespace(name.namespace.as_deref()) {
            let kind = self.model[id].element_kind();
            self.error(
                line_info,
                ErrorCode::UnexpectedXmlElement,
                format!("The element '{}' is not allowed in element '{}'", name.local_name, kind),
            );
            self.skip_element()
        } else {
            let element = self.capture_foreign(name, line_info)?;
            self.model[id].foreign.push(ForeignContent::Element(element));
            Ok(())
        }
    }

    /// Whether `name` is the element `local` of the document's own grammar
    ///
    /// Elements of the other grammars are not accepted by any handler and get
    /// reported as unexpected.
    pub(crate) fn is_own(&self, name: &QName, local: &str) -> bool {
        name.local_name == local && name.namespace.as_deref() == Some(self.own_namespace.as_str())
    }

    /// Consume the rest of the current element
    pub(crate) fn skip_element(&mut self) -> Result<()> {
        let mut open = 1usize;
        while open > 0 {
            match self.next_event()? {
                Some(XmlEvent::StartElement { .. }) => open += 1,
                Some(XmlEvent::EndElement { .. }) => open -= 1,
                Some(_) => {}
                None => return Err(Error::Xml("unexpected end of document".to_string())),
            }
        }
        Ok(())
    }

    /// Read the rest of the current element verbatim
    fn capture_foreign(&mut self, name: QName, line_info: LineInfo) -> Result<ForeignElement> {
        self.enter()?;
        let mut element = ForeignElement {
            name,
            attributes: Vec::new(),
            text: String::new(),
            children: Vec::new(),
            line_info,
        };
        while let Some(attr) = self.next_attribute()? {
            element.attributes.push(ForeignAttribute {
                name: attr.name,
                value: attr.value,
            });
        }
        loop {
            match self.next_event()? {
                Some(XmlEvent::StartElement { name, line_info }) => {
                    let child = self.capture_foreign(name, line_info)?;
                    element.children.push(child);
                }
                Some(XmlEvent::Text { text, .. }) => element.text.push_str(&text),
                Some(XmlEvent::EndElement { .. }) => break,
                Some(XmlEvent::Attribute(_)) => {}
                None => return Err(Error::Xml("unexpected end of document".to_string())),
            }
        }
        self.leave();
        Ok(element)
    }

    /// Parse a wrapper element (`Types`, `Functions`, `FacetDescriptions`)
    ///
    /// Wrappers have no node of their own; their children are offered to
    /// `child` with `owner` as the parent.
    pub(crate) fn parse_wrapper(&mut self, owner: NodeId, wrapper: &str, child: WrapperChild) -> Result<()> {
        self.enter()?;
        while let Some(attr) = self.next_attribute()? {
            if is_grammar_namespace(attr.name.namespace.as_deref()) {
                self.error(
                    attr.line_info,
                    ErrorCode::UnexpectedXmlAttribute,
                    format!("The attribute '{}' is not allowed on element '{}'", attr.name, wrapper),
                );
            }
        }
        loop {
            match self.next_event()? {
                Some(XmlEvent::StartElement { name, line_info }) => {
                    if !child(self, owner, &name, line_info)? {
                        if is_grammar_namespace(name.namespace.as_deref()) {
                            self.error(
                                line_info,
                                ErrorCode::UnexpectedXmlElement,
                                format!(
                                    "The element '{}' is not allowed in element '{}'",
                                    name.local_name, wrapper
                                ),
                            );
                            self.skip_element()?;
                        } else {
                            let element = self.capture_foreign(name, line_info)?;
                            self.model[owner].foreign.push(ForeignContent::Element(element));
                        }
                    }
                }
                Some(XmlEvent::Text { text, line_info }) if !text.trim().is_empty() => {
                    self.error(
                        line_info,
                        ErrorCode::TextNotAllowed,
                        format!("Text is not allowed in element '{}'", wrapper),
                    );
                }
                Some(XmlEvent::EndElement { .. }) => break,
                Some(_) => {}
                None => return Err(Error::Xml("unexpected end of document".to_string())),
            }
        }
        self.leave();
        Ok(())
    }

    // =========================================================================
    // Attribute helpers
    // =========================================================================

    /// Parse a boolean attribute, reporting malformed values
    pub(crate) fn parse_bool(&mut self, attr: &XmlAttribute) -> Option<bool> {
        match attr.value.trim() {
            "true" | "1" => Some(true),
            "false" | "0" => Some(false),
            _ => {
                self.error(
                    attr.line_info,
                    ErrorCode::InvalidBoolean,
                    format!("'{}' is not a valid value for attribute '{}'", attr.value, attr.name),
                );
                None
            }
        }
    }

    /// Parse an integer attribute, reporting malformed values
    pub(crate) fn parse_integer(&mut self, attr: &XmlAttribute) -> Option<i64> {
        match attr.value.trim().parse::<i64>() {
            Ok(value) => Some(value),
            Err(_) => {
                self.error(
                    attr.line_info,
                    ErrorCode::InvalidInteger,
                    format!("'{}' is not a valid integer for attribute '{}'", attr.value, attr.name),
                );
                None
            }
        }
    }

    /// Set the name of `id` from a `Name` attribute
    ///
    /// Conceptual names must be identifiers; storage and manifest names only
    /// need to be non-empty.
    pub(crate) fn set_name(&mut self, id: NodeId, attr: &XmlAttribute) {
        let value = attr.value.trim();
        let valid = match self.dialect {
            Dialect::Conceptual => is_valid_identifier(value),
            Dialect::Storage | Dialect::ProviderManifest => !value.is_empty(),
        };
        if !valid {
            self.error(
                attr.line_info,
                ErrorCode::InvalidName,
                format!("'{}' is not a valid name", attr.value),
            );
        }
        self.model[id].name = Some(value.to_string());
    }

    /// Report a missing required attribute
    pub(crate) fn require(&mut self, id: NodeId, present: bool, attribute: &str) {
        if !present {
            let node = &self.model[id];
            let (kind, line_info) = (node.element_kind(), node.line_info);
            self.error(
                line_info,
                ErrorCode::RequiredAttributeMissing,
                format!("The required attribute '{}' is missing on element '{}'", attribute, kind),
            );
        }
    }

    /// Report that an element may occur only once
    pub(crate) fn too_many(&mut self, owner: NodeId, element: &str, line_info: LineInfo) {
        let kind = self.model[owner].element_kind();
        self.error(
            line_info,
            ErrorCode::TooManyElements,
            format!("Element '{}' may occur only once in element '{}'", element, kind),
        );
    }

    /// Add a parsed child to the name-keyed table of `owner`
    pub(crate) fn add_member(&mut self, owner: NodeId, child: NodeId) {
        let name = self.model[child].name.clone();
        let Some(table) = self.model[owner].kind.member_table_mut() else {
            return;
        };
        match table.add(name.as_deref(), child) {
            AddOutcome::Added | AddOutcome::MissingName => {}
            AddOutcome::Duplicate(_) => {
                let line_info = self.model[child].line_info;
                let kind = self.model[child].element_kind();
                let owner_name = self.model.display_name(owner);
                self.error(
                    line_info,
                    ErrorCode::AlreadyDefined,
                    format!(
                        "{} '{}' is already defined in '{}'",
                        kind,
                        name.unwrap_or_default(),
                        owner_name
                    ),
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::documents::EventList;
    use crate::namespaces::{ANNOTATION_NAMESPACE, CSDL_V2_NAMESPACE, SSDL_V2_NAMESPACE};

    fn parse(events: EventList) -> (Model, Diagnostics, Result<Option<NodeId>>) {
        parse_with_max_errors(events, 100)
    }

    fn parse_with_max_errors(
        mut events: EventList,
        max_errors: usize,
    ) -> (Model, Diagnostics, Result<Option<NodeId>>) {
        let mut model = Model::new();
        let mut diagnostics = Diagnostics::new(max_errors);
        let limits = Limits::default();
        let result = {
            let mut parser = Parser::new(&mut model, &mut diagnostics, &limits, &mut events);
            parser.parse_document("Edm")
        };
        (model, diagnostics, result)
    }

    fn li(line: u32) -> LineInfo {
        LineInfo::new(line, 1)
    }

    #[test]
    fn test_parse_minimal_document() {
        let events = EventList::new()
            .with_location("events")
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model")
            .attribute("Alias", "Self")
            .end();
        let (model, diagnostics, result) = parse(events);
        let doc = result.unwrap().unwrap();
        assert!(diagnostics.is_empty(), "{:?}", diagnostics.items());

        let schema = model.schema(doc).unwrap();
        assert_eq!(schema.namespace.as_deref(), Some("Model"));
        assert_eq!(schema.aliases.resolve("Self"), Some("Model"));
        assert_eq!(schema.source_location.as_deref(), Some("events"));
    }

    #[test]
    fn test_foreign_content_preserved() {
        let mut events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model");
        events.push(XmlEvent::Attribute(XmlAttribute {
            name: QName::namespaced(ANNOTATION_NAMESPACE, "UseStrongSpatialTypes"),
            value: "false".to_string(),
            line_info: li(1),
            invalid: false,
        }));
        let events = events
            .start(Some("urn:vendor"), "Extra", li(2))
            .attribute("k", "v")
            .text("payload")
            .end()
            .end();

        let (model, diagnostics, result) = parse(events);
        let doc = result.unwrap().unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(model[doc].foreign.len(), 2);
        match &model[doc].foreign[1] {
            ForeignContent::Element(element) => {
                assert_eq!(element.name.local_name, "Extra");
                assert_eq!(element.text, "payload");
                assert_eq!(element.attributes.len(), 1);
            }
            other => panic!("unexpected content {:?}", other),
        }
    }

    #[test]
    fn test_unexpected_attribute_and_element() {
        let events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model")
            .attribute("Bogus", "1")
            .start(Some(CSDL_V2_NAMESPACE), "Nonsense", li(2))
            .start(Some(CSDL_V2_NAMESPACE), "Inner", li(3))
            .end()
            .end()
            .text("stray")
            .end();
        let (_, diagnostics, result) = parse(events);
        assert!(result.unwrap().is_some());
        let codes: Vec<_> = diagnostics.items().iter().map(|d| d.code).collect();
        assert_eq!(
            codes,
            vec![
                ErrorCode::UnexpectedXmlAttribute,
                ErrorCode::UnexpectedXmlElement,
                ErrorCode::TextNotAllowed
            ]
        );
    }

    #[test]
    fn test_other_grammar_element_is_reported() {
        let events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model")
            .start(Some(SSDL_V2_NAMESPACE), "EntityType", li(2))
            .attribute("Name", "Table")
            .end()
            .end();
        let (model, diagnostics, result) = parse(events);
        let doc = result.unwrap().unwrap();
        let codes: Vec<_> = diagnostics.items().iter().map(|d| d.code).collect();
        assert_eq!(codes, vec![ErrorCode::UnexpectedXmlElement]);
        assert!(model[doc].foreign.is_empty());
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_halted_diagnostics_skip_remaining_elements() {
        let events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model")
            .attribute("Bogus", "1")
            .start(Some(CSDL_V2_NAMESPACE), "EntityType", li(2))
            .attribute("Name", "Customer")
            .start(Some(CSDL_V2_NAMESPACE), "Property", li(3))
            .attribute("Name", "Id")
            .end()
            .end()
            .end();
        let (model, diagnostics, result) = parse_with_max_errors(events, 1);
        assert!(result.unwrap().is_some());
        assert!(diagnostics.is_halted());
        assert_eq!(diagnostics.items().len(), 1);
        assert_eq!(model.len(), 1);
    }

    #[test]
    fn test_invalid_flag_skips_attribute() {
        let events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model")
            .invalid_attribute("Alias", "1bad")
            .end();
        let (model, diagnostics, result) = parse(events);
        let doc = result.unwrap().unwrap();
        assert!(diagnostics.is_empty());
        assert_eq!(model.schema(doc).unwrap().alias, None);
    }

    #[test]
    fn test_unknown_root() {
        let events = EventList::new().start(Some("urn:other"), "Schema", li(1)).end();
        let (_, diagnostics, result) = parse(events);
        assert!(result.unwrap().is_none());
        assert_eq!(diagnostics.items()[0].code, ErrorCode::UnexpectedRootElement);
    }

    #[test]
    fn test_truncated_stream_is_fatal() {
        let events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model");
        let (_, _, result) = parse(events);
        assert!(matches!(result, Err(Error::Xml(_))));
    }

    #[test]
    fn test_depth_limit() {
        let mut events = EventList::new()
            .start(Some(CSDL_V2_NAMESPACE), "Schema", li(1))
            .attribute("Namespace", "Model");
        for _ in 0..300 {
            events = events.start(Some("urn:vendor"), "Deep", li(2));
        }
        for _ in 0..301 {
            events = events.end();
        }
        let (_, _, result) = parse(events);
        assert!(matches!(result, Err(Error::LimitExceeded(_))));
    }
}
