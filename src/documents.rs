//! Document event streams
//!
//! The compiler consumes a document as a stream of position-tagged events:
//! start-element, attribute, text and end-element. [`XmlEventReader`] produces
//! that stream from XML text with `quick-xml`; [`EventList`] replays events
//! built in memory.

use std::collections::VecDeque;

use quick_xml::events::Event;
use quick_xml::name::ResolveResult;
use quick_xml::NsReader;

use crate::error::{Error, Result};
use crate::locations::{LineIndex, LineInfo};
use crate::namespaces::QName;

/// An attribute event
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct XmlAttribute {
    /// Attribute name
    pub name: QName,
    /// Unescaped attribute value
    pub value: String,
    /// Position of the owning element
    pub line_info: LineInfo,
    /// Set by an upstream grammar check when the value is known to be malformed
    pub invalid: bool,
}

impl XmlAttribute {
    /// Create an unqualified attribute
    pub fn new(local_name: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            name: QName::local(local_name),
            value: value.into(),
            line_info: LineInfo::unknown(),
            invalid: false,
        }
    }

    /// Whether this is the unqualified attribute `local_name`
    pub fn is(&self, local_name: &str) -> bool {
        self.name.namespace.is_none() && self.name.local_name == local_name
    }

    /// Whether this is `local_name` in `namespace`
    pub fn is_in(&self, namespace: &str, local_name: &str) -> bool {
        self.name.is(Some(namespace), local_name)
    }
}

/// One event of a document stream
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum XmlEvent {
    /// Start of an element; its attributes follow immediately
    StartElement {
        /// Element name
        name: QName,
        /// Position of the `<`
        line_info: LineInfo,
    },
    /// An attribute of the most recently started element
    Attribute(XmlAttribute),
    /// Character content
    Text {
        /// Unescaped text
        text: String,
        /// Position of the first non-blank character
        line_info: LineInfo,
    },
    /// End of the current element
    EndElement {
        /// Position of the end tag
        line_info: LineInfo,
    },
}

/// A pull source of document events
pub trait EventSource {
    /// Next event, `None` at end of input
    fn next_event(&mut self) -> Result<Option<XmlEvent>>;

    /// Name of the document for diagnostics
    fn source_location(&self) -> Option<&str> {
        None
    }
}

/// Events read from XML text
pub struct XmlEventReader<'a> {
    reader: NsReader<&'a [u8]>,
    source: &'a str,
    lines: LineIndex,
    queue: VecDeque<XmlEvent>,
    location: Option<String>,
    finished: bool,
}

impl<'a> XmlEventReader<'a> {
    /// Create a reader over XML text
    pub fn from_str(xml: &'a str) -> Self {
        let mut reader = NsReader::from_str(xml);
        reader.trim_text(true);
        reader.expand_empty_elements(true);
        Self {
            reader,
            source: xml,
            lines: LineIndex::new(xml),
            queue: VecDeque::new(),
            location: None,
            finished: false,
        }
    }

    /// Name the document in diagnostics
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Position of the tag that ends at byte `end`
    fn tag_start(&self, end: usize) -> LineInfo {
        let end = end.min(self.source.len());
        let start = self.source[..end].rfind('<').unwrap_or(0);
        self.lines.line_info(start)
    }

    /// Position of the first non-blank byte at or after `offset`
    fn text_start(&self, offset: usize) -> LineInfo {
        let offset = offset.min(self.source.len());
        let skipped = self.source[offset..]
            .bytes()
            .take_while(|b| b.is_ascii_whitespace())
            .count();
        self.lines.line_info(offset + skipped)
    }

    fn fill(&mut self) -> Result<()> {
        loop {
            let before = self.reader.buffer_position() as usize;
            let (resolved, event) = self.reader.read_resolved_event()?;
            let element_ns = namespace_string(&resolved)?;
            match event {
                Event::Start(start) => {
                    let end = self.reader.buffer_position() as usize;
                    let line_info = self.tag_start(end);
                    let local = utf8(start.local_name().as_ref())?;
                    self.queue.push_back(XmlEvent::StartElement {
                        name: QName::new(element_ns, local),
                        line_info,
                    });
                    for attr in start.attributes() {
                        let attr = attr?;
                        if attr.key.as_namespace_binding().is_some() {
                            continue;
                        }
                        let (ns, local) = self.reader.resolve_attribute(attr.key);
                        let namespace = namespace_string(&ns)?;
                        let local = utf8(local.as_ref())?;
                        let value = attr.unescape_value()?.into_owned();
                        self.queue.push_back(XmlEvent::Attribute(XmlAttribute {
                            name: QName::new(namespace, local),
                            value,
                            line_info,
                            invalid: false,
                        }));
                    }
                    return Ok(());
                }
                Event::End(_) => {
                    let end = self.reader.buffer_position() as usize;
                    let line_info = self.tag_start(end);
                    self.queue.push_back(XmlEvent::EndElement { line_info });
                    return Ok(());
                }
                Event::Text(text) => {
                    let line_info = self.text_start(before);
                    let text = text.unescape()?.into_owned();
                    self.queue.push_back(XmlEvent::Text { text, line_info });
                    return Ok(());
                }
                Event::CData(data) => {
                    let line_info = self.text_start(before);
                    let text = utf8(&data.into_inner())?;
                    self.queue.push_back(XmlEvent::Text { text, line_info });
                    return Ok(());
                }
                Event::Eof => {
                    self.finished = true;
                    return Ok(());
                }
                // Declarations, comments, processing instructions and doctypes
                // carry nothing for the model.
                _ => continue,
            }
        }
    }
}

impl EventSource for XmlEventReader<'_> {
    fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        if self.queue.is_empty() && !self.finished {
            self.fill()?;
        }
        Ok(self.queue.pop_front())
    }

    fn source_location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

fn namespace_string(resolved: &ResolveResult<'_>) -> Result<Option<String>> {
    match resolved {
        ResolveResult::Bound(ns) => Ok(Some(utf8(ns.as_ref())?)),
        ResolveResult::Unbound => Ok(None),
        ResolveResult::Unknown(prefix) => Err(Error::Xml(format!(
            "Unknown namespace prefix '{}'",
            String::from_utf8_lossy(prefix)
        ))),
    }
}

fn utf8(bytes: &[u8]) -> Result<String> {
    std::str::from_utf8(bytes)
        .map(str::to_string)
        .map_err(|e| Error::Xml(format!("Invalid UTF-8: {}", e)))
}

/// Events supplied directly, e.g. by an upstream validating reader
#[derive(Debug, Clone, Default)]
pub struct EventList {
    events: VecDeque<XmlEvent>,
    location: Option<String>,
}

impl EventList {
    /// Create an empty event list
    pub fn new() -> Self {
        Self::default()
    }

    /// Name the document in diagnostics
    pub fn with_location(mut self, location: impl Into<String>) -> Self {
        self.location = Some(location.into());
        self
    }

    /// Append a start-element event
    pub fn start(mut self, namespace: Option<&str>, local_name: &str, line_info: LineInfo) -> Self {
        self.events.push_back(XmlEvent::StartElement {
            name: QName::new(namespace, local_name),
            line_info,
        });
        self
    }

    /// Append an unqualified attribute event
    pub fn attribute(mut self, local_name: &str, value: &str) -> Self {
        let line_info = self.last_line_info();
        self.events.push_back(XmlEvent::Attribute(XmlAttribute {
            line_info,
            ..XmlAttribute::new(local_name, value)
        }));
        self
    }

    /// Append an attribute an upstream checker flagged as malformed
    pub fn invalid_attribute(mut self, local_name: &str, value: &str) -> Self {
        let line_info = self.last_line_info();
        self.events.push_back(XmlEvent::Attribute(XmlAttribute {
            line_info,
            invalid: true,
            ..XmlAttribute::new(local_name, value)
        }));
        self
    }

    /// Append a text event
    pub fn text(mut self, text: &str) -> Self {
        let line_info = self.last_line_info();
        self.events.push_back(XmlEvent::Text {
            text: text.to_string(),
            line_info,
        });
        self
    }

    /// Append an end-element event
    pub fn end(mut self) -> Self {
        let line_info = self.last_line_info();
        self.events.push_back(XmlEvent::EndElement { line_info });
        self
    }

    /// Append an arbitrary event
    pub fn push(&mut self, event: XmlEvent) {
        self.events.push_back(event);
    }

    fn last_line_info(&self) -> LineInfo {
        match self.events.back() {
            Some(XmlEvent::StartElement { line_info, .. })
            | Some(XmlEvent::Text { line_info, .. })
            | Some(XmlEvent::EndElement { line_info }) => *line_info,
            Some(XmlEvent::Attribute(attr)) => attr.line_info,
            None => LineInfo::unknown(),
        }
    }
}

impl EventSource for EventList {
    fn next_event(&mut self) -> Result<Option<XmlEvent>> {
        Ok(self.events.pop_front())
    }

    fn source_location(&self) -> Option<&str> {
        self.location.as_deref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn collect(source: &mut dyn EventSource) -> Result<Vec<XmlEvent>> {
        let mut events = Vec::new();
        while let Some(event) = source.next_event()? {
            events.push(event);
        }
        Ok(events)
    }

    #[test]
    fn test_reader_events() {
        let xml = "<Schema xmlns=\"urn:a\" Namespace=\"N\">\n  <Empty x:y=\"1\" xmlns:x=\"urn:x\"/>\n  <T>hello &amp; bye</T>\n</Schema>";
        let mut reader = XmlEventReader::from_str(xml).with_location("inline");
        assert_eq!(reader.source_location(), Some("inline"));

        let events = collect(&mut reader).unwrap();
        assert_eq!(
            events[0],
            XmlEvent::StartElement {
                name: QName::namespaced("urn:a", "Schema"),
                line_info: LineInfo::new(1, 1),
            }
        );
        match &events[1] {
            XmlEvent::Attribute(attr) => {
                assert!(attr.is("Namespace"));
                assert_eq!(attr.value, "N");
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &events[2] {
            XmlEvent::StartElement { name, line_info } => {
                assert_eq!(name.local_name, "Empty");
                assert_eq!(*line_info, LineInfo::new(2, 3));
            }
            other => panic!("unexpected event {:?}", other),
        }
        match &events[3] {
            XmlEvent::Attribute(attr) => assert!(attr.is_in("urn:x", "y")),
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events[4], XmlEvent::EndElement { .. }));
        match &events[6] {
            XmlEvent::Text { text, line_info } => {
                assert_eq!(text, "hello & bye");
                assert_eq!(line_info.line, 3);
            }
            other => panic!("unexpected event {:?}", other),
        }
        assert!(matches!(events.last(), Some(XmlEvent::EndElement { .. })));
    }

    #[test]
    fn test_reader_malformed() {
        let mut reader = XmlEventReader::from_str("<a><b></a>");
        assert!(collect(&mut reader).is_err());
    }

    #[test]
    fn test_reader_unknown_prefix() {
        let mut reader = XmlEventReader::from_str("<p:a/>");
        assert!(matches!(collect(&mut reader), Err(Error::Xml(_))));
    }

    #[test]
    fn test_event_list() {
        let mut list = EventList::new()
            .with_location("events")
            .start(Some("urn:a"), "Schema", LineInfo::new(1, 1))
            .attribute("Namespace", "N")
            .invalid_attribute("Alias", "1bad")
            .end();
        let events = collect(&mut list).unwrap();
        assert_eq!(events.len(), 4);
        match &events[2] {
            XmlEvent::Attribute(attr) => {
                assert!(attr.invalid);
                assert_eq!(attr.line_info, LineInfo::new(1, 1));
            }
            other => panic!("unexpected event {:?}", other),
        }
    }
}
