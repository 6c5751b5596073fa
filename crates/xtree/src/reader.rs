//! Built-in token-level XML reader
//!
//! Scans UTF-8 input and reports what it recognizes to an [`EventHandler`].
//! Character data arrives in fragments: every literal run and every entity
//! reference is its own `on_characters` call. CDATA sections are handed over
//! as raw bytes. The first error is reported once through `on_fatal_error`
//! and stops the scan.

pub mod cursor;
pub mod entities;
pub mod namespace;

use std::borrow::Cow;

use tracing::{debug, trace};

use crate::config::Config;
use crate::error::{Error, ErrorKind, Pos, Result, Span};
use crate::event::{EventHandler, EventSource};
use crate::tree::Attributes;

use cursor::{is_whitespace, Cursor};
use entities::{EntityDef, EntityTable};
use namespace::{split_qname, NamespaceStack};

const BOM: &[u8] = b"\xEF\xBB\xBF";

/// An element whose end tag has not been seen yet
#[derive(Debug)]
struct OpenElement {
    qname: String,
    reported: String,
}

/// XML reader driving an [`EventHandler`]
#[derive(Debug)]
pub struct Reader<'a> {
    cursor: Cursor<'a>,
    config: Config,
    open: Vec<OpenElement>,
    entities: EntityTable,
    namespaces: NamespaceStack,
}

impl<'a> Reader<'a> {
    /// Create a reader with default configuration
    pub fn new(input: &'a [u8]) -> Self {
        Self::with_config(input, Config::default())
    }

    /// Create a reader with custom configuration
    pub fn with_config(input: &'a [u8], config: Config) -> Self {
        Self {
            cursor: Cursor::new(input),
            config,
            open: Vec::new(),
            entities: EntityTable::default(),
            namespaces: NamespaceStack::default(),
        }
    }

    /// Scan the whole document, stopping at the first error
    pub fn read(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        let size = self.cursor.remaining().len();
        if self.config.max_size > 0 && size > self.config.max_size {
            return Err(self.error(ErrorKind::MaxSizeExceeded {
                max: self.config.max_size,
            }));
        }

        self.cursor.eat(BOM);
        self.read_prolog()?;
        self.read_start_tag(handler)?;
        while !self.open.is_empty() {
            self.read_content(handler)?;
        }
        self.read_epilog()
    }

    fn read_prolog(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<!DOCTYPE") {
                self.read_doctype()?;
            } else if self.cursor.starts_with(b"<") {
                return Ok(());
            } else if self.cursor.is_eof() {
                return Err(self.error_with(ErrorKind::UnexpectedEof, "document has no root element"));
            } else {
                return Err(self.error_with(ErrorKind::InvalidToken, "content before root element"));
            }
        }
    }

    fn read_epilog(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.is_eof() {
                return Ok(());
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else {
                return Err(
                    self.error_with(ErrorKind::InvalidToken, "extra content at end of document")
                );
            }
        }
    }

    fn read_content(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        if self.cursor.is_eof() {
            let name = self.open.last().map(|el| el.qname.as_str()).unwrap_or_default();
            let message = format!("unclosed element <{name}>");
            return Err(self.error_with(ErrorKind::UnexpectedEof, message));
        }

        if self.cursor.starts_with(b"</") {
            self.read_end_tag(handler)
        } else if self.cursor.starts_with(b"<!--") {
            self.skip_comment()
        } else if self.cursor.starts_with(b"<![CDATA[") {
            self.read_cdata(handler)
        } else if self.cursor.starts_with(b"<?") {
            self.skip_processing_instruction()
        } else if self.cursor.starts_with(b"<!") {
            Err(self.error_with(ErrorKind::InvalidToken, "unexpected markup declaration"))
        } else if self.cursor.starts_with(b"<") {
            self.read_start_tag(handler)
        } else {
            self.read_text(handler)
        }
    }

    fn read_start_tag(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        self.expect_byte(b'<')?;
        let qname = self.parse_name()?;
        let mut attributes = self.parse_attributes()?;
        let self_closing = self.cursor.eat(b"/");
        self.expect_byte(b'>')?;

        if self.config.max_depth > 0 && self.open.len() >= usize::from(self.config.max_depth) {
            return Err(self.error(ErrorKind::MaxDepthExceeded {
                max: self.config.max_depth,
            }));
        }

        let reported = if self.config.process_namespaces {
            let bindings = self.namespaces.push_scope(&mut attributes);
            if self.config.report_namespace_prefixes {
                for (prefix, uri) in &bindings {
                    handler.on_start_prefix_mapping(prefix, uri);
                }
            }
            self.check_prefixes(&qname, &attributes)?;
            split_qname(&qname).1.to_string()
        } else {
            qname.clone()
        };

        trace!(element = %qname, depth = self.open.len(), "start tag");
        handler.on_element_start(&reported, attributes);
        self.open.push(OpenElement { qname, reported });

        if self_closing {
            self.close_element(handler);
        }
        Ok(())
    }

    fn read_end_tag(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        let start = self.cursor.position();
        self.cursor.advance_by(2);
        let name = self.parse_name()?;
        self.cursor.skip_whitespace();
        self.expect_byte(b'>')?;

        let expected = self.open.last().map(|el| el.qname.as_str()).unwrap_or_default();
        if expected != name {
            return Err(Error::at(
                ErrorKind::MismatchedTag {
                    expected: expected.to_string(),
                    found: name,
                },
                start,
            ));
        }
        self.close_element(handler);
        Ok(())
    }

    fn close_element(&mut self, handler: &mut dyn EventHandler) {
        let Some(element) = self.open.pop() else {
            return;
        };
        handler.on_element_end(&element.reported);
        if self.config.process_namespaces {
            let declared = self.namespaces.pop_scope();
            if self.config.report_namespace_prefixes {
                for prefix in declared.iter().rev() {
                    handler.on_end_prefix_mapping(prefix);
                }
            }
        }
    }

    fn check_prefixes(&self, qname: &str, attributes: &Attributes) -> Result<()> {
        let attribute_prefixes = attributes
            .keys()
            .filter_map(|name| split_qname(name).0)
            .filter(|prefix| *prefix != "xmlns");
        for prefix in split_qname(qname).0.into_iter().chain(attribute_prefixes) {
            if self.namespaces.resolve(prefix).is_none() {
                return Err(self.error(ErrorKind::UnboundPrefix {
                    prefix: prefix.to_string(),
                }));
            }
        }
        Ok(())
    }

    fn read_cdata(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        let start = self.cursor.position();
        self.cursor.advance_by(b"<![CDATA[".len());
        match self.cursor.take_until(b"]]>") {
            Some(bytes) => {
                handler.on_cdata(&normalize_line_endings(bytes));
                Ok(())
            }
            None => Err(Error::with_message(
                ErrorKind::UnexpectedEof,
                Span::new(start, self.cursor.position()),
                "unterminated CDATA section",
            )),
        }
    }

    fn read_text(&mut self, handler: &mut dyn EventHandler) -> Result<()> {
        loop {
            let start = self.cursor.pos();
            while let Some(b) = self.cursor.current() {
                if b == b'<' || b == b'&' {
                    break;
                }
                self.cursor.advance();
            }
            let run = normalize_line_endings(self.cursor.slice_from(start));
            if !run.is_empty() {
                let text = std::str::from_utf8(&run).map_err(|_| self.error(ErrorKind::InvalidUtf8))?;
                handler.on_characters(text);
            }

            if self.cursor.current() != Some(b'&') {
                return Ok(());
            }
            if let Some(replacement) = self.read_reference(true)? {
                handler.on_characters(&replacement);
            }
        }
    }

    /// Resolve one `&name;` reference at the cursor. `None` means the
    /// reference produces no text (an external entity left unresolved).
    fn read_reference(&mut self, in_content: bool) -> Result<Option<String>> {
        let start = self.cursor.position();
        self.cursor.advance();
        let name_start = self.cursor.pos();
        while let Some(b) = self.cursor.current() {
            if b == b';' || b == b'<' || b == b'&' || is_whitespace(b) {
                break;
            }
            self.cursor.advance();
        }
        let name = String::from_utf8_lossy(self.cursor.slice_from(name_start)).into_owned();
        if !self.cursor.eat(b";") {
            return Err(Error::at(ErrorKind::InvalidEntity { name }, start));
        }

        let mut active = Vec::new();
        self.resolve_reference(&name, in_content, start, &mut active)
    }

    /// Replacement text for a reference by name. `active` holds the
    /// entities being expanded around this one.
    fn resolve_reference(
        &self,
        name: &str,
        in_content: bool,
        at: Pos,
        active: &mut Vec<String>,
    ) -> Result<Option<String>> {
        if let Some(ch) = entities::predefined(name).or_else(|| entities::numeric(name)) {
            return Ok(Some(ch.to_string()));
        }
        match self.entities.get(name) {
            Some(EntityDef::Internal(text)) => {
                if active.iter().any(|open| open == name) {
                    return Err(Error::with_message(
                        ErrorKind::InvalidEntity {
                            name: name.to_string(),
                        },
                        Span::at(at),
                        format!("entity &{name}; refers to itself"),
                    ));
                }
                active.push(name.to_string());
                let expanded = self.expand_replacement(text, in_content, at, active)?;
                active.pop();
                Ok(Some(expanded))
            }
            Some(EntityDef::External { system_id }) if in_content => {
                self.load_external(system_id, at)
            }
            _ => Err(Error::at(
                ErrorKind::InvalidEntity {
                    name: name.to_string(),
                },
                at,
            )),
        }
    }

    /// Expand the references left in an internal entity's replacement text
    fn expand_replacement(
        &self,
        text: &str,
        in_content: bool,
        at: Pos,
        active: &mut Vec<String>,
    ) -> Result<String> {
        let mut result = String::with_capacity(text.len());
        let mut rest = text;
        while let Some(amp) = rest.find('&') {
            let (before, after) = rest.split_at(amp);
            result.push_str(before);
            let after = after.get(1..).unwrap_or_default();
            let Some(semi) = after.find(';') else {
                return Err(Error::at(
                    ErrorKind::InvalidEntity {
                        name: after.to_string(),
                    },
                    at,
                ));
            };
            let (name, tail) = after.split_at(semi);
            if let Some(replacement) = self.resolve_reference(name, in_content, at, active)? {
                result.push_str(&replacement);
            }
            if self.config.max_size > 0 && result.len() > self.config.max_size {
                return Err(Error::at(
                    ErrorKind::MaxSizeExceeded {
                        max: self.config.max_size,
                    },
                    at,
                ));
            }
            rest = tail.get(1..).unwrap_or_default();
        }
        result.push_str(rest);
        Ok(result)
    }

    fn load_external(&self, system_id: &str, at: Pos) -> Result<Option<String>> {
        if !self.config.resolve_external_entities {
            debug!(system_id, "skipping external entity reference");
            return Ok(None);
        }
        std::fs::read_to_string(system_id).map(Some).map_err(|err| {
            Error::with_message(
                ErrorKind::ExternalEntity {
                    system_id: system_id.to_string(),
                },
                Span::at(at),
                format!("failed to load external entity {system_id}: {err}"),
            )
        })
    }

    fn parse_attributes(&mut self) -> Result<Attributes> {
        let mut attrs = Attributes::new();

        loop {
            let had_space = self.cursor.skip_whitespace();
            match self.cursor.current() {
                Some(b'/') | Some(b'>') => break,
                Some(_) if !had_space => {
                    return Err(self.error_with(ErrorKind::InvalidToken, "expected whitespace"))
                }
                Some(_) => {}
                None => return Err(self.error(ErrorKind::UnexpectedEof)),
            }

            let name_pos = self.cursor.position();
            let name = self.parse_name()?;
            self.cursor.skip_whitespace();
            self.expect_byte(b'=')?;
            self.cursor.skip_whitespace();
            let value = self.parse_attribute_value()?;

            if attrs.contains_key(&name) {
                return Err(Error::at(ErrorKind::DuplicateAttribute { name }, name_pos));
            }
            attrs.insert(name, value);
        }

        Ok(attrs)
    }

    fn parse_attribute_value(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b'"') => b'"',
            Some(b'\'') => b'\'',
            _ => return Err(self.error_with(ErrorKind::InvalidToken, "expected quoted attribute value")),
        };
        self.cursor.advance();

        let mut value = String::new();
        loop {
            let start = self.cursor.pos();
            while let Some(b) = self.cursor.current() {
                if b == quote || b == b'&' || b == b'<' {
                    break;
                }
                self.cursor.advance();
            }
            let raw = normalize_line_endings(self.cursor.slice_from(start));
            let run = std::str::from_utf8(&raw).map_err(|_| self.error(ErrorKind::InvalidUtf8))?;
            // attribute-value normalization
            value.extend(run.chars().map(|ch| match ch {
                '\t' | '\n' | '\r' => ' ',
                other => other,
            }));

            match self.cursor.current() {
                Some(b) if b == quote => {
                    self.cursor.advance();
                    return Ok(value);
                }
                Some(b'&') => {
                    if let Some(text) = self.read_reference(false)? {
                        value.push_str(&text);
                    }
                }
                Some(_) => {
                    return Err(self.error_with(ErrorKind::InvalidToken, "'<' in attribute value"))
                }
                None => return Err(self.error_with(ErrorKind::UnexpectedEof, "unterminated attribute value")),
            }
        }
    }

    fn parse_name(&mut self) -> Result<String> {
        let start_pos = self.cursor.position();
        let start = self.cursor.pos();

        match self.cursor.current() {
            Some(first) if is_name_start(first) => self.cursor.advance(),
            Some(_) => return Err(Error::at(ErrorKind::InvalidToken, start_pos)),
            None => return Err(self.error_with(ErrorKind::UnexpectedEof, "expected name")),
        }
        while let Some(b) = self.cursor.current() {
            if is_name_char(b) {
                self.cursor.advance();
            } else {
                break;
            }
        }

        std::str::from_utf8(self.cursor.slice_from(start))
            .map(str::to_string)
            .map_err(|_| Error::at(ErrorKind::InvalidUtf8, start_pos))
    }

    fn read_doctype(&mut self) -> Result<()> {
        self.cursor.advance_by(b"<!DOCTYPE".len());
        loop {
            match self.cursor.current() {
                Some(b'>') => {
                    self.cursor.advance();
                    return Ok(());
                }
                Some(b'[') => {
                    self.cursor.advance();
                    self.read_internal_subset()?;
                }
                Some(b'"') | Some(b'\'') => {
                    self.parse_quoted()?;
                }
                Some(_) => self.cursor.advance(),
                None => return Err(self.error_with(ErrorKind::UnexpectedEof, "unterminated DOCTYPE")),
            }
        }
    }

    fn read_internal_subset(&mut self) -> Result<()> {
        loop {
            self.cursor.skip_whitespace();
            if self.cursor.eat(b"]") {
                return Ok(());
            } else if self.cursor.starts_with(b"<!--") {
                self.skip_comment()?;
            } else if self.cursor.starts_with(b"<?") {
                self.skip_processing_instruction()?;
            } else if self.cursor.eat(b"<!ENTITY") {
                self.read_entity_declaration()?;
            } else if self.cursor.starts_with(b"<!") {
                self.skip_declaration()?;
            } else if self.cursor.eat(b"%") {
                // parameter entity references are not expanded
                self.cursor.take_until(b";");
            } else if self.cursor.is_eof() {
                return Err(self.error_with(ErrorKind::UnexpectedEof, "unterminated internal subset"));
            } else {
                return Err(self.error_with(ErrorKind::InvalidToken, "unexpected content in DOCTYPE"));
            }
        }
    }

    fn read_entity_declaration(&mut self) -> Result<()> {
        self.cursor.skip_whitespace();
        let parameter = self.cursor.eat(b"%");
        self.cursor.skip_whitespace();
        let name = self.parse_name()?;
        self.cursor.skip_whitespace();

        let def = if self.cursor.eat(b"SYSTEM") {
            self.cursor.skip_whitespace();
            EntityDef::External {
                system_id: self.parse_quoted()?,
            }
        } else if self.cursor.eat(b"PUBLIC") {
            self.cursor.skip_whitespace();
            self.parse_quoted()?;
            self.cursor.skip_whitespace();
            EntityDef::External {
                system_id: self.parse_quoted()?,
            }
        } else {
            let pos = self.cursor.position();
            let literal = self.parse_quoted()?;
            let text = entities::expand_literal(&literal)
                .map_err(|name| Error::at(ErrorKind::InvalidEntity { name }, pos))?;
            EntityDef::Internal(text)
        };
        self.skip_declaration()?;

        if parameter {
            trace!(entity = %name, "ignoring parameter entity");
        } else {
            trace!(entity = %name, ?def, "declared entity");
            self.entities.declare(name, def);
        }
        Ok(())
    }

    /// Skip to the `>` closing a markup declaration, honoring quotes
    fn skip_declaration(&mut self) -> Result<()> {
        loop {
            match self.cursor.current() {
                Some(b'>') => {
                    self.cursor.advance();
                    return Ok(());
                }
                Some(b'"') | Some(b'\'') => {
                    self.parse_quoted()?;
                }
                Some(_) => self.cursor.advance(),
                None => return Err(self.error_with(ErrorKind::UnexpectedEof, "unterminated declaration")),
            }
        }
    }

    fn parse_quoted(&mut self) -> Result<String> {
        let quote = match self.cursor.current() {
            Some(b @ (b'"' | b'\'')) => b,
            _ => return Err(self.error_with(ErrorKind::InvalidToken, "expected quoted literal")),
        };
        self.cursor.advance();
        let raw = self
            .cursor
            .take_until(&[quote])
            .ok_or_else(|| self.error_with(ErrorKind::UnexpectedEof, "unterminated literal"))?;
        std::str::from_utf8(raw)
            .map(str::to_string)
            .map_err(|_| self.error(ErrorKind::InvalidUtf8))
    }

    fn skip_comment(&mut self) -> Result<()> {
        self.cursor.advance_by(b"<!--".len());
        self.cursor
            .take_until(b"-->")
            .map(|_| ())
            .ok_or_else(|| self.error_with(ErrorKind::UnexpectedEof, "unterminated comment"))
    }

    fn skip_processing_instruction(&mut self) -> Result<()> {
        self.cursor.advance_by(b"<?".len());
        self.cursor
            .take_until(b"?>")
            .map(|_| ())
            .ok_or_else(|| {
                self.error_with(ErrorKind::UnexpectedEof, "unterminated processing instruction")
            })
    }

    fn expect_byte(&mut self, expected: u8) -> Result<()> {
        if self.cursor.consume(expected) {
            Ok(())
        } else if self.cursor.is_eof() {
            Err(self.error(ErrorKind::UnexpectedEof))
        } else {
            let message = format!("expected '{}'", char::from(expected));
            Err(self.error_with(ErrorKind::InvalidToken, message))
        }
    }

    fn error(&self, kind: ErrorKind) -> Error {
        Error::at(kind, self.cursor.position())
    }

    fn error_with(&self, kind: ErrorKind, message: impl Into<String>) -> Error {
        Error::with_message(kind, Span::at(self.cursor.position()), message)
    }
}

impl EventSource for Reader<'_> {
    fn run(&mut self, handler: &mut dyn EventHandler) -> bool {
        match self.read(handler) {
            Ok(()) => true,
            Err(err) => {
                debug!(%err, "reader stopped");
                handler.on_fatal_error(err);
                false
            }
        }
    }
}

/// XML end-of-line handling: `\r\n` and lone `\r` become `\n`
fn normalize_line_endings(bytes: &[u8]) -> Cow<'_, [u8]> {
    if !bytes.contains(&b'\r') {
        return Cow::Borrowed(bytes);
    }
    let mut out = Vec::with_capacity(bytes.len());
    let mut iter = bytes.iter().copied().peekable();
    while let Some(b) = iter.next() {
        if b == b'\r' {
            iter.next_if_eq(&b'\n');
            out.push(b'\n');
        } else {
            out.push(b);
        }
    }
    Cow::Owned(out)
}

fn is_name_start(b: u8) -> bool {
    matches!(b, b'A'..=b'Z' | b'a'..=b'z' | b'_' | b':') || b >= 0x80
}

fn is_name_char(b: u8) -> bool {
    is_name_start(b) || matches!(b, b'0'..=b'9' | b'-' | b'.')
}
