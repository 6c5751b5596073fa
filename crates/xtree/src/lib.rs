//! xtree - builds ordered, attribute-bearing XML trees from parse events
//!
//! A token-level source (the built-in [`Reader`] or any [`EventSource`])
//! reports element starts and ends, character data, CDATA and errors. The
//! [`TreeBuilder`] turns those events into a [`Document`], recording for every
//! element whether its value came from parsed text or from a CDATA section.
//!
//! # Quick Start
//!
//! ```
//! use xtree::{parse_str, Config};
//! # fn main() -> Result<(), xtree::Error> {
//! let doc = parse_str("<note><to> Tove </to><body><![CDATA[<hi>]]></body></note>", Config::default())?;
//! let note = doc.root()?;
//! let to = doc.first_child_named(note, "to")?;
//! assert_eq!(doc.get(to).and_then(|el| el.value()), Some("Tove"));
//! let body = doc.first_child_named(note, "body")?;
//! assert_eq!(doc.get(body).and_then(|el| el.is_cdata()), Some(true));
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]

use tracing::{debug, instrument};

pub mod error;
pub use error::{Error, ErrorKind, Pos, Result, Span};

pub mod config;
pub use config::Config;

pub mod tree;
pub use tree::{Attributes, Content, ContentKind, Document, Element, NodeId};

pub mod event;
pub use event::{Event, EventHandler, EventSource, EventStream, Recorder};

pub mod content;
pub use content::ContentAccumulator;

pub mod builder;
pub use builder::TreeBuilder;

pub mod reader;
pub use reader::Reader;

/// Parse XML bytes with the built-in reader
#[instrument(skip(bytes), fields(len = bytes.len()))]
pub fn parse(bytes: &[u8], config: Config) -> Result<Document> {
    let mut reader = Reader::with_config(bytes, config);
    parse_with(&mut reader, config)
}

/// Parse an XML string with the built-in reader
pub fn parse_str(s: &str, config: Config) -> Result<Document> {
    parse(s.as_bytes(), config)
}

/// Build a document from any event source
pub fn parse_with<S: EventSource + ?Sized>(source: &mut S, config: Config) -> Result<Document> {
    let mut builder = TreeBuilder::new(config.trim_whitespace);
    let success = source.run(&mut builder);
    debug!(success, nodes = builder.document().len(), "event source finished");
    builder.finish(success)
}

impl Document {
    /// Parse XML bytes into a document
    pub fn from_bytes(bytes: &[u8], config: Config) -> Result<Self> {
        parse(bytes, config)
    }

    /// Parse an XML string into a document
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(s: &str, config: Config) -> Result<Self> {
        parse_str(s, config)
    }
}
