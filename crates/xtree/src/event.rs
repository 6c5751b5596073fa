//! Parse events and the callback protocol between a token source and a handler

use crate::error::Error;
use crate::tree::Attributes;

/// Receiver of parse events, called synchronously in document order
///
/// Handlers never fail: diagnostics arrive through
/// [`on_fatal_error`](Self::on_fatal_error) and are consulted once the
/// source has finished.
pub trait EventHandler {
    fn on_element_start(&mut self, name: &str, attributes: Attributes);

    fn on_characters(&mut self, chunk: &str);

    fn on_cdata(&mut self, bytes: &[u8]);

    /// `name` is informational; handlers may ignore it.
    fn on_element_end(&mut self, name: &str);

    fn on_fatal_error(&mut self, error: Error);

    /// A namespace prefix comes into scope (empty prefix for the default)
    fn on_start_prefix_mapping(&mut self, _prefix: &str, _uri: &str) {}

    fn on_end_prefix_mapping(&mut self, _prefix: &str) {}
}

/// Producer of parse events
pub trait EventSource {
    /// Feed every event to `handler`. The return value is the completion
    /// signal: `false` means the source gave up.
    fn run(&mut self, handler: &mut dyn EventHandler) -> bool;
}

/// Owned parse event
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    ElementStart {
        name: String,
        attributes: Attributes,
    },
    Characters(String),
    CData(Vec<u8>),
    ElementEnd(String),
    StartPrefixMapping {
        prefix: String,
        uri: String,
    },
    EndPrefixMapping(String),
    FatalError(Error),
}

impl Event {
    pub fn start(name: impl Into<String>) -> Self {
        Self::ElementStart {
            name: name.into(),
            attributes: Attributes::new(),
        }
    }

    pub fn start_with<K, V, I>(name: impl Into<String>, attributes: I) -> Self
    where
        K: Into<String>,
        V: Into<String>,
        I: IntoIterator<Item = (K, V)>,
    {
        Self::ElementStart {
            name: name.into(),
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    pub fn end(name: impl Into<String>) -> Self {
        Self::ElementEnd(name.into())
    }

    pub fn text(chunk: impl Into<String>) -> Self {
        Self::Characters(chunk.into())
    }

    pub fn cdata(bytes: impl Into<Vec<u8>>) -> Self {
        Self::CData(bytes.into())
    }

    /// Deliver this event to `handler`
    pub fn dispatch(self, handler: &mut dyn EventHandler) {
        match self {
            Self::ElementStart { name, attributes } => handler.on_element_start(&name, attributes),
            Self::Characters(chunk) => handler.on_characters(&chunk),
            Self::CData(bytes) => handler.on_cdata(&bytes),
            Self::ElementEnd(name) => handler.on_element_end(&name),
            Self::StartPrefixMapping { prefix, uri } => {
                handler.on_start_prefix_mapping(&prefix, &uri);
            }
            Self::EndPrefixMapping(prefix) => handler.on_end_prefix_mapping(&prefix),
            Self::FatalError(error) => handler.on_fatal_error(error),
        }
    }
}

/// A recorded event sequence with a fixed completion signal
///
/// Replays exactly what it was given, malformed nesting included.
#[derive(Clone, Debug, PartialEq)]
pub struct EventStream {
    events: Vec<Event>,
    success: bool,
}

impl EventStream {
    /// A stream that completes successfully
    pub fn new(events: Vec<Event>) -> Self {
        Self {
            events,
            success: true,
        }
    }

    /// A stream that reports failure after its last event
    pub fn failing(events: Vec<Event>) -> Self {
        Self {
            events,
            success: false,
        }
    }

    pub fn events(&self) -> &[Event] {
        &self.events
    }
}

impl FromIterator<Event> for EventStream {
    fn from_iter<I: IntoIterator<Item = Event>>(iter: I) -> Self {
        Self::new(iter.into_iter().collect())
    }
}

impl EventSource for EventStream {
    fn run(&mut self, handler: &mut dyn EventHandler) -> bool {
        for event in std::mem::take(&mut self.events) {
            event.dispatch(handler);
        }
        self.success
    }
}

/// Handler that records everything it receives
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Recorder {
    pub events: Vec<Event>,
}

impl EventHandler for Recorder {
    fn on_element_start(&mut self, name: &str, attributes: Attributes) {
        self.events.push(Event::ElementStart {
            name: name.to_string(),
            attributes,
        });
    }

    fn on_characters(&mut self, chunk: &str) {
        self.events.push(Event::Characters(chunk.to_string()));
    }

    fn on_cdata(&mut self, bytes: &[u8]) {
        self.events.push(Event::CData(bytes.to_vec()));
    }

    fn on_element_end(&mut self, name: &str) {
        self.events.push(Event::ElementEnd(name.to_string()));
    }

    fn on_fatal_error(&mut self, error: Error) {
        self.events.push(Event::FatalError(error));
    }

    fn on_start_prefix_mapping(&mut self, prefix: &str, uri: &str) {
        self.events.push(Event::StartPrefixMapping {
            prefix: prefix.to_string(),
            uri: uri.to_string(),
        });
    }

    fn on_end_prefix_mapping(&mut self, prefix: &str) {
        self.events.push(Event::EndPrefixMapping(prefix.to_string()));
    }
}
