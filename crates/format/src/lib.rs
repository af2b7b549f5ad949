//! Access log format
//!
//! Compiles Apache httpd `LogFormat`-style patterns and renders event records
//! through them.
//!
//! # Architecture
//!
//! ```text
//! "combined" ──→ resolve_shorthand ──→ tokenize ──→ CompiledPattern (shared, immutable)
//!                                                          │
//!                               EventRecord ──→ Renderer ──┴──→ "1.1.1.1 - - [..] \"GET / HTTP/1.1\" 200 - \"-\" \"-\"\n"
//! ```
//!
//! # Example
//!
//! ```
//! use accesslog_format::{CompiledPattern, EventRecord, Renderer};
//!
//! let renderer = Renderer::new(CompiledPattern::compile("Sent %s to %h")).with_separator("\r\n");
//! let record = EventRecord::response().with_status(201).with_remote_address("1.1.1.1");
//!
//! assert_eq!(renderer.render(&record), "Sent 201 to 1.1.1.1\r\n");
//! ```

mod directive;
mod pattern;
mod record;
mod render;

pub use directive::{Directive, Header, REQUEST_PROTOCOL, REQUEST_TIME_FORMAT};
pub use pattern::{COMBINED, CompiledPattern, Token, resolve_shorthand};
pub use record::{
    EventRecord, Payload, QueryParams, RECEIVED_TAG, RESPONSE_KIND, RequestSource, SubEvent,
};
pub use render::{DEFAULT_SEPARATOR, FALLBACK, Renderer, Unresolved, UnresolvedReason};
