//! Event Grid eventing domain.
//!
//! This crate contains the event envelope model, the payload schemas the
//! samples exchange, the typed event dispatcher, and the publisher port.
//! Infrastructure crates implement the traits defined here; they never add
//! dispatch rules.
//!
//! ## Architectural Layer
//!
//! **Business logic + port definitions.** This crate has no I/O dependencies.
//! It defines *what* is needed; the `publisher` and `listener` crates define
//! *how* events travel over HTTP.
//!
//! ## Module Layout
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`identifiers`] | Newtype identifiers (`EventId`, `EventTypeName`, etc.) |
//! | [`types`] | Shared value types (`Timestamp`) |
//! | [`envelope`] | `EventEnvelope`, `EventMetadata`, batch parsing |
//! | [`payloads`] | Well-known payload schemas and their type names |
//! | [`dispatcher`] | `EventDispatcher`, decoders, handlers, outcomes |
//! | [`errors`] | Dispatch error taxonomy and retry policy |
//! | [`publisher`] | `EventPublisher` port and `PublishError` |

pub mod dispatcher;
pub mod envelope;
pub mod errors;
pub mod identifiers;
pub mod payloads;
pub mod publisher;
pub mod types;

// Re-export everything at the crate root for ergonomic usage by downstream crates.
pub use dispatcher::{
    decoder_fn, handler_fn, DecoderFn, DispatchOutcome, EventDispatcher, EventHandler, HandlerFn,
    JsonDecoder, PayloadDecoder, TypedEvent,
};
pub use envelope::{parse_batch, EventEnvelope, EventMetadata};
pub use errors::{DecodeError, DispatchError, HandlerError, RetryPolicy};
pub use identifiers::{DataVersion, EventId, EventTypeName};
pub use publisher::{EventPublisher, PublishError};
pub use types::Timestamp;
