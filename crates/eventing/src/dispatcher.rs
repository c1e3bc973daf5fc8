//! Typed event dispatch.
//!
//! An [`EventDispatcher`] holds a table of registrations keyed by
//! case-folded event type name. Each registration pairs a
//! [`PayloadDecoder`] that turns the opaque `data` value into a typed value
//! with an [`EventHandler`] that consumes it.
//!
//! Dispatching one envelope is a single request/response step:
//!
//! 1. Parse the envelope. Failure → [`DispatchError::MalformedEnvelope`].
//! 2. Look up `eventType`, ignoring case. No match → [`DispatchOutcome::Unhandled`].
//!    Producers evolve independently, so unknown types are not errors.
//! 3. Decode `data` with the matched decoder. Failure →
//!    [`DispatchError::DecodeFailure`] naming the matched type.
//! 4. Invoke the matched handler with the decoded value.
//!
//! Registration takes `&mut self`. Once the dispatcher is shared (typically
//! behind an `Arc`) the table cannot change, so concurrent `dispatch` calls
//! need no synchronisation. The dispatcher applies no timeout and performs no
//! retries; both belong to the caller and the delivering transport.

use std::collections::HashMap;
use std::future::Future;
use std::marker::PhantomData;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument};

use crate::identifiers::fold;
use crate::{
    DecodeError, DispatchError, EventEnvelope, EventId, EventMetadata, EventTypeName,
    HandlerError,
};

// ---------------------------------------------------------------------------
// Decoders
// ---------------------------------------------------------------------------

/// Turns an envelope's opaque `data` value into a typed payload.
pub trait PayloadDecoder<T>: Send + Sync {
    /// Decodes `data`. Must not return a partially populated value.
    fn decode(&self, data: &Value) -> Result<T, DecodeError>;
}

/// Decodes payloads with `serde`.
///
/// Some producers put the payload in `data` as a JSON document encoded in a
/// string. When the value is a string and decoding it directly fails, the
/// string's content is decoded instead.
pub struct JsonDecoder<T>(PhantomData<fn() -> T>);

impl<T> JsonDecoder<T> {
    /// Creates a decoder for `T`.
    pub fn new() -> Self {
        Self(PhantomData)
    }
}

impl<T> Default for JsonDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: DeserializeOwned> PayloadDecoder<T> for JsonDecoder<T> {
    fn decode(&self, data: &Value) -> Result<T, DecodeError> {
        match T::deserialize(data) {
            Ok(value) => Ok(value),
            Err(direct) => match data {
                Value::String(embedded) => {
                    serde_json::from_str(embedded).map_err(|_| DecodeError::from(direct))
                }
                _ => Err(direct.into()),
            },
        }
    }
}

/// Adapts a closure into a [`PayloadDecoder`].
pub struct DecoderFn<F>(F);

/// Wraps `f` as a [`PayloadDecoder`].
pub fn decoder_fn<T, F>(f: F) -> DecoderFn<F>
where
    F: Fn(&Value) -> Result<T, DecodeError> + Send + Sync,
{
    DecoderFn(f)
}

impl<T, F> PayloadDecoder<T> for DecoderFn<F>
where
    F: Fn(&Value) -> Result<T, DecodeError> + Send + Sync,
{
    fn decode(&self, data: &Value) -> Result<T, DecodeError> {
        (self.0)(data)
    }
}

// ---------------------------------------------------------------------------
// Handlers
// ---------------------------------------------------------------------------

/// A decoded event: the envelope's metadata plus its typed payload.
#[derive(Debug, Clone, PartialEq)]
pub struct TypedEvent<T> {
    pub metadata: EventMetadata,
    pub data: T,
}

/// Consumes decoded events of one type.
///
/// Handlers may perform I/O. Returning an error does not stop other
/// envelopes from being dispatched; the error is surfaced to the caller as
/// [`DispatchError::HandlerFailure`] with the handler's [`crate::RetryPolicy`].
#[async_trait]
pub trait EventHandler<T>: Send + Sync
where
    T: Send + 'static,
{
    async fn handle(&self, event: TypedEvent<T>) -> Result<(), HandlerError>;
}

/// Adapts an async closure into an [`EventHandler`].
pub struct HandlerFn<F>(F);

/// Wraps `f` as an [`EventHandler`].
///
/// ```ignore
/// dispatcher.register_json::<ContosoItemReceivedEventData, _>(
///     CONTOSO_ITEM_RECEIVED,
///     handler_fn(|event: TypedEvent<ContosoItemReceivedEventData>| async move {
///         tracing::info!(sku = %event.data.item_sku, "item received");
///         Ok(())
///     }),
/// );
/// ```
pub fn handler_fn<T, F, Fut>(f: F) -> HandlerFn<F>
where
    T: Send + 'static,
    F: Fn(TypedEvent<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    HandlerFn(f)
}

#[async_trait]
impl<T, F, Fut> EventHandler<T> for HandlerFn<F>
where
    T: Send + 'static,
    F: Fn(TypedEvent<T>) -> Fut + Send + Sync,
    Fut: Future<Output = Result<(), HandlerError>> + Send + 'static,
{
    async fn handle(&self, event: TypedEvent<T>) -> Result<(), HandlerError> {
        (self.0)(event).await
    }
}

// ---------------------------------------------------------------------------
// Type-erased registrations
// ---------------------------------------------------------------------------

#[async_trait]
trait Route: Send + Sync {
    fn event_type(&self) -> &EventTypeName;

    async fn route(&self, envelope: EventEnvelope) -> Result<(), DispatchError>;
}

struct TypedRoute<T, D, H> {
    event_type: EventTypeName,
    decoder: D,
    handler: H,
    _payload: PhantomData<fn() -> T>,
}

#[async_trait]
impl<T, D, H> Route for TypedRoute<T, D, H>
where
    T: Send + 'static,
    D: PayloadDecoder<T>,
    H: EventHandler<T>,
{
    fn event_type(&self) -> &EventTypeName {
        &self.event_type
    }

    async fn route(&self, envelope: EventEnvelope) -> Result<(), DispatchError> {
        let (metadata, data) = envelope.into_parts();
        let decoded = self
            .decoder
            .decode(&data)
            .map_err(|err| DispatchError::DecodeFailure {
                event_type: self.event_type.to_string(),
                reason: err.to_string(),
            })?;

        self.handler
            .handle(TypedEvent {
                metadata,
                data: decoded,
            })
            .await
            .map_err(|err| DispatchError::HandlerFailure {
                event_type: self.event_type.to_string(),
                message: err.message().to_string(),
                retry: err.retry_policy().clone(),
            })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher
// ---------------------------------------------------------------------------

/// Result of dispatching one envelope that did not fail.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// A registration matched; its handler ran and returned `Ok`.
    Handled {
        event_id: EventId,
        /// The registered name that matched.
        event_type: String,
    },
    /// No registration matched. Nothing was decoded or invoked.
    Unhandled {
        event_id: EventId,
        /// The envelope's `eventType` as received.
        event_type: String,
    },
}

impl DispatchOutcome {
    /// Returns `true` if a registered handler ran.
    pub fn is_handled(&self) -> bool {
        matches!(self, Self::Handled { .. })
    }

    /// The `id` of the dispatched envelope.
    pub fn event_id(&self) -> &EventId {
        match self {
            Self::Handled { event_id, .. } | Self::Unhandled { event_id, .. } => event_id,
        }
    }

    /// The registered name for [`Handled`](Self::Handled), otherwise the
    /// received `eventType`.
    pub fn event_type(&self) -> &str {
        match self {
            Self::Handled { event_type, .. } | Self::Unhandled { event_type, .. } => event_type,
        }
    }
}

/// Routes envelopes to typed handlers by event type.
#[derive(Clone, Default)]
pub struct EventDispatcher {
    routes: HashMap<String, Arc<dyn Route>>,
}

impl std::fmt::Debug for EventDispatcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventDispatcher")
            .field("registered_types", &self.registered_types().collect::<Vec<_>>())
            .finish()
    }
}

impl EventDispatcher {
    /// Creates a dispatcher with no registrations.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `decoder` and `handler` for `event_type`.
    ///
    /// Returns `true` if a registration with the same case-folded name was
    /// replaced.
    ///
    /// # Panics
    ///
    /// Panics if `event_type` is empty or whitespace. Type names are
    /// compile-time constants in practice; an empty one is a programming error.
    pub fn register<T, D, H>(&mut self, event_type: &str, decoder: D, handler: H) -> bool
    where
        T: Send + 'static,
        D: PayloadDecoder<T> + 'static,
        H: EventHandler<T> + 'static,
    {
        let name = EventTypeName::new(event_type)
            .unwrap_or_else(|| panic!("event type name must not be blank: {event_type:?}"));
        let key = name.folded().to_string();
        let route = TypedRoute {
            event_type: name,
            decoder,
            handler,
            _payload: PhantomData,
        };

        let replaced = self.routes.insert(key, Arc::new(route)).is_some();
        debug!(event_type, replaced, "registered event handler");
        replaced
    }

    /// Registers `handler` for `event_type` with a [`JsonDecoder`].
    pub fn register_json<T, H>(&mut self, event_type: &str, handler: H) -> bool
    where
        T: DeserializeOwned + Send + 'static,
        H: EventHandler<T> + 'static,
    {
        self.register(event_type, JsonDecoder::<T>::new(), handler)
    }

    /// Returns `true` if `event_type` has a registration, ignoring case.
    pub fn contains(&self, event_type: &str) -> bool {
        self.routes.contains_key(&fold(event_type))
    }

    /// Registered type names, as written at registration. Order is unspecified.
    pub fn registered_types(&self) -> impl Iterator<Item = &str> {
        self.routes.values().map(|route| route.event_type().as_str())
    }

    /// Number of registered event types.
    pub fn len(&self) -> usize {
        self.routes.len()
    }

    /// Returns `true` if nothing is registered.
    pub fn is_empty(&self) -> bool {
        self.routes.is_empty()
    }

    /// Parses `raw` as one envelope and dispatches it.
    pub async fn dispatch(&self, raw: &[u8]) -> Result<DispatchOutcome, DispatchError> {
        let envelope = EventEnvelope::from_slice(raw)?;
        self.dispatch_envelope(envelope).await
    }

    /// Dispatches an already parsed envelope.
    #[instrument(
        name = "dispatch",
        skip_all,
        fields(event_id = %envelope.id, event_type = %envelope.event_type)
    )]
    pub async fn dispatch_envelope(
        &self,
        envelope: EventEnvelope,
    ) -> Result<DispatchOutcome, DispatchError> {
        let event_id = envelope.id.clone();

        let Some(route) = self.routes.get(&fold(&envelope.event_type)) else {
            debug!("no registration for event type");
            return Ok(DispatchOutcome::Unhandled {
                event_id,
                event_type: envelope.event_type,
            });
        };

        route.route(envelope).await?;
        debug!("event handled");
        Ok(DispatchOutcome::Handled {
            event_id,
            event_type: route.event_type().to_string(),
        })
    }
}
