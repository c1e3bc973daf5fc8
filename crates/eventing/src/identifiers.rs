//! Newtype identifiers for events and event types.
//!
//! Every concept with an identity is a distinct newtype wrapping a string.
//! This keeps an [`EventId`] from being passed where an [`EventTypeName`] is
//! expected even though both are strings on the wire.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// Macro for String-wrapped newtypes.
// Generates: struct, new() returning Option<Self>, as_str(), Display.
// ---------------------------------------------------------------------------
macro_rules! string_id {
    (
        $(#[$attr:meta])*
        $name:ident
    ) => {
        $(#[$attr])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            /// Creates a new identifier, returning `None` if the value is empty.
            pub fn new(value: impl Into<String>) -> Option<Self> {
                let v = value.into();
                if v.is_empty() { None } else { Some(Self(v)) }
            }

            /// Returns the identifier as a string slice.
            pub fn as_str(&self) -> &str {
                &self.0
            }

            /// Returns `true` if the wrapped value is empty.
            ///
            /// Only possible for values that bypassed [`Self::new`] through
            /// deserialisation; envelope parsing rejects them.
            pub fn is_empty(&self) -> bool {
                self.0.is_empty()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{}", self.0)
            }
        }
    };
}

string_id! {
    /// Unique identifier of one event instance.
    ///
    /// Producers choose the format; events built by this workspace use a
    /// random UUID.
    EventId
}

impl EventId {
    /// Generates a new random event identifier.
    pub fn new_random() -> Self {
        Self(Uuid::new_v4().to_string())
    }
}

// ---------------------------------------------------------------------------
// Data version
// ---------------------------------------------------------------------------

/// Schema version of an event's `data` payload (e.g. `"2.0"`).
///
/// May be empty: the transport fills in an empty version when the producer
/// omits one.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DataVersion(String);

impl DataVersion {
    /// Creates a data version from any string.
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the version as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DataVersion {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// Event type names
// ---------------------------------------------------------------------------

/// An event-type discriminator such as `"Microsoft.Storage.BlobCreated"`.
///
/// Producers do not agree on casing, so comparison goes through the fold of
/// the name: surrounding whitespace is trimmed and the rest lowercased. A
/// received `" Contoso.Items.ItemReceived "` therefore matches a registration
/// for `"contoso.items.itemreceived"`. The name as originally written is kept
/// for display and error reporting.
#[derive(Debug, Clone)]
pub struct EventTypeName {
    display: String,
    folded: String,
}

impl EventTypeName {
    /// Creates a type name, returning `None` if it is empty or whitespace.
    pub fn new(value: impl Into<String>) -> Option<Self> {
        let display = value.into();
        if display.trim().is_empty() {
            return None;
        }
        let folded = fold(&display);
        Some(Self { display, folded })
    }

    /// Returns the name as originally written.
    pub fn as_str(&self) -> &str {
        &self.display
    }

    /// Returns the case-folded name used for comparison.
    pub fn folded(&self) -> &str {
        &self.folded
    }

    /// Returns `true` if `other` names the same event type, ignoring case.
    pub fn matches(&self, other: &str) -> bool {
        self.folded == fold(other)
    }
}

/// Folds an event type name for case-insensitive comparison.
pub(crate) fn fold(name: &str) -> String {
    name.trim().to_lowercase()
}

impl std::fmt::Display for EventTypeName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.display)
    }
}
