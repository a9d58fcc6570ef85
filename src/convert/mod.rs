//! Payload converter chain.
//!
//! # Data Flow
//! ```text
//! validated request payload
//!     → c1.to_object → c2.to_object → … → worker body
//!
//! reply payload
//!     → … → c2.to_payload → c1.to_payload → JSON text
//! ```
//!
//! # Design Decisions
//! - Order-sensitive: forward runs in declared order, reverse in the
//!   opposite order
//! - Round-tripping is identity only when each converter is itself
//!   invertible; the chain does not check this
//! - Forward failures are the client's fault (400), reverse failures are
//!   ours (500)

pub mod key_case;

pub use key_case::KeyCase;

use serde_json::Value;
use std::fmt;
use std::sync::Arc;

/// Error raised by a converter.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{converter}: {reason}")]
pub struct ConvertError {
    pub converter: &'static str,
    pub reason: String,
}

impl ConvertError {
    pub fn new(converter: &'static str, reason: impl Into<String>) -> Self {
        Self {
            converter,
            reason: reason.into(),
        }
    }
}

/// A bidirectional payload transform.
pub trait Converter: Send + Sync + 'static {
    /// Short name used in diagnostics.
    fn name(&self) -> &'static str;

    /// Wire representation → object handed to workers.
    fn to_object(&self, payload: Value) -> Result<Value, ConvertError>;

    /// Object produced by workers → wire representation.
    fn to_payload(&self, object: Value) -> Result<Value, ConvertError>;
}

/// Ordered list of converters.
#[derive(Clone, Default)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn Converter>>,
}

impl ConverterChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a converter to the end of the chain.
    pub fn with(mut self, converter: impl Converter) -> Self {
        self.converters.push(Arc::new(converter));
        self
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    /// Apply every converter's `to_object` in declared order.
    pub fn to_object(&self, payload: Value) -> Result<Value, ConvertError> {
        self.converters
            .iter()
            .try_fold(payload, |value, converter| converter.to_object(value))
    }

    /// Apply every converter's `to_payload` in reverse order.
    pub fn to_payload(&self, object: Value) -> Result<Value, ConvertError> {
        self.converters
            .iter()
            .rev()
            .try_fold(object, |value, converter| converter.to_payload(value))
    }
}

impl fmt::Debug for ConverterChain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.converters.iter().map(|c| c.name()))
            .finish()
    }
}
