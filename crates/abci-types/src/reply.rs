//! Payload and error pair returned by application calls.

use crate::error::ResponseError;

/// What one application method hands back: its payload and, independently,
/// the error fields of the response.
///
/// A rejection keeps its payload, so a refused transaction can still report
/// gas, events and data.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Reply<T> {
    /// Response payload.
    pub value: T,
    /// Populated when the call was rejected or failed.
    pub error: Option<ResponseError>,
}

impl<T> Reply<T> {
    /// Successful reply.
    #[must_use]
    pub const fn ok(value: T) -> Self {
        Self { value, error: None }
    }

    /// Rejected reply that still carries `value`.
    #[must_use]
    pub const fn rejected(value: T, error: ResponseError) -> Self {
        Self {
            value,
            error: Some(error),
        }
    }

    /// Returns `true` unless a non-zero error code is attached.
    #[must_use]
    pub fn is_ok(&self) -> bool {
        self.error.as_ref().is_none_or(ResponseError::is_ok)
    }

    /// Splits the reply into the payload or, when rejected, the error alone.
    ///
    /// # Errors
    ///
    /// Returns the attached error when its code is non-zero; the payload is
    /// dropped.
    pub fn into_result(self) -> Result<T, ResponseError> {
        match self.error {
            Some(error) if !error.is_ok() => Err(error),
            _ => Ok(self.value),
        }
    }

    /// Transforms the payload, keeping the error fields.
    #[must_use]
    pub fn map<U>(self, transform: impl FnOnce(T) -> U) -> Reply<U> {
        Reply {
            value: transform(self.value),
            error: self.error,
        }
    }
}

impl<T: Default> Reply<T> {
    /// Failed reply with the neutral payload.
    #[must_use]
    pub fn failed(error: ResponseError) -> Self {
        Self::rejected(T::default(), error)
    }
}

impl<T> From<T> for Reply<T> {
    fn from(value: T) -> Self {
        Self::ok(value)
    }
}
