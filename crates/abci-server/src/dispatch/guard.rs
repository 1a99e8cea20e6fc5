//! Containment of application panics.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};

use abci_types::{MessageKind, Reply, ResponseError};
use tracing::error;

use super::DISPATCH_TARGET;

/// Runs one application method, turning a panic into an internal fault
/// carrying the neutral payload.
///
/// The closure runs inside the lifecycle guard, so a contained panic leaves
/// the phase untouched and clears the in-flight marker as usual.
pub(super) fn guarded<T, F>(kind: MessageKind, call: F) -> Reply<T>
where
    T: Default,
    F: FnOnce() -> Reply<T>,
{
    match panic::catch_unwind(AssertUnwindSafe(call)) {
        Ok(result) => result,
        Err(payload) => {
            let message = panic_message(payload.as_ref());
            error!(
                target: DISPATCH_TARGET,
                %kind,
                panic = message,
                "application handler panicked"
            );
            Reply::failed(ResponseError::internal_fault(format!(
                "{kind} handler panicked: {message}"
            )))
        }
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("non-string panic payload")
}
