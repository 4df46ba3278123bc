//! Callback storage and guarded dispatch.

use std::any::Any;
use std::panic::{catch_unwind, AssertUnwindSafe};

use crate::CallbackError;

/// Return type of every observer callback.
pub type CallbackResult = Result<(), CallbackError>;

/// Payload-free change notification used by aggregating and decorating
/// observers.
pub type Notify = Box<dyn FnMut()>;

/// What an opened observer reports to.
pub(crate) enum Listener<C: ?Sized> {
    Callback(Box<C>),
    Notify(Notify),
}

/// Runs `f`, converting both a returned error and a panic into
/// `Err(CallbackError)`.
pub(crate) fn guarded<F>(f: F) -> CallbackResult
where
    F: FnOnce() -> CallbackResult,
{
    match catch_unwind(AssertUnwindSafe(f)) {
        Ok(result) => result,
        Err(payload) => Err(CallbackError::Panicked(panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_guarded_passes_through_ok() {
        assert!(guarded(|| Ok(())).is_ok());
    }

    #[test]
    fn test_guarded_returns_error() {
        let err = guarded(|| Err("boom".into())).unwrap_err();
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_guarded_catches_panic() {
        let err = guarded(|| panic!("exploded")).unwrap_err();
        assert!(matches!(err, CallbackError::Panicked(ref m) if m == "exploded"));

        let code = 7;
        let err = guarded(|| panic!("code {code}")).unwrap_err();
        assert_eq!(err.to_string(), "callback panicked: code 7");
    }
}
