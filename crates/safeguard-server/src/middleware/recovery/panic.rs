//! Normalization of panic payloads into errors.

use std::any::Any;
use std::error::Error as StdError;
use std::sync::Arc;

use crate::BoxedError;

/// Rendering used for payloads that are neither errors, text nor primitives.
const UNKNOWN_PAYLOAD: &str = "unknown panic payload";

/// Panic payload as captured by [`std::panic::catch_unwind`].
pub type Panic = Box<dyn Any + Send + 'static>;

/// Recovers a registered error type from a panic payload, or hands the
/// payload back.
pub(crate) type PayloadDowncast = dyn Fn(Panic) -> Result<BoxedError, Panic> + Send + Sync;

/// Builds the [`PayloadDowncast`] of the error type `E`.
pub(crate) fn payload_downcast<E>() -> Arc<PayloadDowncast>
where
    E: StdError + Send + Sync + 'static,
{
    Arc::new(|payload: Panic| -> Result<BoxedError, Panic> {
        payload.downcast::<E>().map(|error| error as BoxedError)
    })
}

/// Error produced from a recovered panic.
#[derive(Debug, thiserror::Error)]
pub enum PanicError {
    /// The panic carried an error value, kept as-is.
    #[error("{0}")]
    Error(#[source] BoxedError),
    /// The panic carried a message (`panic!("...")`).
    #[error("{0}")]
    Message(String),
    /// The panic carried any other value, rendered as text.
    #[error("{0}")]
    Value(String),
}

impl PanicError {
    /// Classifies a panic payload.
    ///
    /// Error payloads (`BoxedError`, `anyhow::Error`, `PanicError`) are kept,
    /// text payloads (`String`, `&'static str`) become [`PanicError::Message`]
    /// and everything else becomes [`PanicError::Value`].
    pub fn from_payload(payload: Panic) -> Self {
        Self::from_payload_with(payload, &[])
    }

    /// Classifies a panic payload, also trying each of `payload_types`
    /// before falling back to [`PanicError::Value`].
    pub(crate) fn from_payload_with(
        payload: Panic,
        payload_types: &[Arc<PayloadDowncast>],
    ) -> Self {
        let payload = match payload.downcast::<PanicError>() {
            Ok(error) => return *error,
            Err(payload) => payload,
        };

        let payload = match payload.downcast::<BoxedError>() {
            Ok(error) => return Self::Error(*error),
            Err(payload) => payload,
        };

        let payload = match payload.downcast::<anyhow::Error>() {
            Ok(error) => return Self::Error((*error).into()),
            Err(payload) => payload,
        };

        let payload = match payload.downcast::<String>() {
            Ok(message) => return Self::Message(*message),
            Err(payload) => payload,
        };

        if let Some(message) = payload.downcast_ref::<&'static str>() {
            return Self::Message((*message).to_owned());
        }

        let mut payload = payload;
        for downcast in payload_types {
            payload = match downcast(payload) {
                Ok(error) => return Self::Error(error),
                Err(payload) => payload,
            };
        }

        Self::Value(render_value(&*payload))
    }

    /// Returns `true` if the payload was an error value.
    #[must_use]
    pub const fn is_error(&self) -> bool {
        matches!(self, Self::Error(_))
    }
}

/// Renders primitive payloads with `Display`.
fn render_value(payload: &(dyn Any + Send)) -> String {
    macro_rules! display_any {
        ($($ty:ty),+ $(,)?) => {
            $(
                if let Some(value) = payload.downcast_ref::<$ty>() {
                    return value.to_string();
                }
            )+
        };
    }

    display_any!(
        i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize, f32, f64, bool, char,
    );

    UNKNOWN_PAYLOAD.to_owned()
}

#[cfg(test)]
mod tests {
    use std::{io, panic};

    use super::*;

    #[derive(Debug, thiserror::Error)]
    #[error("test error panic")]
    struct TestError;

    fn catch(f: impl FnOnce() + panic::UnwindSafe) -> PanicError {
        match panic::catch_unwind(f) {
            Ok(()) => unreachable!("closure did not panic"),
            Err(payload) => PanicError::from_payload(payload),
        }
    }

    #[test]
    fn static_str_payload() {
        let error = catch(|| panic!("test panic string"));
        assert!(matches!(error, PanicError::Message(_)));
        assert_eq!(error.to_string(), "test panic string");
    }

    #[test]
    fn formatted_payload() {
        let error = catch(|| panic!("user {} missing", 7));
        assert!(matches!(error, PanicError::Message(_)));
        assert_eq!(error.to_string(), "user 7 missing");
    }

    #[test]
    fn boxed_error_payload() {
        let error = catch(|| panic::panic_any(BoxedError::from(TestError)));
        assert!(error.is_error());
        assert_eq!(error.to_string(), "test error panic");
        assert!(error.source().is_some_and(|source| source.is::<TestError>()));
    }

    #[test]
    fn anyhow_payload() {
        let error = catch(|| panic::panic_any(anyhow::anyhow!("anyhow panic")));
        assert!(error.is_error());
        assert_eq!(error.to_string(), "anyhow panic");
    }

    #[test]
    fn integer_payload() {
        let error = catch(|| panic::panic_any(42_i32));
        assert!(matches!(error, PanicError::Value(_)));
        assert_eq!(error.to_string(), "42");
    }

    #[test]
    fn unknown_payload() {
        struct Opaque;

        let error = catch(|| panic::panic_any(Opaque));
        assert_eq!(error.to_string(), UNKNOWN_PAYLOAD);
    }

    #[test]
    fn registered_error_payload() {
        let payload_types = [payload_downcast::<io::Error>()];
        let payload = panic::catch_unwind(|| panic::panic_any(io::Error::other("io boom")));

        let error = match payload {
            Ok(()) => unreachable!("closure did not panic"),
            Err(payload) => PanicError::from_payload_with(payload, &payload_types),
        };
        assert!(error.is_error());
        assert_eq!(error.to_string(), "io boom");
    }

    #[test]
    fn unregistered_error_payload() {
        let error = catch(|| panic::panic_any(io::Error::other("io boom")));
        assert!(matches!(error, PanicError::Value(_)));
    }

    #[test]
    fn panic_error_payload_is_kept() {
        let error = catch(|| panic::panic_any(PanicError::Value("kept".to_owned())));
        assert!(matches!(error, PanicError::Value(ref value) if value == "kept"));
    }
}
