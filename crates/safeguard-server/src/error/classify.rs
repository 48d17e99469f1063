use std::any::type_name;
use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::iter;
use std::sync::Arc;

use super::ErrorClass;

type Matcher = dyn Fn(&(dyn StdError + 'static)) -> bool + Send + Sync;

/// A single entry of [`ClientErrors`].
#[derive(Clone)]
struct Sentinel {
    name: Cow<'static, str>,
    matches: Arc<Matcher>,
}

/// Ordered set of sentinel errors that mark a failure as the caller's fault.
///
/// An error is a client error if it, or any error in its [`source`] chain,
/// matches one of the sentinels. Sentinels are registered either by value
/// ([`with`]), compared with `PartialEq` after a successful downcast, or by
/// type ([`with_type`]), where any value of that type matches.
///
/// ```rust
/// use safeguard_server::{ClientErrors, ErrorClass};
///
/// #[derive(Debug, PartialEq, thiserror::Error)]
/// #[error("not found")]
/// struct NotFound;
///
/// let client_errors = ClientErrors::new().with(NotFound);
/// assert_eq!(client_errors.classify(&NotFound), ErrorClass::Client);
/// ```
///
/// [`source`]: std::error::Error::source
/// [`with`]: ClientErrors::with
/// [`with_type`]: ClientErrors::with_type
#[derive(Clone, Default)]
#[must_use = "client errors do nothing unless passed to an error handler"]
pub struct ClientErrors {
    sentinels: Vec<Sentinel>,
}

impl ClientErrors {
    /// Creates an empty set: every error is classified as a server error.
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a sentinel value.
    ///
    /// A link of the chain matches when it downcasts to `E` and compares
    /// equal to `sentinel`.
    pub fn with<E>(mut self, sentinel: E) -> Self
    where
        E: StdError + PartialEq + Send + Sync + 'static,
    {
        let name = sentinel.to_string();
        let matches = move |err: &(dyn StdError + 'static)| {
            err.downcast_ref::<E>().is_some_and(|err| *err == sentinel)
        };

        self.sentinels.push(Sentinel {
            name: Cow::Owned(name),
            matches: Arc::new(matches),
        });
        self
    }

    /// Registers every value of the error type `E` as a sentinel.
    pub fn with_type<E>(mut self) -> Self
    where
        E: StdError + 'static,
    {
        let matches = |err: &(dyn StdError + 'static)| err.is::<E>();

        self.sentinels.push(Sentinel {
            name: Cow::Borrowed(type_name::<E>()),
            matches: Arc::new(matches),
        });
        self
    }

    /// Returns the number of registered sentinels.
    #[must_use]
    pub fn len(&self) -> usize {
        self.sentinels.len()
    }

    /// Returns `true` if no sentinel is registered.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sentinels.is_empty()
    }

    /// Returns `true` if `err` or any of its sources matches a sentinel.
    #[must_use]
    pub fn matches(&self, err: &(dyn StdError + 'static)) -> bool {
        error_chain(err).any(|link| self.sentinels.iter().any(|s| (s.matches)(link)))
    }

    /// Classifies `err` as a client or server error.
    #[must_use]
    pub fn classify(&self, err: &(dyn StdError + 'static)) -> ErrorClass {
        if self.matches(err) {
            ErrorClass::Client
        } else {
            ErrorClass::Server
        }
    }
}

impl fmt::Debug for ClientErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list()
            .entries(self.sentinels.iter().map(|s| &s.name))
            .finish()
    }
}

/// Returns an iterator over `err` followed by its transitive sources.
pub fn error_chain<'a>(
    err: &'a (dyn StdError + 'static),
) -> impl Iterator<Item = &'a (dyn StdError + 'static)> {
    iter::successors(Some(err), |&err| err.source())
}

/// Returns `true` if `err` is, or wraps, any of the `client_errors`.
#[must_use]
pub fn is_any(err: &(dyn StdError + 'static), client_errors: &ClientErrors) -> bool {
    client_errors.matches(err)
}

/// Renders `err` and its sources as `outer: inner: ...`.
///
/// Sources whose message is already part of the rendered text are skipped,
/// so wrappers that format their source inline are not repeated.
#[must_use]
pub fn render_error_chain(err: &(dyn StdError + 'static)) -> String {
    let mut rendered = String::new();

    for link in error_chain(err) {
        let message = link.to_string();
        if message.is_empty() || rendered.contains(&message) {
            continue;
        }

        if !rendered.is_empty() {
            rendered.push_str(": ");
        }
        rendered.push_str(&message);
    }

    rendered
}
