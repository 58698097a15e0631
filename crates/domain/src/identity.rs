//! Caller identity — who asked for an operation.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Identity of whoever requested a device operation.
///
/// Network callers are identified by the Common Name of their client
/// certificate. Physical triggers and callers without a certificate are
/// [`anonymous`](Self::anonymous).
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallerIdentity(Option<String>);

impl CallerIdentity {
    /// An identity carrying no name.
    #[must_use]
    pub fn anonymous() -> Self {
        Self(None)
    }

    /// An identity with the given name. Empty names are treated as anonymous.
    #[must_use]
    pub fn named(name: impl Into<String>) -> Self {
        let name = name.into();
        if name.is_empty() {
            Self(None)
        } else {
            Self(Some(name))
        }
    }

    /// The caller's name, if known.
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.as_deref()
    }

    #[must_use]
    pub fn is_anonymous(&self) -> bool {
        self.0.is_none()
    }
}

impl From<Option<String>> for CallerIdentity {
    fn from(value: Option<String>) -> Self {
        value.map_or_else(Self::anonymous, Self::named)
    }
}

impl fmt::Display for CallerIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.0 {
            Some(name) => f.write_str(name),
            None => f.write_str("<anonymous>"),
        }
    }
}
