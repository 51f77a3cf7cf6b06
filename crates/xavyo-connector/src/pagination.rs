//! Page tokens and pages exchanged between the sync engine and connectors.
//!
//! A page token is opaque to the engine. The empty token starts a traversal
//! when passed in and ends it when handed back.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Opaque continuation token for paged listing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PageToken(String);

impl PageToken {
    /// Token that starts a fresh traversal.
    #[must_use]
    pub fn start() -> Self {
        Self(String::new())
    }

    /// Wrap a token previously handed out by a connector.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// Returns true if this token starts a fresh traversal.
    #[must_use]
    pub fn is_start(&self) -> bool {
        self.0.is_empty()
    }

    /// Returns the raw token.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PageToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for PageToken {
    fn from(token: &str) -> Self {
        Self(token.to_string())
    }
}

impl From<String> for PageToken {
    fn from(token: String) -> Self {
        Self(token)
    }
}

/// One page of results plus the token for the next page.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    /// Items on this page.
    pub items: Vec<T>,
    /// Token for the next page; empty when there are no further pages.
    pub next_page_token: String,
}

impl<T> Page<T> {
    /// Create a page that has a successor.
    pub fn new(items: Vec<T>, next_page_token: impl Into<String>) -> Self {
        Self {
            items,
            next_page_token: next_page_token.into(),
        }
    }

    /// Create the final page of a traversal.
    pub fn last(items: Vec<T>) -> Self {
        Self {
            items,
            next_page_token: String::new(),
        }
    }

    /// Create an empty final page.
    pub fn empty() -> Self {
        Self::last(Vec::new())
    }

    /// Returns true if another page follows.
    #[must_use]
    pub fn has_next(&self) -> bool {
        !self.next_page_token.is_empty()
    }

    /// Returns the token to request the next page with.
    #[must_use]
    pub fn next_token(&self) -> PageToken {
        PageToken::new(self.next_page_token.clone())
    }

    /// Map the items of this page, keeping its token.
    pub fn map<U, F>(self, f: F) -> Page<U>
    where
        F: FnMut(T) -> U,
    {
        Page {
            items: self.items.into_iter().map(f).collect(),
            next_page_token: self.next_page_token,
        }
    }
}
