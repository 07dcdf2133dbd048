//! Ordered attribute list construction.
//!
//! # Responsibilities
//! - Append `Method`, `URL` and every request header as key/value pairs
//! - Track the running count while header enumeration is in progress
//! - Surface allocation exhaustion as an error instead of aborting
//! - Flatten the list into a single buffer sized for the event
//!
//! # Design Decisions
//! - Entries borrow from the request; nothing is copied until encoding
//! - Every allocation, flattening included, goes through a [`ReservePolicy`]
//! - A failed append drops the partial list, which releases every entry

use std::borrow::Cow;
use std::sync::Arc;

use thiserror::Error;

/// Attribute key carrying the request method.
pub const METHOD_KEY: &str = "Method";

/// Attribute key carrying the request URL.
pub const URL_KEY: &str = "URL";

/// Number of entries present before any header is appended.
pub const BASE_ATTRIBUTE_COUNT: usize = 2;

/// Errors raised while building an attribute list.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AttributeError {
    /// Memory for the next entry could not be reserved.
    #[error("attribute list allocation failed after {appended} entries")]
    Exhausted { appended: usize },

    /// The exact-size buffer for the finished list could not be reserved.
    #[error("attribute list of {len} entries could not be flattened")]
    Flatten { len: usize },
}

/// A single key/value pair borrowed from the request being processed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute<'a> {
    pub key: Cow<'a, str>,
    pub value: Cow<'a, str>,
}

impl<'a> Attribute<'a> {
    pub fn new(key: impl Into<Cow<'a, str>>, value: impl Into<Cow<'a, str>>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Strategy for making room in an attribute buffer.
///
/// Implementations must leave `entries` untouched when they fail.
pub trait ReservePolicy: Send + Sync {
    fn reserve(
        &self,
        entries: &mut Vec<Attribute<'_>>,
        additional: usize,
    ) -> Result<(), AttributeError>;
}

/// Reserves from the global allocator with `Vec::try_reserve`.
#[derive(Debug, Default, Clone, Copy)]
pub struct HeapReserve;

impl ReservePolicy for HeapReserve {
    fn reserve(
        &self,
        entries: &mut Vec<Attribute<'_>>,
        additional: usize,
    ) -> Result<(), AttributeError> {
        entries
            .try_reserve(additional)
            .map_err(|_| AttributeError::Exhausted {
                appended: entries.len(),
            })
    }
}

/// Shared handle to the reserve policy used by every request.
pub fn default_policy() -> Arc<dyn ReservePolicy> {
    Arc::new(HeapReserve)
}

/// Incrementally builds the attribute list for one request.
pub struct AttributeListBuilder<'a, 'p> {
    entries: Vec<Attribute<'a>>,
    policy: &'p dyn ReservePolicy,
}

impl<'a, 'p> AttributeListBuilder<'a, 'p> {
    pub fn new(policy: &'p dyn ReservePolicy) -> Self {
        Self {
            entries: Vec::new(),
            policy,
        }
    }

    /// Start a list holding the `Method` and `URL` entries.
    pub fn for_request(
        policy: &'p dyn ReservePolicy,
        method: &'a str,
        url: &'a str,
    ) -> Result<Self, AttributeError> {
        let mut builder = Self::new(policy);
        builder.append(METHOD_KEY, method)?;
        builder.append(URL_KEY, url)?;
        Ok(builder)
    }

    /// Append one entry at the tail.
    pub fn append(
        &mut self,
        key: impl Into<Cow<'a, str>>,
        value: impl Into<Cow<'a, str>>,
    ) -> Result<(), AttributeError> {
        if self.entries.len() == self.entries.capacity() {
            self.policy.reserve(&mut self.entries, 1)?;
        }
        self.entries.push(Attribute::new(key, value));
        Ok(())
    }

    /// Append every pair yielded by `pairs`, stopping at the first failure.
    pub fn extend<I, K, V>(&mut self, pairs: I) -> Result<(), AttributeError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<Cow<'a, str>>,
        V: Into<Cow<'a, str>>,
    {
        for (key, value) in pairs {
            self.append(key, value)?;
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Move the entries into a buffer reserved up front for all of them.
    ///
    /// The buffer is never shrunk afterwards, so flattening allocates
    /// nothing outside the policy.
    pub fn materialize(self) -> Result<AttributeList<'a>, AttributeError> {
        let len = self.entries.len();
        let mut flat = Vec::new();
        self.policy
            .reserve(&mut flat, len)
            .map_err(|_| AttributeError::Flatten { len })?;
        flat.extend(self.entries);
        Ok(AttributeList { entries: flat })
    }
}

/// Final, contiguous attribute list attached to an event.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeList<'a> {
    entries: Vec<Attribute<'a>>,
}

impl<'a> AttributeList<'a> {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn as_slice(&self) -> &[Attribute<'a>] {
        &self.entries
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Attribute<'a>> {
        self.entries.iter()
    }
}

impl<'l, 'a> IntoIterator for &'l AttributeList<'a> {
    type Item = &'l Attribute<'a>;
    type IntoIter = std::slice::Iter<'l, Attribute<'a>>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}
