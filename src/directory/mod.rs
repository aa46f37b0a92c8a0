//! These traits define what the crate needs from a directory server.

pub mod memory;

use std::collections::HashMap;

use async_trait::async_trait;

use crate::config::DirectoryConfig;
use crate::error::Result;

/// Port opening sessions on a directory server.
#[async_trait]
pub trait Connector: Send + Sync {
    type Session: Session;

    /// Open a session on the server described by `config`.
    async fn connect(&self, config: &DirectoryConfig) -> Result<Self::Session>;
}

/// An open directory session.
///
/// Whoever opens a session closes it, on every exit path.
#[async_trait]
pub trait Session: Send {
    /// Authenticate the session as `dn`.
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<()>;

    /// Run a search. No matching entry is not an error.
    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<Entry>>;

    /// Release the session. Closing twice is a no-op.
    async fn close(&mut self) -> Result<()>;
}

/// Search depth below the base DN.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    /// The base entry only.
    Base,
    /// Direct children of the base entry.
    OneLevel,
    /// The base entry and everything below it.
    #[default]
    Subtree,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub base: String,
    pub scope: Scope,
    pub filter: String,
    pub attributes: Vec<String>,
}

impl SearchRequest {
    /// Search the whole subtree under `base`.
    pub fn subtree(
        base: impl Into<String>,
        filter: impl Into<String>,
        attributes: Vec<String>,
    ) -> Self {
        Self {
            base: base.into(),
            scope: Scope::Subtree,
            filter: filter.into(),
            attributes,
        }
    }
}

/// Directory entry: a DN and its attributes.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct Entry {
    pub dn: String,
    pub attrs: HashMap<String, Vec<String>>,
}

impl Entry {
    /// Create a new [`Entry`] without attributes.
    pub fn new(dn: impl Into<String>) -> Self {
        Self {
            dn: dn.into(),
            attrs: HashMap::new(),
        }
    }

    /// Add `values` under `name`.
    pub fn with_attribute<I, V>(mut self, name: impl Into<String>, values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<String>,
    {
        self.attrs
            .entry(name.into())
            .or_default()
            .extend(values.into_iter().map(Into::into));
        self
    }

    /// All values of an attribute. Names are case-insensitive; an empty
    /// name has no values.
    pub fn values(&self, name: &str) -> &[String] {
        if name.is_empty() {
            return &[];
        }

        self.attrs
            .get(name)
            .or_else(|| {
                self.attrs
                    .iter()
                    .find(|(key, _)| key.eq_ignore_ascii_case(name))
                    .map(|(_, values)| values)
            })
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    /// First value of an attribute, or `""`.
    pub fn value(&self, name: &str) -> &str {
        self.values(name)
            .first()
            .map(String::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entry_values() {
        let entry = Entry::new("ou=chemists,dc=example,dc=com")
            .with_attribute("ou", ["chemists"])
            .with_attribute(
                "uniqueMember",
                ["uid=curie,dc=example,dc=com", "uid=boyle,dc=example,dc=com"],
            );

        assert_eq!(entry.value("ou"), "chemists");
        assert_eq!(entry.values("uniquemember").len(), 2);
        assert_eq!(entry.value("UNIQUEMEMBER"), "uid=curie,dc=example,dc=com");
        assert!(entry.values("mail").is_empty());
        assert_eq!(entry.value("mail"), "");
        assert!(entry.values("").is_empty());
    }
}
