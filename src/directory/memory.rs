//! In-memory directory.
//!
//! Same contract as the LDAP adapter without a network. Sessions are
//! counted so callers can check that every opened session is closed.

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, PoisonError};

use async_trait::async_trait;
use ldap3_proto::filter::parse_ldap_filter_str;
use ldap3_proto::proto::{LdapFilter, LdapSubstringFilter};

use crate::config::DirectoryConfig;
use crate::directory::{Connector, Entry, Scope, SearchRequest, Session};
use crate::error::{DirectoryError, Result};

#[derive(Debug, Default)]
struct Stats {
    opened: AtomicUsize,
    closed: AtomicUsize,
    binds: Mutex<Vec<String>>,
}

/// Directory server kept in memory.
#[derive(Debug, Clone, Default)]
pub struct MemoryDirectory {
    entries: Vec<Entry>,
    /// Secrets keyed by lowercase DN.
    passwords: HashMap<String, String>,
    failing_filters: HashSet<String>,
    unreachable: bool,
    stats: Arc<Stats>,
}

impl MemoryDirectory {
    /// Create an empty [`MemoryDirectory`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Add an entry.
    pub fn with_entry(mut self, entry: Entry) -> Self {
        self.entries.push(entry);
        self
    }

    /// Allow binding as `dn` with `secret`. `dn` needs no entry.
    pub fn with_password(
        mut self,
        dn: impl Into<String>,
        secret: impl Into<String>,
    ) -> Self {
        self.passwords
            .insert(dn.into().to_lowercase(), secret.into());
        self
    }

    /// Reject searches using exactly this filter.
    pub fn failing_on(mut self, filter: impl Into<String>) -> Self {
        self.failing_filters.insert(filter.into());
        self
    }

    /// Refuse every connection.
    pub fn unreachable(mut self) -> Self {
        self.unreachable = true;
        self
    }

    /// Number of sessions opened so far.
    pub fn sessions_opened(&self) -> usize {
        self.stats.opened.load(Ordering::SeqCst)
    }

    /// Number of sessions closed so far.
    pub fn sessions_closed(&self) -> usize {
        self.stats.closed.load(Ordering::SeqCst)
    }

    /// DNs of every bind attempt, in order.
    pub fn binds(&self) -> Vec<String> {
        self.stats
            .binds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    fn in_scope(entry: &Entry, base: &str, scope: Scope) -> bool {
        let dn = entry.dn.to_lowercase();
        let base = base.trim().to_lowercase();

        match scope {
            Scope::Base => dn == base,
            Scope::OneLevel => dn
                .split_once(',')
                .is_some_and(|(_, parent)| parent.trim() == base),
            Scope::Subtree => {
                base.is_empty()
                    || dn == base
                    || dn.ends_with(&format!(",{base}"))
            },
        }
    }
}

/// Evaluate `filter` on `entry`. Attribute names and values compare
/// case-insensitively. Ordering and extensible matches never match.
fn matches(filter: &LdapFilter, entry: &Entry) -> bool {
    match filter {
        LdapFilter::And(filters) => filters.iter().all(|f| matches(f, entry)),
        LdapFilter::Or(filters) => filters.iter().any(|f| matches(f, entry)),
        LdapFilter::Not(filter) => !matches(filter, entry),
        LdapFilter::Present(attribute) => !entry.values(attribute).is_empty(),
        LdapFilter::Equality(attribute, value)
        | LdapFilter::Approx(attribute, value) => entry
            .values(attribute)
            .iter()
            .any(|v| v.eq_ignore_ascii_case(value)),
        LdapFilter::Substring(attribute, substring) => entry
            .values(attribute)
            .iter()
            .any(|v| substring_matches(v, substring)),
        _ => false,
    }
}

fn substring_matches(value: &str, filter: &LdapSubstringFilter) -> bool {
    let value = value.to_lowercase();
    let mut rest = value.as_str();

    if let Some(initial) = &filter.initial {
        match rest.strip_prefix(initial.to_lowercase().as_str()) {
            Some(tail) => rest = tail,
            None => return false,
        }
    }

    for any in &filter.any {
        let any = any.to_lowercase();
        match rest.find(&any) {
            Some(index) => rest = &rest[index + any.len()..],
            None => return false,
        }
    }

    match &filter.final_ {
        Some(last) => rest.ends_with(&last.to_lowercase()),
        None => true,
    }
}

/// Keep requested attributes only. No attribute, or `*`, keeps all.
fn project(entry: &Entry, attributes: &[String]) -> Entry {
    if attributes.is_empty() || attributes.iter().any(|a| a == "*") {
        return entry.clone();
    }

    Entry {
        dn: entry.dn.clone(),
        attrs: entry
            .attrs
            .iter()
            .filter(|(name, _)| {
                attributes.iter().any(|a| a.eq_ignore_ascii_case(name))
            })
            .map(|(name, values)| (name.clone(), values.clone()))
            .collect(),
    }
}

#[async_trait]
impl Connector for MemoryDirectory {
    type Session = MemorySession;

    async fn connect(&self, config: &DirectoryConfig) -> Result<MemorySession> {
        if self.unreachable {
            return Err(DirectoryError::connection(
                format!("{}:{}", config.server_host, config.server_port),
                std::io::Error::from(std::io::ErrorKind::ConnectionRefused),
            ));
        }

        self.stats.opened.fetch_add(1, Ordering::SeqCst);
        Ok(MemorySession {
            directory: self.clone(),
            bound: None,
            closed: false,
        })
    }
}

/// Session on a [`MemoryDirectory`].
#[derive(Debug)]
pub struct MemorySession {
    directory: MemoryDirectory,
    bound: Option<String>,
    closed: bool,
}

#[async_trait]
impl Session for MemorySession {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<()> {
        if self.closed {
            return Err(DirectoryError::Closed);
        }

        self.directory
            .stats
            .binds
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(dn.to_owned());

        let accepted = !secret.is_empty()
            && self
                .directory
                .passwords
                .get(&dn.to_lowercase())
                .is_some_and(|expected| expected == secret);
        if !accepted {
            self.bound = None;
            return Err(DirectoryError::Authentication {
                dn: dn.to_owned(),
                reason: "invalid credentials".into(),
            });
        }

        self.bound = Some(dn.to_owned());
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<Entry>> {
        if self.closed {
            return Err(DirectoryError::Closed);
        }
        if self.bound.is_none() {
            return Err(DirectoryError::search(
                &request.filter,
                "insufficient access rights",
            ));
        }
        if self.directory.failing_filters.contains(&request.filter) {
            return Err(DirectoryError::search(
                &request.filter,
                "server is unwilling to perform",
            ));
        }

        let filter = parse_ldap_filter_str(&request.filter).map_err(|err| {
            DirectoryError::search(&request.filter, err.to_string())
        })?;

        Ok(self
            .directory
            .entries
            .iter()
            .filter(|entry| {
                MemoryDirectory::in_scope(entry, &request.base, request.scope)
            })
            .filter(|entry| matches(&filter, entry))
            .map(|entry| project(entry, &request.attributes))
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        if !self.closed {
            self.closed = true;
            self.directory.stats.closed.fetch_add(1, Ordering::SeqCst);
        }
        Ok(())
    }
}
