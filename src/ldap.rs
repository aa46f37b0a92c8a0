//! LDAP support.

use std::time::Duration;

use async_trait::async_trait;
use ldap3::{Ldap as Ldap3, LdapConnAsync, LdapConnSettings, LdapResult, SearchEntry};

use crate::config::{DirectoryConfig, EncryptionType};
use crate::directory::{Connector, Entry, Scope, SearchRequest, Session};
use crate::error::{DirectoryError, Result};

/// `invalidCredentials` result code.
const INVALID_CREDENTIALS: u32 = 49;

impl From<Scope> for ldap3::Scope {
    fn from(scope: Scope) -> Self {
        match scope {
            Scope::Base => ldap3::Scope::Base,
            Scope::OneLevel => ldap3::Scope::OneLevel,
            Scope::Subtree => ldap3::Scope::Subtree,
        }
    }
}

impl From<SearchEntry> for Entry {
    fn from(entry: SearchEntry) -> Self {
        Self {
            dn: entry.dn,
            attrs: entry.attrs,
        }
    }
}

/// How to reach the server of a [`DirectoryConfig`].
#[derive(Debug, Clone, PartialEq, Eq)]
struct ConnectOptions {
    address: String,
    starttls: bool,
    no_tls_verify: bool,
    timeout: Option<Duration>,
}

impl ConnectOptions {
    fn from_config(config: &DirectoryConfig) -> Result<Self> {
        Ok(Self {
            address: config.url()?.to_string(),
            starttls: config.encryption_type == EncryptionType::StartTls,
            no_tls_verify: config.skip_tls_verify,
            timeout: config.operation_timeout(),
        })
    }

    fn settings(&self) -> LdapConnSettings {
        let settings = LdapConnSettings::new()
            .set_starttls(self.starttls)
            .set_no_tls_verify(self.no_tls_verify);

        match self.timeout {
            Some(timeout) => settings.set_conn_timeout(timeout),
            None => settings,
        }
    }
}

/// LDAP manager to create connections.
#[derive(Debug, Default, Clone, Copy)]
pub struct LdapConnector;

#[async_trait]
impl Connector for LdapConnector {
    type Session = LdapSession;

    async fn connect(&self, config: &DirectoryConfig) -> Result<LdapSession> {
        let options = ConnectOptions::from_config(config)?;

        let (conn, ldap) =
            LdapConnAsync::with_settings(options.settings(), &options.address)
                .await
                .map_err(|err| DirectoryError::connection(&options.address, err))?;

        // The driver ends once the session unbinds.
        tokio::spawn(async move {
            if let Err(err) = conn.drive().await {
                tracing::warn!(error = %err, "LDAP connection driver stopped");
            }
        });

        tracing::info!(address = %options.address, server = %config.server_type, "LDAP connected");

        Ok(LdapSession {
            ldap,
            address: options.address,
            timeout: options.timeout,
            closed: false,
        })
    }
}

/// Session on an LDAP server.
#[derive(Debug)]
pub struct LdapSession {
    ldap: Ldap3,
    address: String,
    timeout: Option<Duration>,
    closed: bool,
}

impl LdapSession {
    fn ensure_open(&self) -> Result<()> {
        if self.closed {
            Err(DirectoryError::Closed)
        } else {
            Ok(())
        }
    }
}

/// Apply the operation timeout to the next request.
fn timed(ldap: &mut Ldap3, timeout: Option<Duration>) -> &mut Ldap3 {
    if let Some(timeout) = timeout {
        ldap.with_timeout(timeout);
    }
    ldap
}

fn describe(result: &LdapResult) -> String {
    if result.rc == INVALID_CREDENTIALS {
        "invalid credentials".to_owned()
    } else if result.text.is_empty() {
        format!("result code {}", result.rc)
    } else {
        format!("result code {}: {}", result.rc, result.text)
    }
}

#[async_trait]
impl Session for LdapSession {
    async fn bind(&mut self, dn: &str, secret: &str) -> Result<()> {
        self.ensure_open()?;

        let result = timed(&mut self.ldap, self.timeout)
            .simple_bind(dn, secret)
            .await
            .map_err(|err| DirectoryError::connection(&self.address, err))?;

        if result.rc != 0 {
            return Err(DirectoryError::Authentication {
                dn: dn.to_owned(),
                reason: describe(&result),
            });
        }

        tracing::debug!(%dn, "LDAP bind succeeded");
        Ok(())
    }

    async fn search(&mut self, request: &SearchRequest) -> Result<Vec<Entry>> {
        self.ensure_open()?;

        let attributes: Vec<&str> =
            request.attributes.iter().map(String::as_str).collect();
        let (entries, _) = timed(&mut self.ldap, self.timeout)
            .search(
                &request.base,
                request.scope.into(),
                &request.filter,
                attributes,
            )
            .await
            .and_then(|result| result.success())
            .map_err(|err| DirectoryError::search(&request.filter, err))?;

        tracing::debug!(
            filter = %request.filter,
            count = entries.len(),
            "LDAP search done"
        );

        Ok(entries
            .into_iter()
            .map(SearchEntry::construct)
            .map(Entry::from)
            .collect())
    }

    async fn close(&mut self) -> Result<()> {
        if self.closed {
            return Ok(());
        }

        self.closed = true;
        self.ldap
            .unbind()
            .await
            .map_err(|err| DirectoryError::connection(&self.address, err))
    }
}
