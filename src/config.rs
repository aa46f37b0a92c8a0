//! Configuration manager for directory access.

use std::borrow::Cow;
use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use url::Url;
use validator::{Validate, ValidationError};

use crate::error::Result;

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
/// Overrides `bind_password` so the secret can stay out of the file.
const BIND_PASSWORD_ENV: &str = "LDAP_BIND_PASSWORD";
const LDAP_PORT: u16 = 389;
const LDAPS_PORT: u16 = 636;

#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
pub struct Configuration {
    #[serde(skip)]
    path: PathBuf,
    /// Related to LDAP configuration.
    pub ldap: Option<DirectoryConfig>,
}

/// Kind of directory server.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ServerType {
    #[default]
    Ldap,
    /// Microsoft Active Directory.
    #[serde(alias = "activedirectory")]
    Ad,
}

impl fmt::Display for ServerType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ServerType::Ldap => f.write_str("ldap"),
            ServerType::Ad => f.write_str("ad"),
        }
    }
}

/// Transport security of the directory connection.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EncryptionType {
    /// Plain `ldap://`.
    #[default]
    None,
    /// Plain `ldap://` upgraded with the StartTLS extended operation.
    StartTls,
    /// TLS from the first byte, `ldaps://`.
    Ldaps,
}

/// Directory server, credentials and schema mapping.
///
/// Attribute fields hold schema-specific names chosen by the operator. An
/// empty string means the attribute is not configured.
#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Validate)]
#[serde(default)]
pub struct DirectoryConfig {
    pub server_type: ServerType,
    #[validate(length(min = 1, message = "Server host is required."))]
    pub server_host: String,
    /// `0` picks the port matching `encryption_type`.
    pub server_port: u16,
    pub encryption_type: EncryptionType,
    /// Accept any certificate on TLS connections.
    pub skip_tls_verify: bool,
    /// Seconds before connect, bind or search give up.
    pub timeout: Option<u64>,
    #[validate(length(min = 1, message = "Base DN is required."))]
    pub base_dn: String,
    /// Admin DN credential to search. Empty for anonymous search.
    pub bind_dn: String,
    pub bind_password: String,
    #[validate(custom(function = "validate_filter"))]
    pub user_filter: String,
    #[validate(custom(function = "validate_filter"))]
    pub group_filter: String,
    pub attribute_user_rdn: String,
    pub attribute_user_firstname: String,
    pub attribute_user_lastname: String,
    pub attribute_user_email: String,
    pub attribute_user_display_name: String,
    pub attribute_user_group_name: String,
    pub attribute_group_member: String,
}

impl Configuration {
    pub fn path(mut self, path: PathBuf) -> Self {
        self.path = path;
        self
    }

    /// Reads the `config.yaml` file from the specified path or the default
    /// location.
    pub fn read(self) -> Self {
        let file_path = if self.path.is_file() {
            self.path.clone()
        } else {
            Path::new(DEFAULT_CONFIG_PATH).to_path_buf()
        };

        let file = match File::open(&file_path) {
            Ok(file) => file,
            Err(err) => return self.error(err),
        };

        match serde_yaml::from_reader::<_, Configuration>(file) {
            Ok(config) => config
                .path(file_path)
                .normalize(std::env::var(BIND_PASSWORD_ENV).ok()),
            Err(err) => self.error(err),
        }
    }

    /// Parse a configuration from YAML text. The environment is not read.
    pub fn parse(yaml: &str) -> std::result::Result<Self, serde_yaml::Error> {
        serde_yaml::from_str::<Configuration>(yaml)
            .map(|config| config.normalize(None))
    }

    /// Clean the `ldap` section, replacing its bind password with
    /// `bind_password` if any.
    fn normalize(mut self, bind_password: Option<String>) -> Self {
        self.ldap = self.ldap.map(|ldap| {
            let mut ldap = ldap.clean();
            if let Some(password) = bind_password {
                ldap.bind_password = password;
            }
            ldap
        });
        self
    }

    /// Return a default configuration as fallback.
    fn error(&self, err: impl std::error::Error) -> Self {
        tracing::error!(error = %err, path = ?self.path, "cannot read configuration file");
        Self::default()
    }
}

impl DirectoryConfig {
    /// Trim every string field and fill the default port.
    pub fn clean(mut self) -> Self {
        for field in [
            &mut self.server_host,
            &mut self.base_dn,
            &mut self.bind_dn,
            &mut self.user_filter,
            &mut self.group_filter,
            &mut self.attribute_user_rdn,
            &mut self.attribute_user_firstname,
            &mut self.attribute_user_lastname,
            &mut self.attribute_user_email,
            &mut self.attribute_user_display_name,
            &mut self.attribute_user_group_name,
            &mut self.attribute_group_member,
        ] {
            let trimmed = field.trim();
            if trimmed.len() != field.len() {
                *field = trimmed.to_owned();
            }
        }

        if self.server_port == 0 {
            self.server_port = match self.encryption_type {
                EncryptionType::Ldaps => LDAPS_PORT,
                EncryptionType::None | EncryptionType::StartTls => LDAP_PORT,
            };
        }

        self
    }

    /// Copy of this configuration searching users with `filter`.
    pub fn with_user_filter(&self, filter: impl Into<String>) -> Self {
        Self {
            user_filter: filter.into(),
            ..self.clone()
        }
    }

    /// Copy of this configuration searching groups with `filter`.
    pub fn with_group_filter(&self, filter: impl Into<String>) -> Self {
        Self {
            group_filter: filter.into(),
            ..self.clone()
        }
    }

    /// Address of the server, `ldap://host:port` or `ldaps://host:port`.
    pub fn url(&self) -> Result<Url> {
        let scheme = match self.encryption_type {
            EncryptionType::Ldaps => "ldaps",
            EncryptionType::None | EncryptionType::StartTls => "ldap",
        };
        let host = if self.server_host.contains(':')
            && !self.server_host.starts_with('[')
        {
            Cow::Owned(format!("[{}]", self.server_host))
        } else {
            Cow::Borrowed(self.server_host.as_str())
        };

        Ok(Url::parse(&format!("{scheme}://{host}:{}", self.server_port))?)
    }

    /// Time limit applied to each directory operation.
    pub fn operation_timeout(&self) -> Option<Duration> {
        self.timeout
            .filter(|secs| *secs > 0)
            .map(Duration::from_secs)
    }

    /// Attributes to request when searching users.
    pub fn user_filter_attributes(&self) -> Vec<String> {
        attribute_list(&[
            "dn",
            "cn",
            &self.attribute_user_rdn,
            &self.attribute_user_firstname,
            &self.attribute_user_lastname,
            &self.attribute_user_email,
            &self.attribute_user_display_name,
            &self.attribute_user_group_name,
        ])
    }

    /// Attributes to request when searching groups.
    pub fn group_filter_attributes(&self) -> Vec<String> {
        attribute_list(&["dn", "cn", &self.attribute_group_member])
    }
}

/// Keep configured names, first occurrence wins. Attribute names are
/// case-insensitive.
fn attribute_list(names: &[&str]) -> Vec<String> {
    let mut attributes: Vec<String> = Vec::with_capacity(names.len());
    for name in names.iter().filter(|name| !name.is_empty()) {
        if !attributes.iter().any(|a| a.eq_ignore_ascii_case(name)) {
            attributes.push((*name).to_owned());
        }
    }
    attributes
}

fn validate_filter(filter: &str) -> std::result::Result<(), ValidationError> {
    if filter.is_empty() {
        return Ok(());
    }

    ldap3::parse_filter(filter).map(|_| ()).map_err(|()| {
        ValidationError::new("filter")
            .with_message(format!("cannot parse search filter `{filter}`").into())
    })
}
