//! Directory (LDAP) access for account management: search users and
//! groups, resolve group members and authenticate users by binding as them.
#![forbid(unsafe_code)]

pub mod config;
pub mod directory;
pub mod error;
pub mod filter;
pub mod ldap;
pub mod service;
pub mod user;

pub use config::{Configuration, DirectoryConfig, EncryptionType, ServerType};
pub use directory::memory::MemoryDirectory;
pub use directory::{Connector, Entry, Scope, SearchRequest, Session};
pub use error::{DirectoryError, Result};
pub use ldap::LdapConnector;
pub use service::DirectoryService;
pub use user::{DirectoryGroup, DirectoryUser};
