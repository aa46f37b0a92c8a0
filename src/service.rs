//! Directory operations: list users, list groups with their members and
//! authenticate users by binding as them.
//!
//! Each operation opens its own session, binds with the administrative
//! credentials and closes the session before returning, whether it
//! succeeded or not. Nothing is retried.

use std::collections::HashSet;

use validator::Validate;

use crate::config::DirectoryConfig;
use crate::directory::{Connector, SearchRequest, Session};
use crate::error::{DirectoryError, Result};
use crate::filter;
use crate::user::{DirectoryGroup, DirectoryUser};

/// Directory operations over a [`Connector`].
#[derive(Debug, Clone)]
pub struct DirectoryService<C> {
    connector: C,
    config: DirectoryConfig,
}

impl<C: Connector> DirectoryService<C> {
    /// Create a new [`DirectoryService`] once `config` is validated.
    pub fn new(connector: C, config: DirectoryConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { connector, config })
    }

    pub fn config(&self) -> &DirectoryConfig {
        &self.config
    }

    /// Users matching the user filter.
    ///
    /// Without user filter there is nothing to list and the server is not
    /// contacted. An empty result is not an error.
    pub async fn list_users(&self) -> Result<Vec<DirectoryUser>> {
        if self.config.user_filter.is_empty() {
            tracing::debug!("no user filter configured");
            return Ok(Vec::new());
        }

        let mut session = self.open().await?;
        let result = self.search_users(&mut session).await;
        release(session, result).await
    }

    /// Groups matching the group filter, with their members.
    ///
    /// Members that cannot be resolved are logged and skipped.
    pub async fn list_groups(&self) -> Result<Vec<DirectoryGroup>> {
        if self.config.group_filter.is_empty() {
            tracing::debug!("no group filter configured");
            return Ok(Vec::new());
        }

        let mut session = self.open().await?;
        let result = self.search_groups(&mut session).await;
        release(session, result).await
    }

    /// Users of the user filter and members of the group filter, without
    /// duplicates.
    pub async fn fetch_users(&self) -> Result<Vec<DirectoryUser>> {
        if self.config.user_filter.is_empty()
            && self.config.group_filter.is_empty()
        {
            tracing::debug!("neither user nor group filter configured");
            return Ok(Vec::new());
        }

        let mut session = self.open().await?;
        let result = self.collect_users(&mut session).await;
        release(session, result).await
    }

    /// Check `password` by binding as the only user whose RDN attribute is
    /// `username`.
    pub async fn authenticate(
        &self,
        username: &str,
        password: &str,
    ) -> Result<DirectoryUser> {
        if self.config.attribute_user_rdn.is_empty() {
            return Err(DirectoryError::MissingAttribute("attribute_user_rdn"));
        }

        // An empty simple bind is an anonymous bind, servers accept it.
        if password.is_empty() {
            tracing::info!(reason = "empty_password", "authentication failed");
            return Err(DirectoryError::Authentication {
                dn: username.to_owned(),
                reason: "empty password".into(),
            });
        }

        let query = filter::and(
            &self.config.user_filter,
            &filter::equality(&self.config.attribute_user_rdn, username),
        );

        let mut session = self.open().await?;
        let result = self.bind_user(&mut session, query, password).await;
        release(session, result).await
    }

    /// Connect and bind with the administrative credentials. An empty bind
    /// DN keeps the session anonymous.
    async fn open(&self) -> Result<C::Session> {
        let mut session = self.connector.connect(&self.config).await?;
        if self.config.bind_dn.is_empty() {
            return Ok(session);
        }

        tracing::debug!(dn = %self.config.bind_dn, "binding directory admin user");
        match session
            .bind(&self.config.bind_dn, &self.config.bind_password)
            .await
        {
            Ok(()) => Ok(session),
            Err(err) => release(session, Err(err)).await,
        }
    }

    async fn search_users(
        &self,
        session: &mut C::Session,
    ) -> Result<Vec<DirectoryUser>> {
        let request = SearchRequest::subtree(
            &self.config.base_dn,
            &self.config.user_filter,
            self.config.user_filter_attributes(),
        );
        let entries = session.search(&request).await?;

        tracing::info!(
            filter = %request.filter,
            count = entries.len(),
            "directory users found"
        );

        Ok(entries
            .iter()
            .map(|entry| DirectoryUser::from_entry(entry, &self.config))
            .collect())
    }

    async fn search_groups(
        &self,
        session: &mut C::Session,
    ) -> Result<Vec<DirectoryGroup>> {
        let request = SearchRequest::subtree(
            &self.config.base_dn,
            &self.config.group_filter,
            self.config.group_filter_attributes(),
        );
        let entries = session.search(&request).await?;

        tracing::info!(
            filter = %request.filter,
            count = entries.len(),
            "directory groups found"
        );

        let user_attributes = self.config.user_filter_attributes();
        let mut groups = Vec::with_capacity(entries.len());

        for entry in &entries {
            let mut group = DirectoryGroup::from_entry(entry);
            let members = entry.values(&self.config.attribute_group_member);

            if members.is_empty() {
                tracing::warn!(group = %entry.dn, "group member attribute returned no users");
                groups.push(group);
                continue;
            }

            tracing::debug!(group = %entry.dn, count = members.len(), "resolving group members");

            for member in members {
                let Some(query) = filter::rdn_filter(member) else {
                    tracing::warn!(%member, "skipping malformed member DN");
                    continue;
                };

                let request = SearchRequest::subtree(
                    &self.config.base_dn,
                    query,
                    user_attributes.clone(),
                );
                match session.search(&request).await {
                    Ok(found) if found.is_empty() => {
                        tracing::warn!(filter = %request.filter, "group member not found");
                    },
                    Ok(found) => group.members.extend(
                        found
                            .iter()
                            .map(|e| DirectoryUser::from_entry(e, &self.config)),
                    ),
                    Err(err) => {
                        tracing::warn!(error = %err, %member, "group member lookup failed");
                    },
                }
            }

            groups.push(group);
        }

        Ok(groups)
    }

    async fn collect_users(
        &self,
        session: &mut C::Session,
    ) -> Result<Vec<DirectoryUser>> {
        let mut users = Vec::new();

        if !self.config.user_filter.is_empty() {
            users.extend(self.search_users(session).await?);
        }
        if !self.config.group_filter.is_empty() {
            for group in self.search_groups(session).await? {
                users.extend(group.members);
            }
        }

        let mut seen = HashSet::new();
        users.retain(|user| seen.insert(user.dn.to_lowercase()));
        Ok(users)
    }

    async fn bind_user(
        &self,
        session: &mut C::Session,
        query: String,
        password: &str,
    ) -> Result<DirectoryUser> {
        let request = SearchRequest::subtree(
            &self.config.base_dn,
            query,
            self.config.user_filter_attributes(),
        );
        let mut entries = session.search(&request).await?;

        if entries.len() > 1 {
            tracing::info!(reason = "ambiguous_user", filter = %request.filter, "authentication failed");
            return Err(DirectoryError::Ambiguous {
                count: entries.len(),
                filter: request.filter,
            });
        }
        let Some(entry) = entries.pop() else {
            tracing::info!(reason = "user_not_found", filter = %request.filter, "authentication failed");
            return Err(DirectoryError::NotFound {
                filter: request.filter,
            });
        };

        session.bind(&entry.dn, password).await?;

        tracing::info!(dn = %entry.dn, "authentication successful");
        Ok(DirectoryUser::from_entry(&entry, &self.config))
    }
}

/// Close `session`, then hand back `result`. A failed close is logged.
async fn release<S: Session, T>(mut session: S, result: Result<T>) -> Result<T> {
    if let Err(err) = session.close().await {
        tracing::warn!(error = %err, "cannot close directory session");
    }
    result
}
