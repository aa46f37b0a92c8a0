//! Directory user and group representation.

use std::fmt;

use crate::config::DirectoryConfig;
use crate::directory::Entry;
use crate::filter;

/// User read from the directory.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectoryUser {
    pub dn: String,
    /// Value of the RDN attribute, the login name.
    pub remote_id: String,
    pub cn: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub display_name: String,
    pub groups: Vec<String>,
}

impl DirectoryUser {
    /// Map an entry using the attribute names of `config`.
    ///
    /// Without first and last name, both are split from the display name,
    /// or from the CN when there is no display name either.
    pub fn from_entry(entry: &Entry, config: &DirectoryConfig) -> Self {
        let cn = entry.value("cn").to_owned();
        let display_name =
            entry.value(&config.attribute_user_display_name).to_owned();
        let mut first_name =
            entry.value(&config.attribute_user_firstname).to_owned();
        let mut last_name =
            entry.value(&config.attribute_user_lastname).to_owned();

        if first_name.is_empty() && last_name.is_empty() {
            let source = if display_name.is_empty() {
                &cn
            } else {
                &display_name
            };
            (first_name, last_name) = split_name(source);
        }

        Self {
            dn: entry.dn.clone(),
            remote_id: entry.value(&config.attribute_user_rdn).to_owned(),
            cn,
            email: entry.value(&config.attribute_user_email).to_owned(),
            first_name,
            last_name,
            display_name,
            groups: entry.values(&config.attribute_user_group_name).to_vec(),
        }
    }

    /// First and last name joined by a space.
    pub fn full_name(&self) -> String {
        match (self.first_name.is_empty(), self.last_name.is_empty()) {
            (false, false) => format!("{} {}", self.first_name, self.last_name),
            (false, true) => self.first_name.clone(),
            (true, false) => self.last_name.clone(),
            (true, true) => self.cn.clone(),
        }
    }
}

impl fmt::Display for DirectoryUser {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "[{}] {} ({} {}) @ {}",
            self.remote_id, self.cn, self.first_name, self.last_name, self.email
        )
    }
}

fn split_name(name: &str) -> (String, String) {
    let name = name.trim();
    match name.split_once(char::is_whitespace) {
        Some((first, last)) => (first.to_owned(), last.trim().to_owned()),
        None => (name.to_owned(), String::new()),
    }
}

/// Group read from the directory, with its resolved members.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct DirectoryGroup {
    pub dn: String,
    /// `cn` of the group, or the value of its leading RDN.
    pub name: String,
    pub members: Vec<DirectoryUser>,
}

impl DirectoryGroup {
    pub fn from_entry(entry: &Entry) -> Self {
        let name = match entry.value("cn") {
            "" => filter::leading_rdn(&entry.dn)
                .map(|(_, value)| value.to_owned())
                .unwrap_or_default(),
            cn => cn.to_owned(),
        };

        Self {
            dn: entry.dn.clone(),
            name,
            members: Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> DirectoryConfig {
        DirectoryConfig {
            attribute_user_rdn: "uid".into(),
            attribute_user_firstname: "givenName".into(),
            attribute_user_lastname: "sn".into(),
            attribute_user_email: "mail".into(),
            attribute_user_group_name: "memberOf".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_from_entry() {
        let entry = Entry::new("uid=newton,dc=example,dc=com")
            .with_attribute("uid", ["newton"])
            .with_attribute("cn", ["Isaac Newton"])
            .with_attribute("sn", ["Newton"])
            .with_attribute("givenName", ["Isaac"])
            .with_attribute("mail", ["newton@ldap.forumsys.com"])
            .with_attribute("memberOf", ["ou=scientists,dc=example,dc=com"]);

        let user = DirectoryUser::from_entry(&entry, &config());
        assert_eq!(user.remote_id, "newton");
        assert_eq!(user.first_name, "Isaac");
        assert_eq!(user.last_name, "Newton");
        assert_eq!(user.email, "newton@ldap.forumsys.com");
        assert_eq!(user.groups, vec!["ou=scientists,dc=example,dc=com"]);
        assert_eq!(
            user.to_string(),
            "[newton] Isaac Newton (Isaac Newton) @ newton@ldap.forumsys.com"
        );
    }

    #[test]
    fn test_name_fallbacks() {
        let entry = Entry::new("uid=tesla,dc=example,dc=com")
            .with_attribute("uid", ["tesla"])
            .with_attribute("cn", ["Nikola Tesla"]);
        let user = DirectoryUser::from_entry(&entry, &config());
        assert_eq!(user.first_name, "Nikola");
        assert_eq!(user.last_name, "Tesla");

        let config = DirectoryConfig {
            attribute_user_display_name: "displayName".into(),
            ..config()
        };
        let entry = entry.with_attribute("displayName", ["Dr. Nikola  Tesla"]);
        let user = DirectoryUser::from_entry(&entry, &config);
        assert_eq!(user.first_name, "Dr.");
        assert_eq!(user.last_name, "Nikola  Tesla");
        assert_eq!(user.full_name(), "Dr. Nikola  Tesla");

        let entry = Entry::new("uid=euler,dc=example,dc=com")
            .with_attribute("cn", ["Euler"]);
        let user = DirectoryUser::from_entry(&entry, &config);
        assert_eq!(user.first_name, "Euler");
        assert!(user.last_name.is_empty());
        assert!(user.remote_id.is_empty());
    }

    #[test]
    fn test_group_name() {
        let group = DirectoryGroup::from_entry(
            &Entry::new("ou=chemists,dc=example,dc=com"),
        );
        assert_eq!(group.name, "chemists");

        let group = DirectoryGroup::from_entry(
            &Entry::new("ou=chemists,dc=example,dc=com")
                .with_attribute("cn", ["Chemists"]),
        );
        assert_eq!(group.name, "Chemists");
    }
}
