#![allow(dead_code)]

use autha_directory::{DirectoryConfig, Entry, MemoryDirectory};

pub const BASE_DN: &str = "dc=example,dc=com";
pub const ADMIN_DN: &str = "cn=read-only-admin,dc=example,dc=com";
pub const PASSWORD: &str = "password";
pub const USER_FILTER: &str =
    "(|(objectClass=person)(objectClass=user)(objectClass=inetOrgPerson))";
pub const GROUP_FILTER: &str = "(|(ou=mathematicians)(ou=chemists))";

/// Configuration of the public test server at ldap.forumsys.com.
pub fn public_config() -> DirectoryConfig {
    DirectoryConfig {
        server_host: "ldap.forumsys.com".into(),
        server_port: 389,
        base_dn: BASE_DN.into(),
        bind_dn: ADMIN_DN.into(),
        bind_password: PASSWORD.into(),
        attribute_user_rdn: "uid".into(),
        attribute_user_firstname: "givenName".into(),
        attribute_user_lastname: "sn".into(),
        attribute_user_email: "mail".into(),
        attribute_group_member: "uniqueMember".into(),
        timeout: Some(10),
        ..Default::default()
    }
}

pub fn person(uid: &str, first_name: &str, last_name: &str) -> Entry {
    Entry::new(format!("uid={uid},{BASE_DN}"))
        .with_attribute("uid", [uid])
        .with_attribute("cn", [format!("{first_name} {last_name}")])
        .with_attribute("givenName", [first_name])
        .with_attribute("sn", [last_name])
        .with_attribute("mail", [format!("{uid}@ldap.forumsys.com")])
        .with_attribute(
            "objectClass",
            ["inetOrgPerson", "organizationalPerson", "person", "top"],
        )
}

pub fn group(ou: &str, members: &[&str]) -> Entry {
    let entry = Entry::new(format!("ou={ou},{BASE_DN}"))
        .with_attribute("ou", [ou])
        .with_attribute("objectClass", ["groupOfUniqueNames", "top"]);

    if members.is_empty() {
        entry
    } else {
        entry.with_attribute("uniqueMember", members.iter().copied())
    }
}

/// In-memory copy of the public test directory. Every user's password is
/// `password`.
///
/// `chemists` lists `nobel`, who has no entry, and a member value that is
/// not a DN. `italians` has no member.
pub fn fixture() -> MemoryDirectory {
    let users = [
        ("newton", "Isaac", "Newton"),
        ("einstein", "Albert", "Einstein"),
        ("tesla", "Nikola", "Tesla"),
        ("euler", "Leonhard", "Euler"),
        ("gauss", "Carl Friedrich", "Gauss"),
        ("riemann", "Bernhard", "Riemann"),
        ("curie", "Marie", "Curie"),
        ("boyle", "Robert", "Boyle"),
    ];

    let mut directory = MemoryDirectory::new().with_password(ADMIN_DN, PASSWORD);
    for (uid, first_name, last_name) in users {
        directory = directory
            .with_entry(person(uid, first_name, last_name))
            .with_password(format!("uid={uid},{BASE_DN}"), PASSWORD);
    }

    directory
        .with_entry(group(
            "mathematicians",
            &[
                "uid=euler,dc=example,dc=com",
                "uid=gauss,dc=example,dc=com",
                "uid=riemann,dc=example,dc=com",
            ],
        ))
        .with_entry(group(
            "chemists",
            &[
                "uid=curie,dc=example,dc=com",
                "uid=boyle,dc=example,dc=com",
                "uid=nobel,dc=example,dc=com",
                "not-a-dn",
            ],
        ))
        .with_entry(group("italians", &[]))
}
