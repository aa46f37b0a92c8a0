//! Search filter construction.

use ldap3::ldap_escape;

/// Build an `(attribute=value)` filter, escaping `value`.
pub fn equality(attribute: &str, value: &str) -> String {
    format!("({attribute}={})", ldap_escape(value))
}

/// AND `filter` with `other`. An empty `filter` yields `other` alone.
pub fn and(filter: &str, other: &str) -> String {
    if filter.is_empty() {
        other.to_owned()
    } else {
        format!("(&{filter}{other})")
    }
}

/// Split the leading RDN of `dn` into attribute and value.
///
/// The RDN is the text before the first comma.
pub fn leading_rdn(dn: &str) -> Option<(&str, &str)> {
    let rdn = dn.split(',').next()?.trim();
    let (attribute, value) = rdn.split_once('=')?;
    let (attribute, value) = (attribute.trim(), value.trim());

    if attribute.is_empty() || value.is_empty() {
        None
    } else {
        Some((attribute, value))
    }
}

/// Filter selecting the entry named by the leading RDN of `dn`.
///
/// `uid=newton,dc=example,dc=com` gives `(uid=newton)`.
pub fn rdn_filter(dn: &str) -> Option<String> {
    leading_rdn(dn).map(|(attribute, value)| equality(attribute, value))
}
