// Domain Name Handling

//! Every name that enters the index goes through the same three steps:
//! cleaning (trim, lowercase, drop the root dot and a leading `*.`),
//! validation (RFC 1035 lengths, `[a-z0-9-_]` labels) and a public-suffix
//! aware split into `sub`, `label` and `tld`.

use crate::error::ColumbusError;
use std::fmt;
use std::net::IpAddr;

/// Maximum hostname length (RFC 1035)
pub const MAX_HOSTNAME_LENGTH: usize = 253;

/// Maximum DNS label length (RFC 1035)
pub const MAX_LABEL_LENGTH: usize = 63;

/// A validated hostname split at its public suffix.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DomainName {
    /// Remaining left-hand labels, empty when the name is registrable
    pub sub: String,
    /// Second-level label
    pub label: String,
    /// Public suffix, may contain dots (`co.uk`)
    pub tld: String,
}

impl DomainName {
    /// Clean, validate and split a raw name.
    pub fn parse(raw: &str) -> crate::Result<Self> {
        let name = clean(raw);

        if !is_valid_hostname(&name) {
            return Err(ColumbusError::InvalidDomain {
                name: raw.trim().to_string(),
            });
        }

        let Some(registrable) = psl::domain_str(&name) else {
            if psl::suffix_str(&name) == Some(name.as_str()) {
                return Err(ColumbusError::TldOnly { name });
            }
            return Err(ColumbusError::PartsFailed { name });
        };

        let tld = psl::suffix_str(registrable)
            .ok_or_else(|| ColumbusError::PartsFailed { name: name.clone() })?;

        let label = registrable
            .strip_suffix(tld)
            .and_then(|rest| rest.strip_suffix('.'))
            .filter(|label| !label.is_empty())
            .ok_or_else(|| ColumbusError::PartsFailed { name: name.clone() })?;

        let sub = match name.strip_suffix(registrable) {
            Some("") => "",
            Some(rest) => rest
                .strip_suffix('.')
                .ok_or_else(|| ColumbusError::PartsFailed { name: name.clone() })?,
            None => return Err(ColumbusError::PartsFailed { name }),
        };

        Ok(Self {
            sub: sub.to_string(),
            label: label.to_string(),
            tld: tld.to_string(),
        })
    }

    /// Build from stored parts without validation.
    pub fn from_parts(label: &str, tld: &str, sub: &str) -> Self {
        Self {
            sub: sub.to_string(),
            label: label.to_string(),
            tld: tld.to_string(),
        }
    }

    /// `label.tld`
    pub fn registrable(&self) -> String {
        format!("{}.{}", self.label, self.tld)
    }

    /// `sub.label.tld`, or `label.tld` when there is no sub
    pub fn full(&self) -> String {
        full_hostname(&self.label, &self.tld, &self.sub)
    }
}

impl fmt::Display for DomainName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.full())
    }
}

/// Assemble a hostname from its stored parts.
pub fn full_hostname(label: &str, tld: &str, sub: &str) -> String {
    if sub.is_empty() {
        format!("{}.{}", label, tld)
    } else {
        format!("{}.{}.{}", sub, label, tld)
    }
}

/// Normalize a raw name: trim, lowercase, strip the root dot and a leading
/// wildcard label.
pub fn clean(raw: &str) -> String {
    let mut name = raw.trim().to_ascii_lowercase();

    if name.ends_with('.') {
        name.pop();
    }

    match name.strip_prefix("*.") {
        Some(rest) => rest.to_string(),
        None => name,
    }
}

/// Check a cleaned hostname: at least two labels, each valid, total length
/// within limits, and not an IP literal.
pub fn is_valid_hostname(name: &str) -> bool {
    if name.is_empty() || name.len() > MAX_HOSTNAME_LENGTH {
        return false;
    }

    if name.parse::<IpAddr>().is_ok() {
        return false;
    }

    let mut labels = 0;
    for label in name.split('.') {
        if !is_valid_label(label) {
            return false;
        }
        labels += 1;
    }

    labels >= 2
}

/// Check a single DNS label.
pub fn is_valid_label(label: &str) -> bool {
    if label.is_empty() || label.len() > MAX_LABEL_LENGTH {
        return false;
    }

    if label.starts_with('-') || label.ends_with('-') {
        return false;
    }

    label
        .bytes()
        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_')
}

/// Clean and validate a single label used as a query key.
pub fn parse_label(raw: &str) -> crate::Result<String> {
    let label = raw.trim().to_ascii_lowercase();
    if is_valid_label(&label) {
        Ok(label)
    } else {
        Err(ColumbusError::InvalidDomain {
            name: raw.trim().to_string(),
        })
    }
}
