// Domain Model
// One stored identity: (label, tld, sub) plus the last-touched time

use crate::utils::domain_name::full_hostname;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Domain identity row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DomainRecord {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<i64>,
    pub label: String,
    pub tld: String,
    pub sub: String,
    /// Unix time of the last resolution attempt, absent until the first one
    pub updated: Option<i64>,
}

impl DomainRecord {
    /// Assemble the hostname this row stands for
    pub fn full_name(&self) -> String {
        full_hostname(&self.label, &self.tld, &self.sub)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_name() {
        let mut domain = DomainRecord {
            id: None,
            label: "example".to_string(),
            tld: "co.uk".to_string(),
            sub: String::new(),
            updated: None,
        };
        assert_eq!(domain.full_name(), "example.co.uk");

        domain.sub = "mail.eu".to_string();
        assert_eq!(domain.full_name(), "mail.eu.example.co.uk");
    }
}
