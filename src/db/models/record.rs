// DNS Record Model
// Latest observation of a (type, value) pair for one domain

use hickory_proto::rr::RecordType;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// Stored DNS record
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct DnsRecord {
    /// Numeric RR type (1 = A, 28 = AAAA, ...)
    pub rtype: i32,
    /// Canonical text form of the record data
    pub value: String,
    /// Unix time this value was last observed
    pub time: i64,
}

impl DnsRecord {
    pub fn record_type(&self) -> RecordType {
        RecordType::from(self.rtype as u16)
    }

    /// Mnemonic of the record type (`A`, `MX`, `DNAME`, ...)
    pub fn type_name(&self) -> String {
        crate::dns::record::type_name(self.record_type())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_type_name() {
        let record = DnsRecord {
            rtype: 15,
            value: "10 mx.example.com".to_string(),
            time: 0,
        };
        assert_eq!(record.record_type(), RecordType::MX);
        assert_eq!(record.type_name(), "MX");

        let dname = DnsRecord {
            rtype: 39,
            value: "example.net".to_string(),
            time: 0,
        };
        assert_eq!(dname.type_name(), "DNAME");
    }
}
