// DNS Record Types
//
// The record types columbus tracks and their canonical text forms

use hickory_proto::rr::{Name, RData, RecordType};
use hickory_proto::serialize::binary::BinDecodable;

/// DNAME (RFC 6672) has no dedicated variant in the record type enum
pub const DNAME: RecordType = RecordType::Unknown(39);

/// Types resolved for every name, in resolution order
pub const SUPPORTED_TYPES: [RecordType; 10] = [
    RecordType::A,
    RecordType::AAAA,
    RecordType::CAA,
    RecordType::CNAME,
    DNAME,
    RecordType::MX,
    RecordType::NS,
    RecordType::SOA,
    RecordType::SRV,
    RecordType::TXT,
];

/// True for the types worth learning a name from
pub fn is_supported(record_type: RecordType) -> bool {
    SUPPORTED_TYPES.contains(&record_type)
}

/// Mnemonic of a record type
pub fn type_name(record_type: RecordType) -> String {
    if record_type == DNAME {
        "DNAME".to_string()
    } else {
        record_type.to_string()
    }
}

/// Lowercased name without the root dot
pub fn canonical_name(name: &Name) -> String {
    name.to_ascii().trim_end_matches('.').to_ascii_lowercase()
}

/// Canonical text form of record data, `None` for unsupported or empty data
pub fn canonical_value(rdata: &RData) -> Option<String> {
    let value = match rdata {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => aaaa.0.to_string(),
        RData::CNAME(cname) => canonical_name(&cname.0),
        RData::NS(ns) => canonical_name(&ns.0),
        RData::MX(mx) => format!("{} {}", mx.preference(), canonical_name(mx.exchange())),
        RData::SRV(srv) => format!(
            "{} {} {} {}",
            srv.priority(),
            srv.weight(),
            srv.port(),
            canonical_name(srv.target())
        ),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            canonical_name(soa.mname()),
            canonical_name(soa.rname()),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|part| String::from_utf8_lossy(part))
            .collect::<String>(),
        RData::CAA(caa) => caa.to_string().trim().to_string(),
        RData::Unknown { rdata, .. } => {
            // DNAME target is an uncompressed domain name
            let target = Name::from_bytes(rdata.anything()).ok()?;
            canonical_name(&target)
        }
        _ => return None,
    };

    if value.is_empty() { None } else { Some(value) }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hickory_proto::rr::rdata::{A, CNAME, MX, NULL, SRV, TXT};
    use hickory_proto::serialize::binary::BinEncodable;
    use std::net::Ipv4Addr;
    use std::str::FromStr;

    #[test]
    fn test_canonical_a() {
        let rdata = RData::A(A(Ipv4Addr::new(192, 0, 2, 1)));
        assert_eq!(canonical_value(&rdata).unwrap(), "192.0.2.1");
    }

    #[test]
    fn test_canonical_names_are_lowercase_without_root() {
        let rdata = RData::CNAME(CNAME(Name::from_str("Target.Example.COM.").unwrap()));
        assert_eq!(canonical_value(&rdata).unwrap(), "target.example.com");
    }

    #[test]
    fn test_canonical_mx_and_srv() {
        let mx = RData::MX(MX::new(10, Name::from_str("mx.example.com.").unwrap()));
        assert_eq!(canonical_value(&mx).unwrap(), "10 mx.example.com");

        let srv = RData::SRV(SRV::new(
            1,
            5,
            5060,
            Name::from_str("sip.example.com.").unwrap(),
        ));
        assert_eq!(canonical_value(&srv).unwrap(), "1 5 5060 sip.example.com");
    }

    #[test]
    fn test_canonical_txt_concatenates() {
        let txt = RData::TXT(TXT::new(vec!["v=spf1 ".to_string(), "-all".to_string()]));
        assert_eq!(canonical_value(&txt).unwrap(), "v=spf1 -all");

        let empty = RData::TXT(TXT::new(vec![]));
        assert!(canonical_value(&empty).is_none());
    }

    #[test]
    fn test_canonical_dname() {
        let target = Name::from_str("example.net.").unwrap();
        let bytes = target.to_bytes().unwrap();
        let rdata = RData::Unknown {
            code: DNAME,
            rdata: NULL::with(bytes),
        };
        assert_eq!(canonical_value(&rdata).unwrap(), "example.net");
    }

    #[test]
    fn test_type_names() {
        assert_eq!(type_name(RecordType::AAAA), "AAAA");
        assert_eq!(type_name(DNAME), "DNAME");
        assert!(is_supported(DNAME));
        assert!(!is_supported(RecordType::PTR));
    }
}
