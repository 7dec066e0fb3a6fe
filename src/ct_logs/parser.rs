// CT Log Entry Parser
//
// Parses CT log entries (Merkle Tree Leaf format) and extracts the DNS
// names a certificate or pre-certificate covers

use super::Result;
use super::client::CtLogEntryResponse;
use crate::error::ColumbusError;
use crate::utils::domain_name;
use base64::Engine;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use x509_parser::prelude::*;

/// Version byte, leaf type byte, 8-byte timestamp, 2-byte entry type
const LEAF_HEADER_LEN: usize = 12;

/// SHA-256 of the issuer key, prefixed to pre-certificate entries
const ISSUER_KEY_HASH_LEN: usize = 32;

/// Certificate type in CT log
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CertType {
    /// Precertificate (TBSCertificate without the poison extension)
    PreCertificate,
    /// X.509 certificate
    X509Certificate,
}

/// Parsed CT log entry
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CtLogEntry {
    /// Entry index in log
    pub index: u64,
    /// Timestamp from Merkle Tree Leaf
    pub timestamp: DateTime<Utc>,
    /// Certificate type
    pub cert_type: CertType,
    /// Cleaned, validated and deduplicated DNS names
    pub names: Vec<String>,
}

fn parse_error(message: String) -> ColumbusError {
    ColumbusError::ParseError { message }
}

/// Read a 24-bit big-endian length followed by that many bytes
fn read_u24_prefixed(bytes: &[u8], offset: usize) -> Result<&[u8]> {
    let header = bytes
        .get(offset..offset + 3)
        .ok_or_else(|| parse_error("Leaf too short for certificate length".to_string()))?;
    let len = u32::from_be_bytes([0, header[0], header[1], header[2]]) as usize;

    let start = offset + 3;
    bytes.get(start..start + len).ok_or_else(|| {
        parse_error(format!(
            "Certificate length {} exceeds leaf size {}",
            len,
            bytes.len()
        ))
    })
}

/// Parse a CT log entry response
pub fn parse_entry(entry: &CtLogEntryResponse, index: u64) -> Result<CtLogEntry> {
    let leaf_bytes = base64::engine::general_purpose::STANDARD
        .decode(&entry.leaf_input)
        .map_err(|e| parse_error(format!("Failed to decode leaf_input: {}", e)))?;

    if leaf_bytes.len() < LEAF_HEADER_LEN {
        return Err(parse_error(format!(
            "Leaf input too short: {} bytes",
            leaf_bytes.len()
        )));
    }

    // Byte 0: Version (0 = v1)
    let version = leaf_bytes[0];
    if version != 0 {
        return Err(parse_error(format!("Unsupported CT version: {}", version)));
    }

    // Byte 1: MerkleLeafType (0 = timestamped_entry)
    let leaf_type = leaf_bytes[1];
    if leaf_type != 0 {
        return Err(parse_error(format!("Unsupported leaf type: {}", leaf_type)));
    }

    // Bytes 2-9: milliseconds since epoch
    let mut ts = [0u8; 8];
    ts.copy_from_slice(&leaf_bytes[2..10]);
    let timestamp_ms = u64::from_be_bytes(ts);
    let timestamp = DateTime::<Utc>::from_timestamp(
        (timestamp_ms / 1000) as i64,
        ((timestamp_ms % 1000) * 1_000_000) as u32,
    )
    .unwrap_or_else(Utc::now);

    // Bytes 10-11: LogEntryType
    let entry_type = u16::from_be_bytes([leaf_bytes[10], leaf_bytes[11]]);
    let (cert_type, names) = match entry_type {
        0 => {
            let der = read_u24_prefixed(&leaf_bytes, LEAF_HEADER_LEN)?;
            let (_, cert) = X509Certificate::from_der(der).map_err(|e| {
                parse_error(format!("Failed to parse X.509 certificate: {}", e))
            })?;
            (CertType::X509Certificate, extract_names(&cert.tbs_certificate))
        }
        1 => {
            let der = read_u24_prefixed(&leaf_bytes, LEAF_HEADER_LEN + ISSUER_KEY_HASH_LEN)?;
            let (_, tbs) = TbsCertificate::from_der(der).map_err(|e| {
                parse_error(format!("Failed to parse pre-certificate: {}", e))
            })?;
            (CertType::PreCertificate, extract_names(&tbs))
        }
        other => return Err(parse_error(format!("Unknown entry type: {}", other))),
    };

    Ok(CtLogEntry {
        index,
        timestamp,
        cert_type,
        names,
    })
}

/// Subject CN, SAN DNS names and permitted DNS name constraints, cleaned,
/// validated and deduplicated in first-seen order
pub fn extract_names(tbs: &TbsCertificate<'_>) -> Vec<String> {
    let mut candidates: Vec<String> = Vec::new();

    for cn in tbs.subject().iter_common_name() {
        if let Ok(cn) = cn.as_str() {
            candidates.push(cn.to_string());
        }
    }

    if let Ok(Some(san_ext)) = tbs.subject_alternative_name() {
        for name in &san_ext.value.general_names {
            if let GeneralName::DNSName(dns) = name {
                candidates.push(dns.to_string());
            }
        }
    }

    if let Ok(Some(nc_ext)) = tbs.name_constraints()
        && let Some(permitted) = &nc_ext.value.permitted_subtrees
    {
        for subtree in permitted {
            if let GeneralName::DNSName(dns) = &subtree.base {
                // Constraints may be written as ".example.com"
                candidates.push(dns.trim_start_matches('.').to_string());
            }
        }
    }

    let mut names: Vec<String> = Vec::new();
    for candidate in candidates {
        let name = domain_name::clean(&candidate);
        if domain_name::is_valid_hostname(&name) && !names.contains(&name) {
            names.push(name);
        }
    }
    names
}
