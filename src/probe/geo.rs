use std::collections::HashMap;
use std::net::IpAddr;

use lazy_static::lazy_static;

lazy_static! {
    static ref COUNTRIES: HashMap<String, String> =
        serde_json::from_str(include_str!("../../data/countries.json"))
            .expect("countries.json must be valid JSON");
}

/// Name to query in the Team Cymru IP-to-ASN zone, whose TXT answers carry
/// the country the address block was registered in by its RIR.
pub fn cymru_query_name(ip: IpAddr) -> String {
    match ip {
        IpAddr::V4(v4) => {
            let octets: Vec<String> = v4.octets().iter().rev().map(u8::to_string).collect();
            format!("{}.origin.asn.cymru.com", octets.join("."))
        }
        IpAddr::V6(v6) => {
            let nibbles: Vec<String> = v6
                .octets()
                .iter()
                .flat_map(|byte| [byte >> 4, byte & 0x0f])
                .rev()
                .map(|nibble| format!("{:x}", nibble))
                .collect();
            format!("{}.origin6.asn.cymru.com", nibbles.join("."))
        }
    }
}

/// Country code from an answer shaped like
/// `13335 | 104.16.0.0/12 | US | arin | 2014-03-28`.
pub fn parse_cymru_txt(txt: &str) -> Option<String> {
    let code = txt.split('|').nth(2)?.trim();
    if code.len() == 2 && code.chars().all(|c| c.is_ascii_alphabetic()) {
        Some(code.to_ascii_uppercase())
    } else {
        None
    }
}

pub fn country_name(code: &str) -> String {
    COUNTRIES
        .get(&code.to_ascii_uppercase())
        .cloned()
        .unwrap_or_else(|| code.to_string())
}
