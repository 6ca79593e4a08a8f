use std::net::IpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::dns::{Name, RData, Record, RecordType};
use crate::libdns::proto::rr::rdata::{A, AAAA, CNAME, MX, NS, PTR, SOA, TXT};
use crate::log::warn;
use crate::third_ext::null_as_default;

/// Record types the netbox-dns plugin can hand out.
///
/// Anything else fails to deserialize, so an unsupported record never exists in-process.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[allow(clippy::upper_case_acronyms)]
pub enum RecordKind {
    A,
    AAAA,
    CNAME,
    NS,
    PTR,
    MX,
    TXT,
}

impl RecordKind {
    #[inline]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::A => "A",
            Self::AAAA => "AAAA",
            Self::CNAME => "CNAME",
            Self::NS => "NS",
            Self::PTR => "PTR",
            Self::MX => "MX",
            Self::TXT => "TXT",
        }
    }

    #[inline]
    pub fn is_alias(&self) -> bool {
        matches!(self, Self::CNAME)
    }
}

impl From<RecordKind> for RecordType {
    fn from(kind: RecordKind) -> Self {
        match kind {
            RecordKind::A => RecordType::A,
            RecordKind::AAAA => RecordType::AAAA,
            RecordKind::CNAME => RecordType::CNAME,
            RecordKind::NS => RecordType::NS,
            RecordKind::PTR => RecordType::PTR,
            RecordKind::MX => RecordType::MX,
            RecordKind::TXT => RecordType::TXT,
        }
    }
}

impl std::fmt::Display for RecordKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A record as served by `/api/plugins/netbox-dns/records/`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendRecord {
    #[serde(rename = "type")]
    pub kind: RecordKind,
    /// `0` means unset.
    #[serde(default, deserialize_with = "null_as_default")]
    pub ttl: u32,
    #[serde(default)]
    pub value: String,
    pub absolute_value: String,
    pub fqdn: String,
}

impl BackendRecord {
    pub fn new(kind: RecordKind, fqdn: impl Into<String>, absolute_value: impl Into<String>) -> Self {
        let absolute_value = absolute_value.into();
        Self {
            kind,
            ttl: 0,
            value: absolute_value.clone(),
            absolute_value,
            fqdn: fqdn.into(),
        }
    }

    /// Replaces an unset TTL with `ttl`, leaves an explicit one alone.
    #[inline]
    pub fn with_default_ttl(mut self, ttl: u32) -> Self {
        if self.ttl == 0 {
            self.ttl = ttl;
        }
        self
    }

    /// Builds the resource record, or `None` when the payload does not fit the type.
    pub fn to_record(&self) -> Option<Record> {
        let name = parse_fqdn(&self.fqdn)?;

        let rdata = match self.kind {
            RecordKind::A => match parse_ip(&self.absolute_value)? {
                IpAddr::V4(ip) => RData::A(A(ip)),
                IpAddr::V6(_) => {
                    warn!("A record {} holds an IPv6 address", self.fqdn);
                    return None;
                }
            },
            RecordKind::AAAA => match parse_ip(&self.absolute_value)? {
                IpAddr::V6(ip) => RData::AAAA(AAAA(ip)),
                IpAddr::V4(_) => {
                    warn!("AAAA record {} holds an IPv4 address", self.fqdn);
                    return None;
                }
            },
            RecordKind::CNAME => RData::CNAME(CNAME(parse_fqdn(&self.absolute_value)?)),
            RecordKind::NS => RData::NS(NS(parse_fqdn(&self.absolute_value)?)),
            RecordKind::PTR => RData::PTR(PTR(parse_fqdn(&self.absolute_value)?)),
            RecordKind::MX => {
                let (preference, exchange) = parse_mx(&self.absolute_value)?;
                RData::MX(MX::new(preference, exchange))
            }
            RecordKind::TXT => RData::TXT(TXT::new(vec![self.absolute_value.clone()])),
        };

        Some(Record::from_rdata(name, self.ttl, rdata))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Nameserver {
    pub name: String,
}

/// A zone as served by `/api/plugins/netbox-dns/zones/`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendZone {
    /// Unqualified, e.g. `example.org`.
    pub name: String,
    #[serde(rename = "soa_mname")]
    pub primary_nameserver: Nameserver,
    #[serde(rename = "soa_rname")]
    pub responsible_mailbox: String,
    #[serde(rename = "soa_serial")]
    pub serial: u32,
    #[serde(rename = "soa_refresh")]
    pub refresh: u32,
    #[serde(rename = "soa_retry")]
    pub retry: u32,
    #[serde(rename = "soa_expire")]
    pub expire: u32,
    #[serde(rename = "soa_minimum")]
    pub minimum_ttl: u32,
    #[serde(rename = "soa_ttl")]
    pub ttl: u32,
}

impl BackendZone {
    pub fn to_record(&self) -> Option<Record> {
        let name = parse_fqdn(&self.name)?;
        let mname = parse_fqdn(&self.primary_nameserver.name)?;
        let rname = parse_fqdn(&self.responsible_mailbox)?;

        let interval = |field: &str, value: u32| match i32::try_from(value) {
            Ok(v) => Some(v),
            Err(_) => {
                warn!("SOA {} of zone {} out of range: {}", field, self.name, value);
                None
            }
        };

        let soa = SOA::new(
            mname,
            rname,
            self.serial,
            interval("refresh", self.refresh)?,
            interval("retry", self.retry)?,
            interval("expire", self.expire)?,
            self.minimum_ttl,
        );

        Some(Record::from_rdata(name, self.ttl, RData::SOA(soa)))
    }
}

/// Parses a name and marks it fully qualified.
fn parse_fqdn(s: &str) -> Option<Name> {
    match Name::from_str(s) {
        Ok(mut name) => {
            name.set_fqdn(true);
            Some(name)
        }
        Err(err) => {
            warn!("received invalid domain name {:?} from Netbox: {}", s, err);
            None
        }
    }
}

fn parse_ip(s: &str) -> Option<IpAddr> {
    match IpAddr::from_str(s) {
        Ok(ip) => Some(ip),
        Err(err) => {
            warn!("received invalid IP address {:?} from Netbox: {}", s, err);
            None
        }
    }
}

/// The plugin sends MX data as a single `"<preference> <exchange>"` string.
fn parse_mx(s: &str) -> Option<(u16, Name)> {
    let mut parts = s.split(' ');
    let (Some(preference), Some(exchange), None) = (parts.next(), parts.next(), parts.next())
    else {
        warn!("received malformed MX record {:?} from Netbox", s);
        return None;
    };

    let preference = match preference.parse::<u16>() {
        Ok(v) => v,
        Err(err) => {
            warn!("can not parse preference from Netbox MX record {:?}: {}", s, err);
            return None;
        }
    };

    Some((preference, parse_fqdn(exchange)?))
}
