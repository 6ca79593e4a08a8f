use crate::dns::{Query, Record, RecordType};
use crate::dns_error::LookupError;
use crate::third_ext::arpa_to_ip;

use super::alias::resolve_aliases;
use super::ipam::{self, Family};
use super::plugin::{self, QuerySpec};
use super::{BackendRecord, BackendZone, NetboxApi, RecordKind};

/// A raw backend fact, not yet converted into a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BackendAnswer {
    Record(BackendRecord),
    Zone(BackendZone),
}

impl BackendAnswer {
    #[inline]
    pub fn to_record(&self) -> Option<Record> {
        match self {
            Self::Record(record) => record.to_record(),
            Self::Zone(zone) => zone.to_record(),
        }
    }
}

/// Answers one question for one authoritative zone.
///
/// `zone` is the matched zone as a lower-case FQDN.
#[async_trait::async_trait]
pub trait RecordSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn lookup(&self, zone: &str, query: &Query) -> Result<Vec<BackendAnswer>, LookupError>;
}

/// Hostname/address lookups against the IPAM API.
///
/// Zones only decide whether a question is ours; they never reach the backend.
#[derive(Debug, Clone)]
pub struct LegacySource {
    api: NetboxApi,
    ttl: u32,
}

impl LegacySource {
    /// `ttl` fills in for records that carry none, i.e. all of them.
    pub fn new(api: NetboxApi, ttl: u32) -> Self {
        Self { api, ttl }
    }
}

#[async_trait::async_trait]
impl RecordSource for LegacySource {
    fn name(&self) -> &'static str {
        "ipam"
    }

    async fn lookup(&self, _zone: &str, query: &Query) -> Result<Vec<BackendAnswer>, LookupError> {
        let qname = query.name().to_lowercase().to_ascii();
        let hostname = qname.trim_end_matches('.');

        let records = match query.query_type() {
            RecordType::A => ipam::lookup_addresses(&self.api, hostname, Family::V4)
                .await?
                .into_iter()
                .map(|ip| BackendRecord::new(RecordKind::A, qname.as_str(), ip.to_string()))
                .collect::<Vec<_>>(),
            RecordType::AAAA => ipam::lookup_addresses(&self.api, hostname, Family::V6)
                .await?
                .into_iter()
                .map(|ip| BackendRecord::new(RecordKind::AAAA, qname.as_str(), ip.to_string()))
                .collect(),
            RecordType::PTR => {
                let ip = arpa_to_ip(&qname).ok_or_else(|| LookupError::InvalidReverseName(qname.clone()))?;
                ipam::lookup_hostnames(&self.api, ip)
                    .await?
                    .into_iter()
                    .map(|host| BackendRecord::new(RecordKind::PTR, qname.as_str(), host))
                    .collect()
            }
            other => return Err(LookupError::NotImplemented(other)),
        };

        Ok(records
            .into_iter()
            .map(|record| BackendAnswer::Record(record.with_default_ttl(self.ttl)))
            .collect())
    }
}

/// Record and zone lookups against the netbox-dns plugin.
#[derive(Debug, Clone)]
pub struct PluginSource {
    api: NetboxApi,
}

impl PluginSource {
    pub fn new(api: NetboxApi) -> Self {
        Self { api }
    }
}

#[async_trait::async_trait]
impl RecordSource for PluginSource {
    fn name(&self) -> &'static str {
        "netbox-dns"
    }

    async fn lookup(&self, zone: &str, query: &Query) -> Result<Vec<BackendAnswer>, LookupError> {
        let query_type = query.query_type();

        if query_type == RecordType::SOA {
            let zones = plugin::lookup_zone(&self.api, zone).await?;
            return Ok(zones.into_iter().map(BackendAnswer::Zone).collect());
        }

        let spec = QuerySpec::for_query_type(query_type)
            .ok_or(LookupError::NotImplemented(query_type))?;

        let qname = query.name().to_lowercase().to_ascii();
        let mut records = plugin::lookup_records(&self.api, zone, &qname, spec).await?;

        if matches!(query_type, RecordType::A | RecordType::AAAA) {
            records = resolve_aliases(&self.api, zone, records, spec).await;
        }

        Ok(records.into_iter().map(BackendAnswer::Record).collect())
    }
}
