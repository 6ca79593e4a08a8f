use super::{BackendRecord, BackendZone, NetboxApi, RecordKind};
use crate::dns::RecordType;
use crate::dns_error::LookupError;

const RECORDS: &str = "/api/plugins/netbox-dns/records/";
const ZONES: &str = "/api/plugins/netbox-dns/zones/";

/// Record types requested from the plugin for one question type.
///
/// Address questions also ask for aliases, since a CNAME is a valid answer to them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct QuerySpec(&'static [RecordKind]);

impl QuerySpec {
    pub const A: QuerySpec = QuerySpec(&[RecordKind::A, RecordKind::CNAME]);
    pub const AAAA: QuerySpec = QuerySpec(&[RecordKind::AAAA, RecordKind::CNAME]);
    pub const PTR: QuerySpec = QuerySpec(&[RecordKind::PTR]);
    pub const CNAME: QuerySpec = QuerySpec(&[RecordKind::CNAME]);
    pub const NS: QuerySpec = QuerySpec(&[RecordKind::NS]);
    pub const MX: QuerySpec = QuerySpec(&[RecordKind::MX]);
    pub const TXT: QuerySpec = QuerySpec(&[RecordKind::TXT]);

    /// `None` for question types the plugin path does not serve. SOA goes through
    /// [`lookup_zone`] instead.
    pub fn for_query_type(query_type: RecordType) -> Option<QuerySpec> {
        match query_type {
            RecordType::A => Some(Self::A),
            RecordType::AAAA => Some(Self::AAAA),
            RecordType::PTR => Some(Self::PTR),
            RecordType::CNAME => Some(Self::CNAME),
            RecordType::NS => Some(Self::NS),
            RecordType::MX => Some(Self::MX),
            RecordType::TXT => Some(Self::TXT),
            _ => None,
        }
    }

    #[inline]
    pub fn kinds(&self) -> &'static [RecordKind] {
        self.0
    }
}

#[inline]
fn unqualified(zone: &str) -> &str {
    zone.trim_end_matches('.')
}

/// Active records named `fqdn` in `zone` whose type is in `spec`.
pub async fn lookup_records(
    api: &NetboxApi,
    zone: &str,
    fqdn: &str,
    spec: QuerySpec,
) -> Result<Vec<BackendRecord>, LookupError> {
    let mut query = vec![
        ("zone", unqualified(zone)),
        ("fqdn", fqdn),
        ("active", "true"),
    ];
    query.extend(spec.kinds().iter().map(|kind| ("type", kind.as_str())));

    api.list(RECORDS, &query).await
}

/// The active zone called `zone`, which carries the SOA data.
pub async fn lookup_zone(api: &NetboxApi, zone: &str) -> Result<Vec<BackendZone>, LookupError> {
    api.list(ZONES, &[("name", unqualified(zone)), ("active", "true")])
        .await
}
