use std::sync::Arc;

use crate::dns::*;
use crate::log::{debug, error};
use crate::middleware::*;
use crate::netbox::source::BackendAnswer;
use crate::netbox::RecordSource;
use crate::zones::{Fallthrough, Zones};

/// Answers questions for the configured zones from NetBox.
///
/// Questions outside the zones go to the next stage untouched. Inside them a
/// lookup error becomes SERVFAIL and an empty result NXDOMAIN, both
/// authoritative, unless fallthrough covers the name, in which case the next
/// stage gets the question instead.
pub struct NetboxMiddleware {
    zones: Zones,
    fallthrough: Fallthrough,
    source: Arc<dyn RecordSource>,
}

impl NetboxMiddleware {
    pub fn new(zones: Zones, fallthrough: Fallthrough, source: Arc<dyn RecordSource>) -> Self {
        Self {
            zones,
            fallthrough,
            source,
        }
    }
}

#[async_trait::async_trait]
impl Middleware<DnsContext, DnsRequest, DnsResponse, DnsError> for NetboxMiddleware {
    fn name(&self) -> &'static str {
        "netbox"
    }

    async fn handle(
        &self,
        ctx: &mut DnsContext,
        req: &DnsRequest,
        next: Next<'_, DnsContext, DnsRequest, DnsResponse, DnsError>,
    ) -> Result<DnsResponse, DnsError> {
        let query = req.query();
        let name = query.name();

        let zone = match self.zones.matches(name) {
            Some(zone) => zone.clone(),
            None => {
                ctx.lookup_source = LookupSource::Delegated;
                return next.run(ctx, req).await;
            }
        };

        let answers = self
            .source
            .lookup(&zone.to_ascii(), query)
            .await
            .map(|answers| {
                answers
                    .iter()
                    .filter_map(BackendAnswer::to_record)
                    .collect::<Vec<_>>()
            });

        match answers {
            Err(err) => {
                if self.fallthrough.through(name) {
                    debug!("{} {}: {}, falling through", name, query.query_type(), err);
                    ctx.lookup_source = LookupSource::Delegated;
                    return next.run(ctx, req).await;
                }

                error!(
                    "{} {} via {} at {}: {}",
                    name,
                    query.query_type(),
                    self.source.name(),
                    ctx.cfg().url().map(|u| u.as_str()).unwrap_or("-"),
                    err
                );
                ctx.lookup_source = LookupSource::Zone(zone);
                ctx.set_error(err);
                Ok(DnsResponse::authoritative_error(req, ResponseCode::ServFail))
            }
            Ok(records) if records.is_empty() => {
                if self.fallthrough.through(name) {
                    ctx.lookup_source = LookupSource::Delegated;
                    return next.run(ctx, req).await;
                }

                ctx.lookup_source = LookupSource::Zone(zone);
                Ok(DnsResponse::authoritative_error(req, ResponseCode::NXDomain))
            }
            Ok(records) => {
                ctx.lookup_source = LookupSource::Zone(zone);
                Ok(DnsResponse::answer(req, records))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::net::Ipv4Addr;

    use reqwest::StatusCode;

    use super::*;
    use crate::dns_conf::RuntimeConfig;
    use crate::dns_error::LookupError;
    use crate::dns_mw::*;
    use crate::libdns::proto::rr::rdata::A;
    use crate::netbox::mock::MockTransport;
    use crate::netbox::{LegacySource, NetboxApi, PluginSource};
    use crate::zones::normalize_zone;

    const RECORDS: &str = "/api/plugins/netbox-dns/records/";
    const IP_ADDRESSES: &str = "/api/ipam/ip-addresses/";

    fn api(mock: MockTransport) -> NetboxApi {
        NetboxApi::new("https://example.org".parse().unwrap(), "s3kr3tt0ken", Arc::new(mock))
    }

    fn names(list: &[&str]) -> Vec<Name> {
        list.iter().map(|z| normalize_zone(z).unwrap()).collect()
    }

    fn plugin(mock: MockTransport, zones: &[&str], fall: Fallthrough) -> NetboxMiddleware {
        NetboxMiddleware::new(
            Zones::new(names(zones)),
            fall,
            Arc::new(PluginSource::new(api(mock))),
        )
    }

    fn legacy(mock: MockTransport, fall: Fallthrough) -> NetboxMiddleware {
        NetboxMiddleware::new(
            Zones::default(),
            fall,
            Arc::new(LegacySource::new(api(mock), 3600)),
        )
    }

    fn next_answer() -> Record {
        Record::from_rdata(
            Name::from_ascii("from.next.").unwrap(),
            60,
            RData::A(A(Ipv4Addr::new(127, 0, 0, 1))),
        )
    }

    fn lines(res: &DnsResponse) -> Vec<String> {
        res.answers().iter().map(|r| r.to_zone_line()).collect()
    }

    #[tokio::test]
    async fn test_answer_is_authoritative() {
        let mock = MockTransport::new().ok(
            RECORDS,
            &[
                ("zone", "example.org"),
                ("fqdn", "mail1.example.org."),
                ("active", "true"),
                ("type", "MX"),
            ],
            r#"{"results": [
                {"type": "MX", "ttl": 300, "value": "10 mx1", "absolute_value": "10 mx1.example.org.", "fqdn": "mail1.example.org."},
                {"type": "MX", "ttl": 300, "value": "bogus", "absolute_value": "bogus", "fqdn": "mail1.example.org."},
                {"type": "MX", "ttl": 300, "value": "20 mx2", "absolute_value": "20 mx2.example.org.", "fqdn": "mail1.example.org."}
            ]}"#,
        );
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("mail1.example.org.", RecordType::MX).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NoError);
        assert!(res.is_authoritative());
        assert_eq!(
            lines(&res),
            vec![
                "mail1.example.org.\t300\tIN\tMX\t10 mx1.example.org.",
                "mail1.example.org.\t300\tIN\tMX\t20 mx2.example.org.",
            ]
        );
    }

    #[tokio::test]
    async fn test_cname_then_address() {
        let mock = MockTransport::new()
            .ok(
                RECORDS,
                &[
                    ("zone", "example.org"),
                    ("fqdn", "www.example.org."),
                    ("active", "true"),
                    ("type", "A"),
                    ("type", "CNAME"),
                ],
                r#"{"results": [{"type": "CNAME", "ttl": 300, "value": "web",
                    "absolute_value": "web.example.org.", "fqdn": "www.example.org."}]}"#,
            )
            .ok(
                RECORDS,
                &[
                    ("zone", "example.org"),
                    ("fqdn", "web.example.org."),
                    ("active", "true"),
                    ("type", "A"),
                    ("type", "CNAME"),
                ],
                r#"{"results": [{"type": "A", "ttl": 60, "value": "10.0.0.1",
                    "absolute_value": "10.0.0.1", "fqdn": "web.example.org."}]}"#,
            );
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, _) = handler.lookup("www.example.org.", RecordType::A).await;

        assert_eq!(
            lines(&res),
            vec![
                "www.example.org.\t300\tIN\tCNAME\tweb.example.org.",
                "web.example.org.\t60\tIN\tA\t10.0.0.1",
            ]
        );
    }

    #[tokio::test]
    async fn test_cname_with_failed_target() {
        let mock = MockTransport::new()
            .ok(
                RECORDS,
                &[
                    ("zone", "example.org"),
                    ("fqdn", "www.example.org."),
                    ("active", "true"),
                    ("type", "AAAA"),
                    ("type", "CNAME"),
                ],
                r#"{"results": [{"type": "CNAME", "ttl": 300, "value": "web",
                    "absolute_value": "web.example.org.", "fqdn": "www.example.org."}]}"#,
            )
            .reply(
                RECORDS,
                &[
                    ("zone", "example.org"),
                    ("fqdn", "web.example.org."),
                    ("active", "true"),
                    ("type", "AAAA"),
                    ("type", "CNAME"),
                ],
                StatusCode::BAD_GATEWAY,
                "",
            );
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("www.example.org.", RecordType::AAAA).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NoError);
        assert_eq!(
            lines(&res),
            vec!["www.example.org.\t300\tIN\tCNAME\tweb.example.org."]
        );
    }

    #[tokio::test]
    async fn test_empty_without_fallthrough_is_nxdomain() {
        let mock = MockTransport::new().ok(RECORDS, &[], r#"{"results": []}"#);
        let next = NextStage::answering(vec![next_answer()]);
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .with_next(next)
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("nothing.example.org.", RecordType::TXT).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NXDomain);
        assert!(res.is_authoritative());
        assert!(res.answers().is_empty());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_empty_with_fallthrough_delegates() {
        let mock = MockTransport::new().ok(RECORDS, &[], r#"{"results": []}"#);
        let next = NextStage::answering(vec![next_answer()]);
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::all()))
            .with_next(next)
            .build(RuntimeConfig::default());

        let (res, _) = handler.lookup("nothing.example.org.", RecordType::TXT).await;

        assert_eq!(lines(&res), vec!["from.next.\t60\tIN\tA\t127.0.0.1"]);
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_error_without_fallthrough_is_servfail() {
        let mock = MockTransport::new().reply(RECORDS, &[], StatusCode::FORBIDDEN, "");
        let next = NextStage::default();
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .with_next(next)
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("www.example.org.", RecordType::A).await;

        assert_eq!(res.response_code(), ResponseCode::ServFail);
        assert!(res.is_authoritative());
        assert!(matches!(
            err,
            Some(DnsError::Lookup(LookupError::Status(StatusCode::FORBIDDEN)))
        ));
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_error_with_fallthrough_delegates() {
        let mock = MockTransport::new().fail(
            RECORDS,
            &[],
            LookupError::Status(StatusCode::SERVICE_UNAVAILABLE),
        );
        let next = NextStage::answering(vec![next_answer()]);
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(
            mock,
            &["example.org"],
            Fallthrough::new(names(&["example.org"])),
        ))
        .with_next(next)
        .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("www.example.org.", RecordType::A).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NoError);
        assert!(!lines(&res).is_empty());
        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_fallthrough_for_other_zone_only() {
        let mock = MockTransport::new().ok(RECORDS, &[], r#"{"results": []}"#);
        let next = NextStage::default();
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(
            mock,
            &["example.org", "example.net"],
            Fallthrough::new(names(&["example.net"])),
        ))
        .with_next(next)
        .build(RuntimeConfig::default());

        let (res, _) = handler.lookup("www.example.org.", RecordType::A).await;

        assert_eq!(res.response_code(), ResponseCode::NXDomain);
        assert!(res.is_authoritative());
        assert!(seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_outside_zones_delegates_without_lookup() {
        let next = NextStage::answering(vec![next_answer()]);
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(
            MockTransport::new(),
            &["example.org"],
            Fallthrough::default(),
        ))
        .with_next(next)
        .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("www.example.com.", RecordType::A).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NoError);
        assert!(!res.is_authoritative());
        assert_eq!(lines(&res), vec!["from.next.\t60\tIN\tA\t127.0.0.1"]);
        assert_eq!(
            seen.lock().unwrap()[0].name().to_ascii(),
            "www.example.com."
        );
    }

    #[tokio::test]
    async fn test_delegation_without_next_stage() {
        let handler = DnsMockMiddleware::mock(plugin(
            MockTransport::new(),
            &["example.org"],
            Fallthrough::default(),
        ))
        .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("www.example.com.", RecordType::A).await;

        assert_eq!(res.response_code(), ResponseCode::ServFail);
        assert!(matches!(err, Some(DnsError::NoNextHandler)));
    }

    #[tokio::test]
    async fn test_not_implemented_is_lookup_error() {
        let handler = DnsMockMiddleware::mock(legacy(MockTransport::new(), Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("my_host.", RecordType::MX).await;

        assert_eq!(res.response_code(), ResponseCode::ServFail);
        assert!(res.is_authoritative());
        assert!(matches!(
            err,
            Some(DnsError::Lookup(LookupError::NotImplemented(RecordType::MX)))
        ));
    }

    #[tokio::test]
    async fn test_not_implemented_with_fallthrough_delegates() {
        let next = NextStage::default();
        let seen = next.seen();
        let handler = DnsMockMiddleware::mock(plugin(
            MockTransport::new(),
            &["example.org"],
            Fallthrough::all(),
        ))
        .with_next(next)
        .build(RuntimeConfig::default());

        handler.lookup("example.org.", RecordType::SRV).await;

        assert_eq!(seen.lock().unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_legacy_a_uses_default_ttl() {
        let mock = MockTransport::new().ok(
            IP_ADDRESSES,
            &[("dns_name", "my_host")],
            r#"{"results": [{"family": {"value": 4, "label": "IPv4"},
                "address": "10.0.0.2/25", "dns_name": "my_host"}]}"#,
        );
        let handler = DnsMockMiddleware::mock(legacy(mock, Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, _) = handler.lookup("my_host.", RecordType::A).await;

        assert!(res.is_authoritative());
        assert_eq!(lines(&res), vec!["my_host.\t3600\tIN\tA\t10.0.0.2"]);
    }

    #[tokio::test]
    async fn test_legacy_unknown_host_is_nxdomain() {
        let mock = MockTransport::new().ok(
            IP_ADDRESSES,
            &[("dns_name", "nobody")],
            r#"{"results": []}"#,
        );
        let handler = DnsMockMiddleware::mock(legacy(mock, Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, err) = handler.lookup("nobody.", RecordType::AAAA).await;

        assert!(err.is_none());
        assert_eq!(res.response_code(), ResponseCode::NXDomain);
    }

    #[tokio::test]
    async fn test_response_mirrors_request() {
        let mock = MockTransport::new().ok(RECORDS, &[], r#"{"results": []}"#);
        let handler = DnsMockMiddleware::mock(plugin(mock, &["example.org"], Fallthrough::default()))
            .build(RuntimeConfig::default());

        let (res, _) = handler.lookup("www.example.org.", RecordType::A).await;

        let queries = res.message().queries();
        assert_eq!(queries.len(), 1);
        assert_eq!(queries[0].name().to_ascii(), "www.example.org.");
        assert_eq!(res.message().message_type(), MessageType::Response);
    }
}
