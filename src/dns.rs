use std::fmt::Debug;
use std::sync::Arc;

use crate::dns_conf::RuntimeConfig;

pub use crate::dns_error::{DnsError, LookupError};
pub use crate::libdns::proto::{
    op::{self, Edns, Message, MessageType, OpCode, Query, ResponseCode},
    rr::{self, DNSClass, Name, RData, Record, RecordType},
};

#[derive(Debug)]
pub struct DnsContext {
    cfg: Arc<RuntimeConfig>,
    pub lookup_source: LookupSource,
    /// Error behind a response that was written directly, kept for the caller.
    error: Option<DnsError>,
}

impl DnsContext {
    pub fn new(cfg: Arc<RuntimeConfig>) -> Self {
        Self {
            cfg,
            lookup_source: Default::default(),
            error: None,
        }
    }

    #[inline]
    pub fn cfg(&self) -> &Arc<RuntimeConfig> {
        &self.cfg
    }

    #[inline]
    pub fn set_error(&mut self, err: impl Into<DnsError>) {
        self.error = Some(err.into());
    }

    #[inline]
    pub fn take_error(&mut self) -> Option<DnsError> {
        self.error.take()
    }
}

#[derive(Clone, Default, PartialEq, Eq)]
pub enum LookupSource {
    #[default]
    None,
    /// Answered from the named authoritative zone.
    Zone(Name),
    /// Handed on to the next stage.
    Delegated,
}

impl Debug for LookupSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::None => write!(f, "None"),
            Self::Zone(zone) => write!(f, "Zone: {}", zone),
            Self::Delegated => write!(f, "Delegated"),
        }
    }
}

/// An inbound DNS message with exactly one question.
#[derive(Debug, Clone)]
pub struct DnsRequest {
    message: Message,
    query: Query,
}

impl DnsRequest {
    pub fn new(message: Message) -> Result<Self, DnsError> {
        let query = message
            .queries()
            .first()
            .cloned()
            .ok_or(DnsError::NoQuestion)?;
        Ok(Self { message, query })
    }

    pub fn from_query(query: Query) -> Self {
        let mut message = Message::new();
        message
            .set_id(0)
            .set_message_type(MessageType::Query)
            .set_op_code(OpCode::Query)
            .set_recursion_desired(true)
            .add_query(query.clone());
        Self { message, query }
    }

    #[inline]
    pub fn query(&self) -> &Query {
        &self.query
    }

    #[inline]
    pub fn message(&self) -> &Message {
        &self.message
    }
}

/// The reply written back for one request.
#[derive(Debug, Clone)]
pub struct DnsResponse(Message);

impl DnsResponse {
    /// Authoritative answer carrying `answers` in the given order.
    pub fn answer(req: &DnsRequest, answers: Vec<Record>) -> Self {
        let mut message = reply_to(req.message(), ResponseCode::NoError);
        message.set_authoritative(true).add_answers(answers);
        Self(message)
    }

    /// Authoritative, record-less reply with `code`.
    pub fn authoritative_error(req: &DnsRequest, code: ResponseCode) -> Self {
        let mut message = reply_to(req.message(), code);
        message.set_authoritative(true);
        Self(message)
    }

    /// Non-authoritative, record-less reply with `code`.
    pub fn error(message: &Message, code: ResponseCode) -> Self {
        Self(reply_to(message, code))
    }

    #[inline]
    pub fn response_code(&self) -> ResponseCode {
        self.0.response_code()
    }

    #[inline]
    pub fn answers(&self) -> &[Record] {
        self.0.answers()
    }

    #[inline]
    pub fn is_authoritative(&self) -> bool {
        self.0.authoritative()
    }

    #[inline]
    pub fn message(&self) -> &Message {
        &self.0
    }

    #[inline]
    pub fn into_message(self) -> Message {
        self.0
    }
}

impl From<Message> for DnsResponse {
    fn from(message: Message) -> Self {
        Self(message)
    }
}

fn reply_to(req: &Message, code: ResponseCode) -> Message {
    let mut message = Message::new();
    message
        .set_id(req.id())
        .set_message_type(MessageType::Response)
        .set_op_code(req.op_code())
        .set_recursion_desired(req.recursion_desired())
        .set_response_code(code)
        .add_queries(req.queries().to_vec());

    if let Some(req_edns) = req.extensions() {
        let mut edns = Edns::new();
        edns.set_max_payload(req_edns.max_payload().max(512))
            .set_version(0)
            .set_dnssec_ok(req_edns.dnssec_ok());
        message.set_edns(edns);
    }

    message
}

/// Renders records the way zone files and `dig` print them:
/// `name TAB ttl TAB class TAB type TAB rdata`.
pub trait ZoneLine {
    fn to_zone_line(&self) -> String;
}

impl ZoneLine for Record {
    fn to_zone_line(&self) -> String {
        let rdata = self.data().map(rdata_text).unwrap_or_default();
        format!(
            "{}\t{}\t{}\t{}\t{}",
            self.name().to_ascii(),
            self.ttl(),
            self.dns_class(),
            self.record_type(),
            rdata
        )
    }
}

fn rdata_text(rdata: &RData) -> String {
    match rdata {
        RData::A(a) => a.0.to_string(),
        RData::AAAA(aaaa) => aaaa.0.to_string(),
        RData::CNAME(name) => name.0.to_ascii(),
        RData::NS(name) => name.0.to_ascii(),
        RData::PTR(name) => name.0.to_ascii(),
        RData::MX(mx) => format!("{} {}", mx.preference(), mx.exchange().to_ascii()),
        RData::TXT(txt) => txt
            .txt_data()
            .iter()
            .map(|s| format!("\"{}\"", String::from_utf8_lossy(s)))
            .collect::<Vec<_>>()
            .join(" "),
        RData::SOA(soa) => format!(
            "{} {} {} {} {} {} {}",
            soa.mname().to_ascii(),
            soa.rname().to_ascii(),
            soa.serial(),
            soa.refresh(),
            soa.retry(),
            soa.expire(),
            soa.minimum()
        ),
        other => other.to_string(),
    }
}
