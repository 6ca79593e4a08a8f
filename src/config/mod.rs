use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use url::Url;

use crate::libdns::proto::rr::Name;
use crate::log::Level;

mod parser;

pub use parser::{parse_config, NomParser, OneConfig};

/// Everything read from the configuration file, before defaults are applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Config {
    /// UDP address to serve on.
    ///
    /// bind [IP]:PORT
    pub bind: Option<SocketAddr>,

    /// log-level [level], level=fatal, error, warn, notice, info, debug, trace
    pub log_level: Option<Level>,

    /// tracing directives replacing the default filter.
    pub log_filter: Option<String>,

    pub netbox: Option<NetboxConfig>,
}

/// The `netbox [ZONES...] { ... }` block.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetboxConfig {
    /// Zones answered from NetBox; empty means all.
    pub zones: Vec<Name>,

    /// Base URL of the NetBox instance.
    pub url: Option<Url>,

    /// API token, sent as `Authorization: Token <token>`.
    pub token: Option<String>,

    /// TTL of records that carry none.
    pub ttl: Option<Duration>,

    /// Timeout of each request to NetBox.
    pub timeout: Option<Duration>,

    /// Zones in which unanswered questions go to the next stage.
    ///
    /// A bare `fallthrough` yields the root zone.
    pub fallthrough: Option<Vec<Name>>,

    pub tls: Option<TlsConfig>,
}

/// `tls [CERT KEY [CA]]`, or `tls CA`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TlsConfig {
    /// Client certificate, PEM.
    pub cert: Option<PathBuf>,
    /// Key of the client certificate, PEM.
    pub key: Option<PathBuf>,
    /// Extra trusted root, PEM.
    pub ca: Option<PathBuf>,
}

impl TlsConfig {
    pub fn files(&self) -> impl Iterator<Item = &PathBuf> {
        [self.cert.as_ref(), self.key.as_ref(), self.ca.as_ref()]
            .into_iter()
            .flatten()
    }
}
