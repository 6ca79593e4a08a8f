use std::net::{Ipv4Addr, SocketAddr};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Context;
use url::Url;

pub use crate::config::*;
use crate::{
    log::{info, Level},
    zones::{Fallthrough, Zones},
};

pub const DEFAULT_BIND: SocketAddr = SocketAddr::new(
    std::net::IpAddr::V4(Ipv4Addr::UNSPECIFIED),
    53,
);
pub const DEFAULT_TTL: Duration = Duration::from_secs(3600);
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const CANDIDATE_PATHS: [&str; 3] = [
    "./netbox-dns.conf",
    "/etc/netbox-dns.conf",
    "/etc/netbox-dns/netbox-dns.conf",
];

#[derive(Debug, Default)]
pub struct RuntimeConfig {
    conf_file: Option<PathBuf>,
    inner: Config,
}

impl RuntimeConfig {
    /// Loads `path`, or the first existing well-known file when none is given.
    pub fn load<P: AsRef<Path>>(path: Option<P>) -> anyhow::Result<Arc<Self>> {
        let path = match path {
            Some(path) => path.as_ref().to_path_buf(),
            None => CANDIDATE_PATHS
                .iter()
                .map(PathBuf::from)
                .find(|p| p.exists())
                .with_context(|| {
                    format!("no configuration file found, tried {}", CANDIDATE_PATHS.join(", "))
                })?,
        };

        Ok(Self::builder().with_conf_file(path)?.build()?.into())
    }

    pub fn builder() -> RuntimeConfigBuilder {
        RuntimeConfigBuilder {
            conf_file: None,
            config: Default::default(),
            in_block: false,
            line_no: 0,
            errors: Default::default(),
        }
    }
}

impl RuntimeConfig {
    /// Print the config summary.
    pub fn summary(&self) {
        if let Some(conf_file) = self.conf_file() {
            info!("config: {:?}", conf_file);
        }
        info!("listen: udp://{}", self.bind());
        info!(
            "netbox: {}",
            self.url().map(|u| u.as_str()).unwrap_or("-")
        );
        info!("zones: {}", self.zones());
        info!("default ttl: {}s", self.rr_ttl());
        info!("timeout: {:?}", self.timeout());
        info!("fallthrough: {}", self.fallthrough());
        info!(
            "tls: {}",
            match self.tls() {
                Some(tls) if tls.cert.is_some() => "client certificate",
                Some(tls) if tls.ca.is_some() => "custom CA",
                Some(_) => "ON",
                None => "OFF",
            }
        );
    }

    #[inline]
    pub fn conf_file(&self) -> Option<&Path> {
        self.conf_file.as_deref()
    }

    #[inline]
    pub fn bind(&self) -> SocketAddr {
        self.bind.unwrap_or(DEFAULT_BIND)
    }

    #[inline]
    pub fn log_level(&self) -> Level {
        self.log_level.unwrap_or(Level::INFO)
    }

    #[inline]
    pub fn log_filter(&self) -> Option<&str> {
        self.log_filter.as_deref()
    }

    #[inline]
    fn netbox(&self) -> Option<&NetboxConfig> {
        self.inner.netbox.as_ref()
    }

    pub fn zones(&self) -> Zones {
        Zones::new(self.netbox().map(|n| n.zones.clone()).unwrap_or_default())
    }

    pub fn fallthrough(&self) -> Fallthrough {
        self.netbox()
            .and_then(|n| n.fallthrough.clone())
            .map(Fallthrough::new)
            .unwrap_or_default()
    }

    #[inline]
    pub fn url(&self) -> Option<&Url> {
        self.netbox().and_then(|n| n.url.as_ref())
    }

    #[inline]
    pub fn token(&self) -> &str {
        self.netbox()
            .and_then(|n| n.token.as_deref())
            .unwrap_or_default()
    }

    #[inline]
    pub fn ttl(&self) -> Duration {
        self.netbox().and_then(|n| n.ttl).unwrap_or(DEFAULT_TTL)
    }

    /// [`ttl`](Self::ttl) in whole seconds, as carried by records.
    #[inline]
    pub fn rr_ttl(&self) -> u32 {
        u32::try_from(self.ttl().as_secs()).unwrap_or(u32::MAX)
    }

    #[inline]
    pub fn timeout(&self) -> Duration {
        self.netbox().and_then(|n| n.timeout).unwrap_or(DEFAULT_TIMEOUT)
    }

    #[inline]
    pub fn tls(&self) -> Option<&TlsConfig> {
        self.netbox().and_then(|n| n.tls.as_ref())
    }
}

impl std::ops::Deref for RuntimeConfig {
    type Target = Config;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

pub struct RuntimeConfigBuilder {
    conf_file: Option<PathBuf>,
    config: Config,
    in_block: bool,
    line_no: usize,
    errors: Vec<String>,
}

impl RuntimeConfigBuilder {
    pub fn with_conf_file<P: AsRef<Path>>(mut self, path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read configuration {:?}", path))?;
        self.conf_file = Some(path.to_path_buf());
        Ok(self.with(&text))
    }

    /// Feeds configuration text, one directive per line.
    pub fn with(mut self, config: &str) -> Self {
        for line in config.lines() {
            self.line_no += 1;
            if let Err(err) = self.config_item(line) {
                self.errors.push(format!("line {}: {}", self.line_no, err));
            }
        }
        self
    }

    fn config_item(&mut self, line: &str) -> Result<(), String> {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') {
            return Ok(());
        }

        let item = match parse_config(line) {
            Ok((rest, item)) if rest.trim().is_empty() => item,
            Ok((rest, _)) => return Err(format!("unexpected {:?} in {:?}", rest.trim(), line)),
            Err(_) => return Err(format!("invalid directive {:?}", line)),
        };

        if item.is_block_item() {
            if !self.in_block {
                return Err(format!("{:?} outside of netbox block", line));
            }
            let netbox = self.config.netbox.get_or_insert_with(Default::default);
            match item {
                OneConfig::Url(v) => netbox.url = Some(v),
                OneConfig::Token(v) => netbox.token = Some(v),
                OneConfig::Ttl(v) => netbox.ttl = Some(v),
                OneConfig::Timeout(v) => netbox.timeout = Some(v),
                OneConfig::Fallthrough(v) => netbox.fallthrough = Some(v),
                OneConfig::Tls(v) => netbox.tls = Some(v),
                _ => (),
            }
            return Ok(());
        }

        match item {
            OneConfig::Netbox { zones, closed } => {
                if self.in_block {
                    return Err("nested netbox block".to_string());
                }
                if self.config.netbox.is_some() {
                    return Err("netbox block given twice".to_string());
                }
                self.config.netbox = Some(NetboxConfig {
                    zones,
                    ..Default::default()
                });
                self.in_block = !closed;
            }
            OneConfig::BlockEnd => {
                if !self.in_block {
                    return Err("unexpected '}'".to_string());
                }
                self.in_block = false;
            }
            _ if self.in_block => {
                return Err(format!("{:?} not allowed in netbox block", line));
            }
            OneConfig::Bind(v) => self.config.bind = Some(v),
            OneConfig::LogLevel(v) => self.config.log_level = Some(v),
            OneConfig::LogFilter(v) => self.config.log_filter = Some(v),
            _ => (),
        }

        Ok(())
    }

    pub fn build(mut self) -> anyhow::Result<RuntimeConfig> {
        if self.in_block {
            self.errors.push("netbox block is not closed".to_string());
        }

        match self.config.netbox.as_ref() {
            None => self.errors.push("missing netbox block".to_string()),
            Some(netbox) => {
                if netbox.url.is_none() {
                    self.errors.push("netbox: url is required".to_string());
                }
                if netbox.token.is_none() {
                    self.errors.push("netbox: token is required".to_string());
                }
                if let Some(tls) = netbox.tls.as_ref() {
                    for file in tls.files().filter(|f| !f.is_file()) {
                        self.errors.push(format!("netbox: tls file {:?} not found", file));
                    }
                }
            }
        }

        if !self.errors.is_empty() {
            let source = self
                .conf_file
                .as_ref()
                .map(|p| format!("{:?}", p))
                .unwrap_or_else(|| "configuration".to_string());
            anyhow::bail!("invalid {}:\n  {}", source, self.errors.join("\n  "));
        }

        Ok(RuntimeConfig {
            conf_file: self.conf_file,
            inner: self.config,
        })
    }
}
