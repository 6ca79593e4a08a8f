//! Clients for the NetBox REST API.
//!
//! [`ipam`] talks to the core IPAM endpoints, [`plugin`] to the netbox-dns
//! plugin. Both go through [`NetboxApi`], which owns URL building, the token
//! header and response decoding; the actual request is made by an
//! [`HttpTransport`].

use std::sync::Arc;
use std::time::Duration;

use bytes::Bytes;
use reqwest::{header, StatusCode};
use serde::{de::DeserializeOwned, Deserialize};
use url::Url;

use crate::config::TlsConfig;
use crate::dns_error::LookupError;
use crate::log::debug;

pub mod alias;
pub mod ipam;
pub mod plugin;
pub mod record;
pub mod source;
pub mod status;

#[cfg(test)]
pub mod mock;

pub use record::{BackendRecord, BackendZone, RecordKind};
pub use source::{LegacySource, PluginSource, RecordSource};

/// Raw reply of a GET request.
#[derive(Debug, Clone)]
pub struct HttpReply {
    pub status: StatusCode,
    pub body: Bytes,
}

#[async_trait::async_trait]
pub trait HttpTransport: Send + Sync {
    async fn get(&self, url: Url, token: &str) -> Result<HttpReply, LookupError>;
}

/// [`HttpTransport`] backed by a shared `reqwest` client.
#[derive(Debug, Clone)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    pub fn new(timeout: Duration, tls: Option<&TlsConfig>) -> anyhow::Result<Self> {
        let mut builder = reqwest::Client::builder()
            .use_rustls_tls()
            .timeout(timeout)
            .user_agent(concat!("netbox-dns/", env!("CARGO_PKG_VERSION")));

        if let Some(tls) = tls {
            if let Some(ca) = tls.ca.as_ref() {
                let pem = std::fs::read(ca)
                    .map_err(|err| anyhow::anyhow!("reading CA {:?} failed: {}", ca, err))?;
                builder = builder.add_root_certificate(reqwest::Certificate::from_pem(&pem)?);
            }
            if let (Some(cert), Some(key)) = (tls.cert.as_ref(), tls.key.as_ref()) {
                let mut pem = std::fs::read(cert)
                    .map_err(|err| anyhow::anyhow!("reading certificate {:?} failed: {}", cert, err))?;
                let key = std::fs::read(key)
                    .map_err(|err| anyhow::anyhow!("reading key {:?} failed: {}", key, err))?;
                pem.push(b'\n');
                pem.extend_from_slice(&key);
                builder = builder.identity(reqwest::Identity::from_pem(&pem)?);
            }
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

#[async_trait::async_trait]
impl HttpTransport for ReqwestTransport {
    async fn get(&self, url: Url, token: &str) -> Result<HttpReply, LookupError> {
        let res = self
            .client
            .get(url)
            .header(header::AUTHORIZATION, format!("Token {}", token))
            .header(header::ACCEPT, "application/json")
            .send()
            .await?;

        let status = res.status();
        let body = res.bytes().await?;
        Ok(HttpReply { status, body })
    }
}

/// Paginated list envelope used by every NetBox list endpoint.
#[derive(Debug, Deserialize)]
pub struct ResultList<T> {
    pub results: Vec<T>,
}

/// Base URL and credentials of one NetBox instance.
#[derive(Clone)]
pub struct NetboxApi {
    base: Url,
    token: String,
    transport: Arc<dyn HttpTransport>,
}

impl std::fmt::Debug for NetboxApi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NetboxApi")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl NetboxApi {
    pub fn new(base: Url, token: impl Into<String>, transport: Arc<dyn HttpTransport>) -> Self {
        Self {
            base,
            token: token.into(),
            transport,
        }
    }

    #[inline]
    pub fn base(&self) -> &Url {
        &self.base
    }

    /// `path` is appended to the base URL, keeping any prefix the base carries.
    pub fn url(&self, path: &str, query: &[(&str, &str)]) -> Result<Url, LookupError> {
        let mut url = Url::parse(&format!(
            "{}{}",
            self.base.as_str().trim_end_matches('/'),
            path
        ))?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// GETs `path` and decodes a JSON body; anything but `200 OK` is an error.
    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T, LookupError> {
        let url = self.url(path, query)?;
        debug!("GET {}", url);

        let reply = self.transport.get(url, &self.token).await?;
        if reply.status != StatusCode::OK {
            return Err(LookupError::Status(reply.status));
        }

        Ok(serde_json::from_slice(&reply.body)?)
    }

    /// Like [`get_json`](Self::get_json) for list endpoints.
    pub async fn list<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<Vec<T>, LookupError> {
        let list: ResultList<T> = self.get_json(path, query).await?;
        Ok(list.results)
    }
}

#[cfg(test)]
mod tests {
    use super::mock::MockTransport;
    use super::*;

    #[test]
    fn test_url_keeps_base_path() {
        let api = NetboxApi::new(
            "https://example.org/netbox/".parse().unwrap(),
            "t",
            Arc::new(MockTransport::new()),
        );
        let url = api
            .url("/api/ipam/ip-addresses/", &[("dns_name", "my_host")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/netbox/api/ipam/ip-addresses/?dns_name=my_host"
        );
    }

    #[test]
    fn test_url_encodes_values() {
        let api = NetboxApi::new(
            "https://example.org".parse().unwrap(),
            "t",
            Arc::new(MockTransport::new()),
        );
        let url = api
            .url("/api/ipam/ip-addresses/", &[("address", "2001:db8::1")])
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://example.org/api/ipam/ip-addresses/?address=2001%3Adb8%3A%3A1"
        );
    }

    #[tokio::test]
    async fn test_status_and_decode_errors() {
        let mock = MockTransport::new()
            .reply("/forbidden", &[], StatusCode::FORBIDDEN, "")
            .reply("/garbage", &[], StatusCode::OK, "<html>");
        let api = NetboxApi::new("https://example.org".parse().unwrap(), "t", Arc::new(mock));

        let err = api.list::<String>("/forbidden", &[]).await.unwrap_err();
        assert_eq!(err, LookupError::Status(StatusCode::FORBIDDEN));

        let err = api.list::<String>("/garbage", &[]).await.unwrap_err();
        assert!(matches!(err, LookupError::Decode(_)));
    }

    #[tokio::test]
    async fn test_token_is_sent() {
        let mock = Arc::new(MockTransport::new().reply(
            "/api/status/",
            &[],
            StatusCode::OK,
            r#"{"results": []}"#,
        ));
        let api = NetboxApi::new("https://example.org".parse().unwrap(), "s3kr3t", mock.clone());
        let res = api.list::<String>("/api/status/", &[]).await.unwrap();
        assert!(res.is_empty());
        assert_eq!(mock.tokens(), vec!["s3kr3t".to_string()]);
    }
}
