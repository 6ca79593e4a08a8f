//! Canned NetBox replies for tests.

use std::sync::Mutex;

use bytes::Bytes;
use reqwest::StatusCode;
use url::Url;

use super::{HttpReply, HttpTransport};
use crate::dns_error::LookupError;

struct Route {
    path: String,
    params: Vec<(String, String)>,
    reply: Result<HttpReply, LookupError>,
}

impl Route {
    fn matches(&self, url: &Url) -> bool {
        if url.path() != self.path {
            return false;
        }
        let mut expected = self.params.clone();
        let mut actual = url.query_pairs().into_owned().collect::<Vec<_>>();
        expected.sort();
        actual.sort();
        self.params.is_empty() || expected == actual
    }
}

/// Matches on path and the complete, order-insensitive query string.
/// A route registered without params matches any query. Unmatched requests
/// answer `404 Not Found`.
#[derive(Default)]
pub struct MockTransport {
    routes: Vec<Route>,
    calls: Mutex<Vec<(Url, String)>>,
}

impl MockTransport {
    pub fn new() -> Self {
        Default::default()
    }

    pub fn reply(mut self, path: &str, params: &[(&str, &str)], status: StatusCode, body: &str) -> Self {
        self.routes.push(Route {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            reply: Ok(HttpReply {
                status,
                body: Bytes::from(body.to_string()),
            }),
        });
        self
    }

    pub fn ok(self, path: &str, params: &[(&str, &str)], body: &str) -> Self {
        self.reply(path, params, StatusCode::OK, body)
    }

    pub fn fail(mut self, path: &str, params: &[(&str, &str)], err: LookupError) -> Self {
        self.routes.push(Route {
            path: path.to_string(),
            params: params
                .iter()
                .map(|(k, v)| (k.to_string(), v.to_string()))
                .collect(),
            reply: Err(err),
        });
        self
    }

    pub fn urls(&self) -> Vec<Url> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(url, _)| url.clone())
            .collect()
    }

    pub fn tokens(&self) -> Vec<String> {
        self.calls
            .lock()
            .unwrap()
            .iter()
            .map(|(_, token)| token.clone())
            .collect()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait::async_trait]
impl HttpTransport for MockTransport {
    async fn get(&self, url: Url, token: &str) -> Result<HttpReply, LookupError> {
        self.calls
            .lock()
            .unwrap()
            .push((url.clone(), token.to_string()));

        match self.routes.iter().find(|route| route.matches(&url)) {
            Some(route) => route.reply.clone(),
            None => Ok(HttpReply {
                status: StatusCode::NOT_FOUND,
                body: Bytes::new(),
            }),
        }
    }
}
