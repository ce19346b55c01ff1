//! Transport to the search server.
//!
//! The scan engine only sees the [`Backend`] trait; [`HttpBackend`] speaks
//! the REST API over blocking HTTP. Responses are returned as raw JSON
//! documents: whether a document means success or a backend-reported error
//! is decided by the caller, not by the HTTP status code.

use std::time::Duration;

use reqwest::blocking::Client;
use serde_json::Value;
use tracing::debug;

use crate::{Config, Error, Result};

/// Requests the scan engine needs from a search server.
pub trait Backend {
    /// Open a point-in-time on `target`, kept alive for `keep_alive`.
    fn open_point_in_time(&self, target: &str, keep_alive: &str) -> Result<Value>;

    /// Run one search request.
    fn search(&self, body: &Value) -> Result<Value>;

    /// Describe every field of the indices matching `target`.
    fn field_caps(&self, target: &str) -> Result<Value>;
}

impl<B: Backend + ?Sized> Backend for &B {
    fn open_point_in_time(&self, target: &str, keep_alive: &str) -> Result<Value> {
        (**self).open_point_in_time(target, keep_alive)
    }

    fn search(&self, body: &Value) -> Result<Value> {
        (**self).search(body)
    }

    fn field_caps(&self, target: &str) -> Result<Value> {
        (**self).field_caps(target)
    }
}

/// Blocking HTTP client for an Elasticsearch-compatible server.
#[derive(Debug, Clone)]
pub struct HttpBackend {
    client: Client,
    base_url: String,
}

impl HttpBackend {
    /// Create a backend for `base_url` (e.g. `http://localhost:9200`).
    pub fn new(base_url: impl Into<String>) -> Result<Self> {
        let client = Client::builder()
            .connect_timeout(Duration::from_secs(10))
            .build()?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Create a backend for the host in `config`.
    pub fn from_config(config: &Config) -> Result<Self> {
        Self::new(config.base_url())
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn pit_url(&self, target: &str) -> String {
        format!("{}/{}/_pit", self.base_url, target)
    }

    fn search_url(&self) -> String {
        format!("{}/_search", self.base_url)
    }

    fn field_caps_url(&self, target: &str) -> String {
        format!("{}/{}/_field_caps", self.base_url, target)
    }
}

/// Read a response body as a JSON document.
fn read_json(response: reqwest::blocking::Response) -> Result<Value> {
    let status = response.status();
    let text = response.text()?;
    debug!(%status, body = %text, "response");
    serde_json::from_str(&text).map_err(|e| {
        Error::InvalidResponse(format!("HTTP {} with non-JSON body ({}): {}", status, e, text))
    })
}

impl Backend for HttpBackend {
    fn open_point_in_time(&self, target: &str, keep_alive: &str) -> Result<Value> {
        let url = self.pit_url(target);
        debug!(%url, keep_alive, "opening point-in-time");
        let response = self
            .client
            .post(&url)
            .query(&[("keep_alive", keep_alive)])
            .send()?;
        read_json(response)
    }

    fn search(&self, body: &Value) -> Result<Value> {
        let url = self.search_url();
        debug!(%url, %body, "search request");
        let response = self.client.get(&url).json(body).send()?;
        read_json(response)
    }

    fn field_caps(&self, target: &str) -> Result<Value> {
        let url = self.field_caps_url(target);
        debug!(%url, "listing fields");
        let response = self.client.get(&url).query(&[("fields", "*")]).send()?;
        read_json(response)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_server::ScriptedServer;
    use serde_json::json;

    #[test]
    fn test_urls() {
        let backend = HttpBackend::new("http://localhost:9200/").unwrap();
        assert_eq!(backend.base_url(), "http://localhost:9200");
        assert_eq!(backend.pit_url("logstash-*"), "http://localhost:9200/logstash-*/_pit");
        assert_eq!(backend.search_url(), "http://localhost:9200/_search");
        assert_eq!(
            backend.field_caps_url("a-*,b-*"),
            "http://localhost:9200/a-*,b-*/_field_caps"
        );
    }

    #[test]
    fn test_open_point_in_time_request() {
        let server = ScriptedServer::ok([r#"{"id":"46ToAwMDaWR5"}"#]);
        let backend = HttpBackend::new(server.url()).unwrap();

        let doc = backend.open_point_in_time("logstash-*", "10s").unwrap();
        assert_eq!(doc, json!({"id": "46ToAwMDaWR5"}));

        let requests = server.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, "POST");
        assert_eq!(requests[0].uri, "/logstash-*/_pit?keep_alive=10s");
    }

    #[test]
    fn test_search_sends_json_body() {
        let server = ScriptedServer::ok([r#"{"hits":{"hits":[]}}"#]);
        let backend = HttpBackend::new(server.url()).unwrap();

        let body = json!({"size": 5, "query": {"bool": {"filter": []}}});
        let doc = backend.search(&body).unwrap();
        assert_eq!(doc, json!({"hits": {"hits": []}}));

        let requests = server.requests();
        assert_eq!(requests[0].method, "GET");
        assert_eq!(requests[0].uri, "/_search");
        assert_eq!(requests[0].json(), body);
    }

    #[test]
    fn test_field_caps_request() {
        let server = ScriptedServer::ok([r#"{"fields":{"message":{}}}"#]);
        let backend = HttpBackend::new(server.url()).unwrap();

        let doc = backend.field_caps("a-*,b-*").unwrap();
        assert_eq!(doc["fields"], json!({"message": {}}));
        assert_eq!(server.requests()[0].uri, "/a-*,b-*/_field_caps?fields=*");
    }

    #[test]
    fn test_error_status_still_returns_document() {
        let server = ScriptedServer::start([(
            404,
            r#"{"error":{"type":"index_not_found_exception","reason":"no such index [nope]"},"status":404}"#,
        )]);
        let backend = HttpBackend::new(server.url()).unwrap();

        let doc = backend.open_point_in_time("nope", "10s").unwrap();
        assert_eq!(doc["error"]["type"], "index_not_found_exception");
    }

    #[test]
    fn test_non_json_body() {
        let server = ScriptedServer::start([(502, "Bad Gateway")]);
        let backend = HttpBackend::new(server.url()).unwrap();

        let result = backend.search(&json!({}));
        assert!(matches!(result, Err(Error::InvalidResponse(_))));
        assert_eq!(server.requests().len(), 1);
    }

    #[test]
    fn test_connection_refused_is_transport_error() {
        // Bind then drop to get a port nobody listens on.
        let port = {
            let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };
        let backend = HttpBackend::new(format!("http://127.0.0.1:{}", port)).unwrap();

        let result = backend.search(&json!({}));
        assert!(matches!(result, Err(Error::Transport(_))));
    }
}
