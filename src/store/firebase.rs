//! Firebase Realtime Database over its REST API.
//!
//! `GET {root}/{path}.json` reads a document (`null` when absent) and
//! `PATCH {root}/{path}.json` overwrites only the named children. Requests
//! carry the OAuth2 token in the `access_token` query parameter.

use super::credentials::TokenSource;
use super::RealtimeStore;
use crate::error::{Result, SetpointError};
use serde_json::{Map, Value};
use std::cell::OnceCell;

/// Explicitly constructed database handle, one per run.
pub struct FirebaseClient {
    database_url: String,
    tokens: Box<dyn TokenSource>,
    token: OnceCell<String>,
    http: reqwest::blocking::Client,
}

impl FirebaseClient {
    pub fn new(
        database_url: impl Into<String>,
        tokens: Box<dyn TokenSource>,
        http: reqwest::blocking::Client,
    ) -> Self {
        Self {
            database_url: database_url.into().trim_end_matches('/').to_string(),
            tokens,
            token: OnceCell::new(),
            http,
        }
    }

    /// Full REST URL for a database path such as `/sensor_data`.
    pub fn url_for(&self, path: &str) -> String {
        format!(
            "{}/{}.json",
            self.database_url,
            path.trim_matches('/')
        )
    }

    /// The access token is fetched on first use and reused for the run.
    fn access_token(&self) -> Result<String> {
        if let Some(token) = self.token.get() {
            return Ok(token.clone());
        }
        let token = self.tokens.access_token()?;
        let _ = self.token.set(token.clone());
        Ok(token)
    }

    fn check(
        method: &'static str,
        path: &str,
        resp: reqwest::blocking::Response,
    ) -> Result<String> {
        let status = resp.status();
        let body = resp.text().unwrap_or_else(|_| "<unreadable>".to_string());
        if !status.is_success() {
            return Err(SetpointError::Store {
                method,
                path: path.to_string(),
                status: status.as_u16(),
                body,
            });
        }
        Ok(body)
    }
}

impl RealtimeStore for FirebaseClient {
    fn get_document(&self, path: &str) -> Result<Option<Value>> {
        let token = self.access_token()?;
        let resp = self
            .http
            .get(self.url_for(path))
            .query(&[("access_token", token.as_str())])
            .send()?;
        let body = Self::check("GET", path, resp)?;

        let doc: Value =
            serde_json::from_str(&body).map_err(|e| SetpointError::MalformedDocument {
                path: path.to_string(),
                reason: e.to_string(),
            })?;
        Ok(match doc {
            Value::Null => None,
            doc => Some(doc),
        })
    }

    fn update_fields(&self, path: &str, fields: &Map<String, Value>) -> Result<()> {
        let token = self.access_token()?;
        let resp = self
            .http
            .patch(self.url_for(path))
            .query(&[("access_token", token.as_str())])
            .json(fields)
            .send()?;
        Self::check("PATCH", path, resp)?;
        tracing::debug!(path, fields = fields.len(), "updated realtime database");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::StaticToken;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use wiremock::matchers::{body_json, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// Build inside the blocking thread; the blocking client must not be
    /// created or dropped on the async runtime.
    fn client(root: String) -> FirebaseClient {
        FirebaseClient::new(
            format!("{root}/"),
            Box::new(StaticToken("tok".into())),
            reqwest::blocking::Client::new(),
        )
    }

    #[test]
    fn url_for_normalizes_slashes() {
        let client = FirebaseClient::new(
            "https://demo.firebaseio.com/",
            Box::new(StaticToken("t".into())),
            reqwest::blocking::Client::new(),
        );
        assert_eq!(
            client.url_for("/sensor_data"),
            "https://demo.firebaseio.com/sensor_data.json"
        );
        assert_eq!(
            client.url_for("user_feedback/"),
            "https://demo.firebaseio.com/user_feedback.json"
        );
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn reads_document_with_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/sensor_data.json"))
            .and(query_param("access_token", "tok"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"indoor_temp": 24.0, "indoor_humidity": 60})),
            )
            .mount(&server)
            .await;

        let root = server.uri();
        let doc = tokio::task::spawn_blocking(move || client(root).get_document("/sensor_data"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc, Some(json!({"indoor_temp": 24.0, "indoor_humidity": 60})));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn null_body_is_absent_document() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let root = server.uri();
        let doc = tokio::task::spawn_blocking(move || client(root).get_document("/user_feedback"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(doc, None);
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn patches_fields() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/sensor_data.json"))
            .and(query_param("access_token", "tok"))
            .and(body_json(json!({"ai_set_temp": "cool_24", "time_of_day": 14})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let root = server.uri();
        let mut fields = Map::new();
        fields.insert("ai_set_temp".into(), json!("cool_24"));
        fields.insert("time_of_day".into(), json!(14));
        tokio::task::spawn_blocking(move || client(root).update_fields("/sensor_data", &fields))
            .await
            .unwrap()
            .unwrap();
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn permission_denied_is_a_store_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(
                ResponseTemplate::new(401).set_body_json(json!({"error": "Permission denied"})),
            )
            .mount(&server)
            .await;

        let root = server.uri();
        let err = tokio::task::spawn_blocking(move || client(root).get_document("/sensor_data"))
            .await
            .unwrap()
            .unwrap_err();
        match err {
            SetpointError::Store {
                method,
                status,
                body,
                ..
            } => {
                assert_eq!(method, "GET");
                assert_eq!(status, 401);
                assert!(body.contains("Permission denied"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    struct CountingTokens(Arc<AtomicUsize>);

    impl TokenSource for CountingTokens {
        fn access_token(&self) -> Result<String> {
            self.0.fetch_add(1, Ordering::SeqCst);
            Ok("tok".into())
        }
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn token_is_fetched_once_per_client() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("null"))
            .mount(&server)
            .await;

        let calls = Arc::new(AtomicUsize::new(0));
        let url = server.uri();
        let counter = calls.clone();
        tokio::task::spawn_blocking(move || {
            let db = FirebaseClient::new(
                url,
                Box::new(CountingTokens(counter)),
                reqwest::blocking::Client::new(),
            );
            db.get_document("/sensor_data")?;
            db.get_document("/user_feedback")
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
