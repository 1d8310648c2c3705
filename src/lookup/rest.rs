//! SignalWire carrier lookup over REST.

use super::{LineType, LineTypeInfo, LineTypeLookup, LookupError};
use crate::config::ProviderConfig;
use async_trait::async_trait;
use base64::Engine;
use serde_json::Value;
use std::time::Duration;

/// Client for `GET /api/relay/rest/lookup/phone_number/{number}`.
#[derive(Debug, Clone)]
pub struct SignalWireLookup {
    http_client: reqwest::Client,
    base_url: String,
    project_id: String,
    api_token: String,
    timeout: Option<Duration>,
}

impl SignalWireLookup {
    pub fn new(config: &ProviderConfig) -> Self {
        Self {
            http_client: reqwest::Client::new(),
            base_url: config.lookup_base_url(),
            project_id: config.project_id.clone(),
            api_token: config.api_token.clone(),
            timeout: config.timeout(),
        }
    }

    /// Lookup URL with carrier details requested.
    pub fn lookup_url(&self, phone_number: &str) -> String {
        format!(
            "{}/api/relay/rest/lookup/phone_number/{}?include=carrier",
            self.base_url,
            urlencoding::encode(phone_number)
        )
    }

    fn auth_header(&self) -> String {
        let credentials = format!("{}:{}", self.project_id, self.api_token);
        format!(
            "Basic {}",
            base64::engine::general_purpose::STANDARD.encode(credentials)
        )
    }
}

#[async_trait]
impl LineTypeLookup for SignalWireLookup {
    async fn lookup(&self, phone_number: &str) -> Result<LineTypeInfo, LookupError> {
        let mut request = self
            .http_client
            .get(self.lookup_url(phone_number))
            .header("Authorization", self.auth_header())
            .header("Content-Type", "application/json");
        if let Some(timeout) = self.timeout {
            request = request.timeout(timeout);
        }

        let response = request
            .send()
            .await
            .map_err(|e| LookupError::Request(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(LookupError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body: Value = response
            .json()
            .await
            .map_err(|e| LookupError::Decode(e.to_string()))?;
        Ok(parse_line_type(&body))
    }
}

/// Extract `carrier.linetype` from a lookup response.
pub fn parse_line_type(body: &Value) -> LineTypeInfo {
    let raw = body.pointer("/carrier/linetype").and_then(Value::as_str);
    LineTypeInfo {
        line_type: LineType::classify(raw),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::{Path, Query};
    use axum::http::{HeaderMap, StatusCode};
    use axum::routing::get;
    use axum::{Json, Router};
    use serde_json::json;
    use std::collections::HashMap;

    fn config(base_url: &str) -> ProviderConfig {
        ProviderConfig {
            project_id: "proj".to_string(),
            api_token: "tok".to_string(),
            space: "acme.signalwire.com".to_string(),
            lookup_base_url: Some(base_url.to_string()),
            ..ProviderConfig::default()
        }
    }

    async fn lookup_handler(
        Path(number): Path<String>,
        Query(query): Query<HashMap<String, String>>,
        headers: HeaderMap,
    ) -> (StatusCode, Json<Value>) {
        // base64("proj:tok")
        let authorized = headers
            .get("authorization")
            .and_then(|v| v.to_str().ok())
            == Some("Basic cHJvajp0b2s=");
        if !authorized || query.get("include").map(String::as_str) != Some("carrier") {
            return (StatusCode::UNAUTHORIZED, Json(json!({ "error": "denied" })));
        }
        let linetype = match number.as_str() {
            "+15551234567" => json!("wireless"),
            "+15557654321" => json!("landline"),
            _ => Value::Null,
        };
        (
            StatusCode::OK,
            Json(json!({ "e164": number, "carrier": { "linetype": linetype } })),
        )
    }

    async fn spawn_lookup_server() -> String {
        let app = Router::new().route(
            "/api/relay/rest/lookup/phone_number/{number}",
            get(lookup_handler),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_lookup_url_encodes_number() {
        let lookup = SignalWireLookup::new(&ProviderConfig {
            space: "acme.signalwire.com".to_string(),
            ..ProviderConfig::default()
        });
        assert_eq!(
            lookup.lookup_url("+15551234567"),
            concat!(
                "https://acme.signalwire.com/api/relay/rest/lookup/phone_number/",
                "%2B15551234567?include=carrier"
            )
        );
    }

    #[test]
    fn test_auth_header() {
        let lookup = SignalWireLookup::new(&config("http://localhost"));
        assert_eq!(lookup.auth_header(), "Basic cHJvajp0b2s=");
    }

    #[test]
    fn test_parse_line_type() {
        let info = parse_line_type(&json!({ "carrier": { "linetype": "Wireless" } }));
        assert_eq!(info.line_type, LineType::Mobile);
        assert_eq!(parse_line_type(&json!({})).line_type, LineType::Unknown);
        assert_eq!(
            parse_line_type(&json!({ "carrier": null })).line_type,
            LineType::Unknown
        );
    }

    #[tokio::test]
    async fn test_lookup_against_local_server() {
        let base = spawn_lookup_server().await;
        let lookup = SignalWireLookup::new(&config(&base));

        let mobile = lookup.lookup("+15551234567").await.unwrap();
        assert_eq!(mobile.line_type, LineType::Mobile);

        let landline = lookup.lookup("+15557654321").await.unwrap();
        assert_eq!(landline.line_type, LineType::Landline);

        let unknown = lookup.lookup("+15550000000").await.unwrap();
        assert_eq!(unknown.line_type, LineType::Unknown);
    }

    #[tokio::test]
    async fn test_lookup_http_error() {
        let base = spawn_lookup_server().await;
        let lookup = SignalWireLookup::new(&ProviderConfig {
            api_token: "wrong".to_string(),
            ..config(&base)
        });
        let err = lookup.lookup("+15551234567").await.unwrap_err();
        assert!(matches!(err, LookupError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_lookup_connection_error() {
        // Bind then drop to get a port with nothing listening.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let lookup = SignalWireLookup::new(&config(&format!("http://{}", addr)));
        let err = lookup.lookup("+15551234567").await.unwrap_err();
        assert!(matches!(err, LookupError::Request(_)));
    }
}
