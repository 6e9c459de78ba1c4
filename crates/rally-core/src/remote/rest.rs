//! REST remote store for a PostgREST-compatible endpoint (Supabase)

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::Value;

use super::client::{ConnectError, Connector};
use super::query::value_text;
use super::{Filter, Query, RemoteError, RemoteResult, RemoteStore, Row};
use crate::config::{ClientSettings, RemoteConfig};
use crate::util::compact_text;

const UNIQUE_VIOLATION: &str = "23505";

#[derive(Clone)]
pub struct RestStore {
    rest_url: String,
    api_key: String,
    client: Client,
}

impl fmt::Debug for RestStore {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("RestStore")
            .field("rest_url", &self.rest_url)
            .field("api_key", &"[REDACTED]")
            .finish_non_exhaustive()
    }
}

impl RestStore {
    pub fn new(config: &RemoteConfig, settings: &ClientSettings) -> RemoteResult<Self> {
        let client = Client::builder()
            .timeout(settings.request_timeout)
            .build()
            .map_err(classify_http_error)?;

        Ok(Self {
            rest_url: format!("{}/rest/v1", config.url),
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/{table}", self.rest_url)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        request
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
    }

    async fn send_for_rows(&self, request: RequestBuilder) -> RemoteResult<Vec<Row>> {
        let response = self
            .authorized(request)
            .send()
            .await
            .map_err(classify_http_error)?;
        let response = ensure_success(response).await?;
        let payload = response
            .json::<Vec<Value>>()
            .await
            .map_err(classify_http_error)?;

        payload
            .into_iter()
            .map(|value| match value {
                Value::Object(row) => Ok(row),
                other => Err(RemoteError::Decode(format!("expected a row object, got {other}"))),
            })
            .collect()
    }
}

#[async_trait]
impl RemoteStore for RestStore {
    async fn select(&self, table: &str, query: &Query) -> RemoteResult<Vec<Row>> {
        let request = self
            .client
            .get(self.table_url(table))
            .query(&select_params(query));
        self.send_for_rows(request).await
    }

    async fn insert(&self, table: &str, rows: Vec<Row>) -> RemoteResult<Vec<Row>> {
        if rows.is_empty() {
            return Ok(Vec::new());
        }
        let request = self
            .client
            .post(self.table_url(table))
            .header("Prefer", "return=representation")
            .json(&rows);
        self.send_for_rows(request).await
    }

    async fn update(&self, table: &str, id: &str, row: Row) -> RemoteResult<Option<Row>> {
        let request = self
            .client
            .patch(self.table_url(table))
            .query(&[("id", format!("eq.{id}"))])
            .header("Prefer", "return=representation")
            .json(&row);
        let mut rows = self.send_for_rows(request).await?;
        Ok(if rows.is_empty() {
            None
        } else {
            Some(rows.swap_remove(0))
        })
    }

    async fn delete(&self, table: &str, ids: &[String]) -> RemoteResult<()> {
        if ids.is_empty() {
            return Ok(());
        }
        let response = self
            .authorized(
                self.client
                    .delete(self.table_url(table))
                    .query(&[("id", in_list(ids))]),
            )
            .send()
            .await
            .map_err(classify_http_error)?;
        ensure_success(response).await?;
        Ok(())
    }
}

/// Connects to the configured REST endpoint.
///
/// Without a `RemoteConfig` every attempt fails with a configuration error,
/// which disables the owning client until it is reset.
#[derive(Debug, Clone)]
pub struct RestConnector {
    config: Option<RemoteConfig>,
    settings: ClientSettings,
}

impl RestConnector {
    pub const fn new(config: Option<RemoteConfig>, settings: ClientSettings) -> Self {
        Self { config, settings }
    }
}

#[async_trait]
impl Connector for RestConnector {
    async fn connect(&self) -> Result<Arc<dyn RemoteStore>, ConnectError> {
        let Some(config) = &self.config else {
            return Err(ConnectError::Configuration(
                "RALLY_REMOTE_URL and RALLY_REMOTE_KEY are not set".to_string(),
            ));
        };
        let store = RestStore::new(config, &self.settings)
            .map_err(|error| ConnectError::Transport(error.to_string()))?;
        tracing::debug!("Connected REST store at {}", store.rest_url);
        Ok(Arc::new(store))
    }
}

fn select_params(query: &Query) -> Vec<(String, String)> {
    let mut params = vec![("select".to_string(), "*".to_string())];
    params.extend(query.filters.iter().map(|filter| match filter {
        Filter::Eq(column, value) => (column.clone(), format!("eq.{}", value_text(value))),
        Filter::IsNull(column) => (column.clone(), "is.null".to_string()),
    }));
    if let Some(order) = &query.order {
        let direction = if order.ascending { "asc" } else { "desc" };
        params.push(("order".to_string(), format!("{}.{direction}", order.column)));
    }
    if let Some(limit) = query.limit {
        params.push(("limit".to_string(), limit.to_string()));
    }
    params
}

fn in_list(ids: &[String]) -> String {
    let quoted = ids
        .iter()
        .map(|id| format!("\"{}\"", id.replace('"', "")))
        .collect::<Vec<_>>()
        .join(",");
    format!("in.({quoted})")
}

async fn ensure_success(response: Response) -> RemoteResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = response.text().await.unwrap_or_default();
    Err(parse_api_error(status, &body))
}

#[derive(Debug, Deserialize)]
struct PostgrestErrorResponse {
    code: Option<String>,
    message: Option<String>,
    details: Option<String>,
}

fn parse_api_error(status: StatusCode, body: &str) -> RemoteError {
    let payload = serde_json::from_str::<PostgrestErrorResponse>(body).ok();
    let code = payload.as_ref().and_then(|payload| payload.code.clone());
    let message = payload
        .and_then(|payload| payload.message.or(payload.details))
        .map(|message| message.trim().to_string())
        .filter(|message| !message.is_empty())
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                format!("HTTP {}", status.as_u16())
            } else {
                compact_text(trimmed)
            }
        });

    // 409 also carries foreign key violations (23503)
    let duplicate = match code.as_deref() {
        Some(code) => code == UNIQUE_VIOLATION,
        None => status == StatusCode::CONFLICT,
    };
    if duplicate {
        return RemoteError::Constraint(message);
    }
    RemoteError::Api {
        status: status.as_u16(),
        message,
    }
}

fn classify_http_error(error: reqwest::Error) -> RemoteError {
    if error.is_decode() {
        RemoteError::Decode(error.to_string())
    } else if let Some(status) = error.status() {
        RemoteError::Api {
            status: status.as_u16(),
            message: error.to_string(),
        }
    } else {
        // connect, timeout, TLS and body errors
        RemoteError::Transport(error.to_string())
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;

    fn pairs(params: &[(String, String)]) -> Vec<(&str, &str)> {
        params
            .iter()
            .map(|(key, value)| (key.as_str(), value.as_str()))
            .collect()
    }

    #[test]
    fn select_params_render_postgrest_filters() {
        let query = Query::new()
            .eq("session_id", "s1")
            .eq("court_number", 2)
            .is_null("completed_at")
            .order_by("started_at", true)
            .limit(1);

        assert_eq!(
            pairs(&select_params(&query)),
            vec![
                ("select", "*"),
                ("session_id", "eq.s1"),
                ("court_number", "eq.2"),
                ("completed_at", "is.null"),
                ("order", "started_at.asc"),
                ("limit", "1"),
            ]
        );
    }

    #[test]
    fn delete_renders_quoted_in_list() {
        assert_eq!(in_list(&["a".into(), "b".into()]), "in.(\"a\",\"b\")");
    }

    #[test]
    fn unique_violation_maps_to_constraint() {
        let body = r#"{"code":"23505","message":"duplicate key value violates unique constraint"}"#;
        assert!(parse_api_error(StatusCode::CONFLICT, body).is_duplicate_key());
        assert!(parse_api_error(StatusCode::BAD_REQUEST, body).is_duplicate_key());
        assert!(parse_api_error(StatusCode::CONFLICT, "").is_duplicate_key());
    }

    #[test]
    fn foreign_key_conflict_is_not_a_duplicate() {
        let body = r#"{"code":"23503","message":"insert or update on table \"courts\" violates foreign key constraint"}"#;
        let error = parse_api_error(StatusCode::CONFLICT, body);
        assert!(!error.is_duplicate_key());
        assert!(matches!(error, RemoteError::Api { status: 409, .. }));
    }

    #[test]
    fn other_statuses_keep_message() {
        let error = parse_api_error(
            StatusCode::BAD_REQUEST,
            r#"{"code":"PGRST204","message":"Could not find the 'foo' column"}"#,
        );
        assert_eq!(
            error,
            RemoteError::Api {
                status: 400,
                message: "Could not find the 'foo' column".to_string(),
            }
        );
        assert_eq!(
            parse_api_error(StatusCode::BAD_GATEWAY, ""),
            RemoteError::Api {
                status: 502,
                message: "HTTP 502".to_string(),
            }
        );
    }

    #[test]
    fn store_debug_redacts_key() {
        let config = RemoteConfig::new("https://demo.supabase.co", "secret-key").unwrap();
        let store = RestStore::new(&config, &ClientSettings::default()).unwrap();
        let rendered = format!("{store:?}");
        assert!(!rendered.contains("secret-key"));
        assert!(rendered.contains("https://demo.supabase.co/rest/v1"));
    }

    #[tokio::test(flavor = "multi_thread")]
    async fn connector_without_config_reports_configuration_error() {
        let connector = RestConnector::new(None, ClientSettings::default());
        assert!(matches!(
            connector.connect().await,
            Err(ConnectError::Configuration(_))
        ));
    }

    #[tokio::test(flavor = "multi_thread")]
    #[ignore = "requires RALLY_REMOTE_URL and RALLY_REMOTE_KEY"]
    async fn live_select_players() {
        let _ = dotenvy::dotenv();
        let url = std::env::var("RALLY_REMOTE_URL").unwrap();
        let key = std::env::var("RALLY_REMOTE_KEY").unwrap();
        let config = RemoteConfig::new(url, key).unwrap();
        let store = RestStore::new(&config, &ClientSettings::default()).unwrap();

        let rows = store
            .select("players", &Query::new().order_by("created_at", true).limit(5))
            .await
            .unwrap();
        assert!(rows.len() <= 5);
    }
}
