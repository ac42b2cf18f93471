use crate::config::FirebaseConfig;
use crate::domain::model::{CollectionPath, Nomination, NominationRecord, Session, DATE_FORMAT};
use crate::domain::ports::{AuthProvider, NominationStore, Subscription};
use crate::utils::error::{BoardError, Result};
use async_trait::async_trait;
use chrono::{DateTime, SecondsFormat, Utc};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, RwLock};
use tokio::time::MissedTickBehavior;

// 已部署資料使用的欄位名稱
const FIELD_USER_ID: &str = "userId";
const FIELD_FULL_NAME: &str = "fullName";
const FIELD_FLAT_NO: &str = "flatNo";
const FIELD_WING: &str = "wing";
const FIELD_PHONE: &str = "whatsappNo";
const FIELD_DATE: &str = "selectedDate";
const FIELD_SLOT: &str = "selectedSlot";
const FIELD_OWN_SET: &str = "bringOwnThali";
const FIELD_TIMESTAMP: &str = "timestamp";

const PAGE_SIZE: &str = "300";

// ID token 到期前提早換新
const REFRESH_MARGIN: Duration = Duration::from_secs(60);
const DEFAULT_TOKEN_LIFETIME_SECS: u64 = 3600;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignUpResponse {
    local_id: String,
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

/// Secure Token API answers in snake_case.
#[derive(Debug, Deserialize)]
struct RefreshResponse {
    id_token: String,
    refresh_token: String,
    expires_in: String,
}

#[derive(Debug, Clone)]
struct Credentials {
    id_token: String,
    refresh_token: String,
    refresh_at: Instant,
}

impl Credentials {
    fn new(id_token: String, refresh_token: String, expires_in: &str) -> Self {
        let lifetime = Duration::from_secs(
            expires_in
                .trim()
                .parse()
                .unwrap_or(DEFAULT_TOKEN_LIFETIME_SECS),
        );
        Self {
            id_token,
            refresh_token,
            refresh_at: Instant::now() + lifetime.saturating_sub(REFRESH_MARGIN),
        }
    }

    fn is_fresh(&self) -> bool {
        Instant::now() < self.refresh_at
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ListDocumentsResponse {
    #[serde(default)]
    documents: Vec<Document>,
    next_page_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Document {
    name: String,
    #[serde(default)]
    fields: HashMap<String, Value>,
    create_time: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
    status: Option<String>,
}

/// Anonymous auth and document storage over the Firebase REST APIs.
///
/// The realtime listener is emulated by polling: the collection is listed on
/// a fixed interval and the full snapshot is pushed whenever it changes.
/// The ID token from sign-up is exchanged for a new one shortly before it
/// expires, or after a request is rejected with 401, so the session survives
/// past the first hour.
#[derive(Clone)]
pub struct FirestoreBackend {
    client: Client,
    api_key: String,
    project_id: String,
    auth_endpoint: String,
    firestore_endpoint: String,
    token_endpoint: String,
    poll_interval: Duration,
    credentials: Arc<RwLock<Option<Credentials>>>,
}

impl FirestoreBackend {
    pub fn new(config: &FirebaseConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_seconds()))
            .build()?;

        Ok(Self {
            client,
            api_key: config.api_key.clone(),
            project_id: config.project_id.clone(),
            auth_endpoint: config.auth_endpoint().trim_end_matches('/').to_string(),
            firestore_endpoint: config.firestore_endpoint().trim_end_matches('/').to_string(),
            token_endpoint: config.token_endpoint().trim_end_matches('/').to_string(),
            poll_interval: Duration::from_millis(config.poll_interval_ms()),
            credentials: Arc::new(RwLock::new(None)),
        })
    }

    fn collection_url(&self, collection: &CollectionPath) -> String {
        format!(
            "{}/v1/projects/{}/databases/(default)/documents/{}",
            self.firestore_endpoint, self.project_id, collection
        )
    }

    /// Current bearer token, refreshed first when it is about to expire.
    async fn bearer(&self) -> std::result::Result<Option<String>, String> {
        let current = self.credentials.read().await.clone();
        match current {
            Some(credentials) if credentials.is_fresh() => Ok(Some(credentials.id_token)),
            Some(credentials) => self.refresh(&credentials.refresh_token).await.map(Some),
            None => Ok(None),
        }
    }

    async fn refresh(&self, refresh_token: &str) -> std::result::Result<String, String> {
        let url = format!("{}/v1/token", self.token_endpoint);
        tracing::debug!("Refreshing ID token via {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .form(&[
                ("grant_type", "refresh_token"),
                ("refresh_token", refresh_token),
            ])
            .send()
            .await
            .map_err(|e| format!("token refresh failed: {}", e))?;
        let response = check_status(response)
            .await
            .map_err(|e| format!("token refresh failed: {}", e))?;

        let body: RefreshResponse = response
            .json()
            .await
            .map_err(|e| format!("unexpected token response: {}", e))?;

        let credentials = Credentials::new(body.id_token, body.refresh_token, &body.expires_in);
        let id_token = credentials.id_token.clone();
        *self.credentials.write().await = Some(credentials);
        tracing::info!("🔄 ID token refreshed");

        Ok(id_token)
    }

    /// Sends an authorized request; a 401 triggers one token refresh and one retry.
    async fn send_authorized<F>(&self, build: F) -> std::result::Result<Response, String>
    where
        F: Fn() -> RequestBuilder,
    {
        let token = self.bearer().await?;
        let response = with_bearer(build(), token.as_deref())
            .send()
            .await
            .map_err(|e| e.to_string())?;
        if response.status() != StatusCode::UNAUTHORIZED {
            return check_status(response).await;
        }

        let refresh_token = self
            .credentials
            .read()
            .await
            .as_ref()
            .map(|c| c.refresh_token.clone());
        let Some(refresh_token) = refresh_token else {
            return check_status(response).await;
        };

        tracing::debug!("ID token rejected, refreshing and retrying once");
        let token = self.refresh(&refresh_token).await?;
        let response = build()
            .bearer_auth(token)
            .send()
            .await
            .map_err(|e| e.to_string())?;
        check_status(response).await
    }

    async fn list_documents(&self, collection: &CollectionPath) -> Result<Vec<NominationRecord>> {
        let url = self.collection_url(collection);
        let mut records = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let response = self
                .send_authorized(|| {
                    let request = self.client.get(&url).query(&[("pageSize", PAGE_SIZE)]);
                    match &page_token {
                        Some(token) => request.query(&[("pageToken", token.as_str())]),
                        None => request,
                    }
                })
                .await
                .map_err(BoardError::subscription)?;

            let page: ListDocumentsResponse = response
                .json()
                .await
                .map_err(|e| BoardError::subscription(format!("unexpected list response: {}", e)))?;
            records.extend(page.documents.into_iter().map(decode_document));

            match page.next_page_token {
                Some(token) if !token.is_empty() => page_token = Some(token),
                _ => break,
            }
        }

        tracing::debug!("Listed {} documents from {}", records.len(), collection);
        Ok(records)
    }
}

#[async_trait]
impl AuthProvider for FirestoreBackend {
    async fn authenticate_anonymously(&self) -> Result<Session> {
        let url = format!("{}/v1/accounts:signUp", self.auth_endpoint);
        tracing::debug!("Signing in anonymously via {}", url);

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.api_key.as_str())])
            .json(&json!({ "returnSecureToken": true }))
            .send()
            .await
            .map_err(|e| BoardError::auth(e.to_string()))?;
        let response = check_status(response).await.map_err(BoardError::auth)?;

        let body: SignUpResponse = response
            .json()
            .await
            .map_err(|e| BoardError::auth(format!("unexpected sign-up response: {}", e)))?;

        *self.credentials.write().await = Some(Credentials::new(
            body.id_token,
            body.refresh_token,
            &body.expires_in,
        ));
        tracing::info!("🔑 Anonymous session established");

        Ok(Session {
            submitter_id: body.local_id,
        })
    }
}

#[async_trait]
impl NominationStore for FirestoreBackend {
    async fn append(
        &self,
        collection: &CollectionPath,
        nomination: &Nomination,
    ) -> Result<NominationRecord> {
        let body = encode_nomination(nomination, Utc::now());
        let url = self.collection_url(collection);

        let response = self
            .send_authorized(|| self.client.post(&url).json(&body))
            .await
            .map_err(BoardError::store)?;

        let document: Document = response
            .json()
            .await
            .map_err(|e| BoardError::store(format!("unexpected write response: {}", e)))?;
        Ok(decode_document(document))
    }

    async fn subscribe(&self, collection: &CollectionPath) -> Result<Subscription> {
        let backend = self.clone();
        let collection = collection.clone();
        let (tx, rx) = mpsc::unbounded_channel();

        let feed = tokio::spawn(async move {
            let mut ticker = tokio::time::interval(backend.poll_interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            let mut last: Option<Vec<NominationRecord>> = None;
            let mut failing = false;

            loop {
                ticker.tick().await;
                let event = match backend.list_documents(&collection).await {
                    Ok(records) if last.as_ref() == Some(&records) => continue,
                    Ok(records) => {
                        failing = false;
                        last = Some(records.clone());
                        Ok(records)
                    }
                    // 連續失敗只回報一次
                    Err(_) if failing => continue,
                    Err(e) => {
                        failing = true;
                        last = None;
                        Err(e)
                    }
                };
                if tx.send(event).is_err() {
                    break;
                }
            }
        });

        Ok(Subscription::new(rx, feed))
    }
}

fn with_bearer(request: RequestBuilder, token: Option<&str>) -> RequestBuilder {
    match token {
        Some(token) => request.bearer_auth(token),
        None => request,
    }
}

/// Passes successful responses through; otherwise extracts the API error message.
async fn check_status(response: Response) -> std::result::Result<Response, String> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ErrorEnvelope>(&body) {
        Ok(envelope) => match envelope.error.status {
            Some(code) => format!("{} ({})", envelope.error.message, code),
            None => envelope.error.message,
        },
        Err(_) => format!("HTTP {}", status),
    };
    Err(message)
}

fn string_value(value: &str) -> Value {
    json!({ "stringValue": value })
}

fn encode_nomination(nomination: &Nomination, written_at: DateTime<Utc>) -> Value {
    let mut fields = Map::new();
    fields.insert(FIELD_USER_ID.into(), string_value(&nomination.submitter_id));
    fields.insert(FIELD_FULL_NAME.into(), string_value(&nomination.full_name));
    fields.insert(FIELD_FLAT_NO.into(), string_value(&nomination.flat.number));
    fields.insert(FIELD_WING.into(), string_value(&nomination.flat.wing_str()));
    fields.insert(FIELD_PHONE.into(), string_value(nomination.phone_number.as_str()));
    fields.insert(
        FIELD_DATE.into(),
        string_value(&nomination.date.format(DATE_FORMAT).to_string()),
    );
    fields.insert(FIELD_SLOT.into(), string_value(nomination.slot.as_str()));
    fields.insert(
        FIELD_OWN_SET.into(),
        json!({ "booleanValue": nomination.brings_own_offering_set }),
    );
    fields.insert(
        FIELD_TIMESTAMP.into(),
        json!({ "timestampValue": written_at.to_rfc3339_opts(SecondsFormat::Micros, true) }),
    );
    json!({ "fields": fields })
}

fn decode_document(document: Document) -> NominationRecord {
    let fields = &document.fields;
    let text = |key: &str| {
        fields
            .get(key)
            .and_then(|v| v.get("stringValue"))
            .and_then(Value::as_str)
            .map(str::to_string)
    };
    let parse_time = |raw: &str| {
        DateTime::parse_from_rfc3339(raw)
            .ok()
            .map(|t| t.with_timezone(&Utc))
    };

    let submitted_at = fields
        .get(FIELD_TIMESTAMP)
        .and_then(|v| v.get("timestampValue"))
        .and_then(Value::as_str)
        .and_then(parse_time)
        .or_else(|| document.create_time.as_deref().and_then(parse_time));

    NominationRecord {
        id: document.name.rsplit('/').next().map(str::to_string),
        submitter_id: text(FIELD_USER_ID),
        full_name: text(FIELD_FULL_NAME),
        wing: text(FIELD_WING),
        unit_number: text(FIELD_FLAT_NO),
        phone_number: text(FIELD_PHONE),
        date: text(FIELD_DATE),
        slot: text(FIELD_SLOT),
        brings_own_offering_set: fields
            .get(FIELD_OWN_SET)
            .and_then(|v| v.get("booleanValue"))
            .and_then(Value::as_bool),
        submitted_at,
    }
}
