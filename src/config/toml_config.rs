use crate::domain::model::{CollectionPath, DateWindow};
use crate::utils::error::{BoardError, Result};
use crate::utils::validation::{
    validate_digits, validate_non_empty_string, validate_positive_number, validate_range,
    validate_required_field, validate_url, Validate,
};
use chrono::NaiveDate;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::sync::LazyLock;

pub const DEFAULT_AUTH_ENDPOINT: &str = "https://identitytoolkit.googleapis.com";
pub const DEFAULT_FIRESTORE_ENDPOINT: &str = "https://firestore.googleapis.com";
pub const DEFAULT_TOKEN_ENDPOINT: &str = "https://securetoken.googleapis.com";
const DEFAULT_POLL_INTERVAL_MS: u64 = 2000;
const DEFAULT_REQUEST_TIMEOUT_SECONDS: u64 = 15;

static ENV_VAR_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\$\{([^}]+)\}").expect("env var pattern is valid"));

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub event: EventConfig,
    pub deployment: DeploymentConfig,
    pub admin: AdminConfig,
    pub firebase: Option<FirebaseConfig>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventConfig {
    pub name: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeploymentConfig {
    pub app_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminConfig {
    pub contact_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FirebaseConfig {
    pub api_key: String,
    pub project_id: String,
    pub auth_endpoint: Option<String>,
    pub firestore_endpoint: Option<String>,
    pub token_endpoint: Option<String>,
    pub poll_interval_ms: Option<u64>,
    pub request_timeout_seconds: Option<u64>,
}

impl FirebaseConfig {
    pub fn auth_endpoint(&self) -> &str {
        self.auth_endpoint.as_deref().unwrap_or(DEFAULT_AUTH_ENDPOINT)
    }

    pub fn firestore_endpoint(&self) -> &str {
        self.firestore_endpoint
            .as_deref()
            .unwrap_or(DEFAULT_FIRESTORE_ENDPOINT)
    }

    pub fn token_endpoint(&self) -> &str {
        self.token_endpoint.as_deref().unwrap_or(DEFAULT_TOKEN_ENDPOINT)
    }

    pub fn poll_interval_ms(&self) -> u64 {
        self.poll_interval_ms.unwrap_or(DEFAULT_POLL_INTERVAL_MS)
    }

    pub fn request_timeout_seconds(&self) -> u64 {
        self.request_timeout_seconds
            .unwrap_or(DEFAULT_REQUEST_TIMEOUT_SECONDS)
    }
}

impl Validate for FirebaseConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("firebase.api_key", &self.api_key)?;
        validate_non_empty_string("firebase.project_id", &self.project_id)?;
        validate_url("firebase.auth_endpoint", self.auth_endpoint())?;
        validate_url("firebase.firestore_endpoint", self.firestore_endpoint())?;
        validate_url("firebase.token_endpoint", self.token_endpoint())?;
        validate_positive_number("firebase.poll_interval_ms", self.poll_interval_ms(), 100)?;
        validate_range(
            "firebase.request_timeout_seconds",
            self.request_timeout_seconds(),
            1,
            300,
        )?;
        Ok(())
    }
}

impl AppConfig {
    /// 從 TOML 檔案載入配置
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(&path)?;
        Self::from_toml_str(&content)
    }

    /// 從 TOML 字串解析配置
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let processed_content = Self::substitute_env_vars(content);
        Ok(toml::from_str(&processed_content)?)
    }

    /// 替換環境變數 (例如 ${FIREBASE_API_KEY})，未設定的保持原樣
    fn substitute_env_vars(content: &str) -> String {
        ENV_VAR_RE
            .replace_all(content, |caps: &regex::Captures| {
                let var_name = &caps[1];
                std::env::var(var_name).unwrap_or_else(|_| format!("${{{}}}", var_name))
            })
            .to_string()
    }

    pub fn window(&self) -> DateWindow {
        DateWindow::new(self.event.start_date, self.event.end_date)
    }

    pub fn collection(&self) -> CollectionPath {
        CollectionPath::for_deployment(&self.deployment.app_id)
    }

    pub fn admin_contact(&self) -> &str {
        &self.admin.contact_number
    }

    /// The hosted backend settings; required by every command that talks to the store.
    pub fn firebase(&self) -> Result<&FirebaseConfig> {
        validate_required_field("firebase", &self.firebase)
    }
}

impl Validate for AppConfig {
    fn validate(&self) -> Result<()> {
        validate_non_empty_string("event.name", &self.event.name)?;
        if self.event.start_date > self.event.end_date {
            return Err(BoardError::InvalidConfigValueError {
                field: "event.end_date".to_string(),
                value: self.event.end_date.to_string(),
                reason: format!("must not be before start_date {}", self.event.start_date),
            });
        }

        validate_non_empty_string("deployment.app_id", &self.deployment.app_id)?;
        if self.deployment.app_id.contains('/') {
            return Err(BoardError::InvalidConfigValueError {
                field: "deployment.app_id".to_string(),
                value: self.deployment.app_id.clone(),
                reason: "must be a single path segment".to_string(),
            });
        }

        validate_digits("admin.contact_number", &self.admin.contact_number)?;

        if let Some(firebase) = &self.firebase {
            firebase.validate()?;
        }
        Ok(())
    }
}
