use reqwest::Client;
use shared::{
    domain::MutationIntent,
    error::ApiError,
    protocol::{
        delete_kv_route, get_all_route, search_kv_route, set_kv_route, update_kv_route, KeyBody,
        KeyValueBody,
    },
};

pub mod decode;
pub mod dialog;
pub mod error;
pub mod table;

pub use decode::decode_listing;
pub use dialog::{DialogError, DialogHost, DialogMode, DialogPhase, MutationDialog};
pub use error::ClientError;
pub use table::{LoadPhase, SortColumn, SortDirection, TableEngine, ViewState, PAGE_SIZE};

/// HTTP client for the command relay. One method per endpoint; success
/// bodies are the engine's raw stdout text, failures are decoded from the
/// relay's JSON error body.
#[derive(Debug, Clone)]
pub struct RelayClient {
    http: Client,
    server_url: String,
}

impl RelayClient {
    pub fn new(server_url: impl Into<String>) -> Self {
        let mut server_url = server_url.into();
        while server_url.ends_with('/') {
            server_url.pop();
        }
        Self {
            http: Client::new(),
            server_url,
        }
    }

    pub fn server_url(&self) -> &str {
        &self.server_url
    }

    pub async fn set_kv(&self, key: &str, value: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(format!("{}{}", self.server_url, set_kv_route()))
            .json(&KeyValueBody {
                key: key.to_string(),
                value: value.to_string(),
            })
            .send()
            .await?;
        read_text(res).await
    }

    pub async fn update_kv(&self, key: &str, value: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(format!("{}{}", self.server_url, update_kv_route()))
            .json(&KeyValueBody {
                key: key.to_string(),
                value: value.to_string(),
            })
            .send()
            .await?;
        read_text(res).await
    }

    pub async fn delete_kv(&self, key: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(format!("{}{}", self.server_url, delete_kv_route()))
            .json(&KeyBody {
                key: key.to_string(),
            })
            .send()
            .await?;
        read_text(res).await
    }

    pub async fn search_kv(&self, key: &str) -> Result<String, ClientError> {
        let res = self
            .http
            .post(format!("{}{}", self.server_url, search_kv_route()))
            .json(&KeyBody {
                key: key.to_string(),
            })
            .send()
            .await?;
        read_text(res).await
    }

    pub async fn fetch_all(&self) -> Result<String, ClientError> {
        let res = self
            .http
            .get(format!("{}{}", self.server_url, get_all_route()))
            .send()
            .await?;
        read_text(res).await
    }

    /// Dispatches one mutation intent to its endpoint, consuming it.
    pub async fn apply(&self, intent: &MutationIntent) -> Result<String, ClientError> {
        match intent {
            MutationIntent::Add { key, value } => self.set_kv(key, value).await,
            MutationIntent::Update { key, value } => self.update_kv(key, value).await,
            MutationIntent::Delete { key } => self.delete_kv(key).await,
        }
    }
}

async fn read_text(res: reqwest::Response) -> Result<String, ClientError> {
    let status = res.status();
    if status.is_success() {
        return Ok(res.text().await?);
    }
    let body = res.text().await.unwrap_or_default();
    let message = match serde_json::from_str::<ApiError>(&body) {
        Ok(err) => err.message,
        Err(_) => body,
    };
    Err(ClientError::Relay {
        status: status.as_u16(),
        message,
    })
}

#[cfg(test)]
mod tests;
