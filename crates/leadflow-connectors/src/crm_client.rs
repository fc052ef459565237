//! CRM HTTP client: Basic auth over the CRM's `people` and
//! `users` endpoints. Modeled on Follow Up Boss's pagination shape, but
//! nothing here is FUB-specific beyond the field names in the response
//! structs.

use base64::Engine;
use serde::Deserialize;
use tracing::debug;

use crate::error::{ConnectorError, Result};

const DEFAULT_TIMEOUT_SECS: u64 = 30;
const PAGE_SIZE: i64 = 100;

#[derive(Debug, Clone)]
pub struct CrmClient {
    base_url: String,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct Metadata {
    offset: i64,
    limit: i64,
    total: i64,
}

#[derive(Debug, Deserialize)]
struct PeoplePage {
    #[serde(rename = "_metadata")]
    metadata: Metadata,
    #[serde(default)]
    people: Vec<PersonPayload>,
}

/// One raw record off the CRM's `people` endpoint, before it is turned
/// into a `CrmLead` by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct PersonPayload {
    pub id: i64,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
    #[serde(default)]
    pub emails: Vec<EmailEntry>,
    #[serde(default)]
    pub phones: Vec<PhoneEntry>,
    #[serde(default)]
    pub addresses: Vec<AddressEntry>,
    #[serde(default)]
    pub assigned_user_id: Option<i64>,
    #[serde(default)]
    pub stage: Option<String>,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    pub updated: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct EmailEntry {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PhoneEntry {
    pub value: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AddressEntry {
    #[serde(default)]
    pub street: Option<String>,
    #[serde(default)]
    pub city: Option<String>,
    #[serde(default)]
    pub state: Option<String>,
    #[serde(default)]
    pub code: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UsersPage {
    #[serde(rename = "_metadata")]
    metadata: Metadata,
    #[serde(default)]
    users: Vec<UserPayload>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct UserPayload {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
}

impl CrmClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(DEFAULT_TIMEOUT_SECS))
            .build()
            .expect("reqwest client builder should never fail with no custom TLS config");
        Self {
            base_url: base_url.into(),
            api_key: api_key.into(),
            client,
        }
    }

    fn basic_auth_header(&self) -> String {
        let credentials = format!("{}:", self.api_key);
        let encoded = base64::engine::general_purpose::STANDARD.encode(credentials);
        format!("Basic {encoded}")
    }

    fn status_error(status: reqwest::StatusCode, body: String) -> ConnectorError {
        if status.as_u16() == 429 || status.is_server_error() {
            ConnectorError::Transient(format!("crm returned {status}: {body}"))
        } else {
            ConnectorError::Permanent(format!("crm returned {status}: {body}"))
        }
    }

    /// Low-cost credential check: a single page of one user.
    pub async fn verify_credentials(&self) -> Result<bool> {
        let url = format!("{}/users", self.base_url);
        let response = self
            .client
            .get(&url)
            .header("Authorization", self.basic_auth_header())
            .query(&[("offset", 0), ("limit", 1)])
            .send()
            .await?;
        Ok(response.status().is_success())
    }

    /// Fetches every user, paginating until exhausted.
    pub async fn list_users(&self) -> Result<Vec<UserPayload>> {
        let mut offset = 0i64;
        let mut users = Vec::new();
        loop {
            let url = format!("{}/users", self.base_url);
            let response = self
                .client
                .get(&url)
                .header("Authorization", self.basic_auth_header())
                .query(&[("offset", offset), ("limit", PAGE_SIZE)])
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Self::status_error(status, body));
            }

            let page: UsersPage = response
                .json()
                .await
                .map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?;
            let returned = page.users.len() as i64;
            users.extend(page.users);

            if page.metadata.offset + returned >= page.metadata.total || returned == 0 {
                break;
            }
            offset = page.metadata.offset + returned;
        }
        Ok(users)
    }

    /// Pages the `people` endpoint, optionally filtered by
    /// `updated_after` for an incremental sync. Returns the full set; the
    /// caller drives the batch-size-100 pagination internally here - the
    /// page size is fixed, not a caller-tunable batch.
    pub async fn list_people(
        &self,
        updated_after: Option<chrono::DateTime<chrono::Utc>>,
    ) -> Result<Vec<PersonPayload>> {
        let mut offset = 0i64;
        let mut people = Vec::new();
        loop {
            let url = format!("{}/people", self.base_url);
            let mut query = vec![
                ("offset".to_string(), offset.to_string()),
                ("limit".to_string(), PAGE_SIZE.to_string()),
            ];
            if let Some(cursor) = updated_after {
                query.push(("updatedAfter".to_string(), cursor.to_rfc3339()));
            }

            let response = self
                .client
                .get(&url)
                .header("Authorization", self.basic_auth_header())
                .query(&query)
                .send()
                .await?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(Self::status_error(status, body));
            }

            let page: PeoplePage = response
                .json()
                .await
                .map_err(|e| ConnectorError::MalformedResponse(e.to_string()))?;
            let returned = page.people.len() as i64;
            debug!(offset, returned, total = page.metadata.total, "fetched crm people page");
            people.extend(page.people);

            if page.metadata.offset + returned >= page.metadata.total || returned == 0 {
                break;
            }
            offset = page.metadata.offset + returned;
        }
        Ok(people)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn basic_auth_header_encodes_api_key_as_username() {
        let client = CrmClient::new("https://crm.example.com", "secret-key");
        let header = client.basic_auth_header();
        assert!(header.starts_with("Basic "));
        let encoded = header.trim_start_matches("Basic ");
        let decoded = base64::engine::general_purpose::STANDARD
            .decode(encoded)
            .unwrap();
        assert_eq!(String::from_utf8(decoded).unwrap(), "secret-key:");
    }

    #[test]
    fn status_error_classifies_retryable_vs_permanent() {
        assert!(matches!(
            CrmClient::status_error(reqwest::StatusCode::TOO_MANY_REQUESTS, "x".into()),
            ConnectorError::Transient(_)
        ));
        assert!(matches!(
            CrmClient::status_error(reqwest::StatusCode::SERVICE_UNAVAILABLE, "x".into()),
            ConnectorError::Transient(_)
        ));
        assert!(matches!(
            CrmClient::status_error(reqwest::StatusCode::UNAUTHORIZED, "x".into()),
            ConnectorError::Permanent(_)
        ));
        assert!(matches!(
            CrmClient::status_error(reqwest::StatusCode::NOT_FOUND, "x".into()),
            ConnectorError::Permanent(_)
        ));
    }
}
