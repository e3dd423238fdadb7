//! PostgREST table client (Supabase-compatible)

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Method, Request};
use serde_json::json;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{DEFAULT_ENTRIES_TABLE, DEFAULT_PROFILES_TABLE, EntryStore, NewTimeEntry, Profile, StoreError};

/// Connection settings for [`RestStore`]
#[derive(Debug, Clone)]
pub struct RestStoreConfig {
    /// Project URL, e.g. `https://xyz.supabase.co`
    pub url: String,

    /// API key sent as both `apikey` and bearer token
    pub api_key: String,

    pub entries_table: String,
    pub profiles_table: String,

    /// Per-request timeout
    pub timeout: Duration,
}

impl RestStoreConfig {
    /// Settings with the default table names and a 30s timeout
    pub fn new(url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            api_key: api_key.into(),
            entries_table: DEFAULT_ENTRIES_TABLE.to_string(),
            profiles_table: DEFAULT_PROFILES_TABLE.to_string(),
            timeout: Duration::from_secs(30),
        }
    }
}

/// Entry store backed by a PostgREST `/rest/v1` endpoint
pub struct RestStore {
    base_url: String,
    api_key: String,
    entries_table: String,
    profiles_table: String,
    http: Client,
}

impl RestStore {
    /// Create a client from connection settings
    pub fn new(config: RestStoreConfig) -> Result<Self, StoreError> {
        debug!(url = %config.url, entries_table = %config.entries_table, "RestStore::new: called");
        if config.url.trim().is_empty() {
            return Err(StoreError::NotConfigured("store URL is empty".to_string()));
        }
        if config.api_key.trim().is_empty() {
            return Err(StoreError::NotConfigured("store API key is empty".to_string()));
        }

        let http = Client::builder().timeout(config.timeout).build()?;

        Ok(Self {
            base_url: config.url.trim_end_matches('/').to_string(),
            api_key: config.api_key,
            entries_table: config.entries_table,
            profiles_table: config.profiles_table,
            http,
        })
    }

    fn table_url(&self, table: &str) -> String {
        format!("{}/rest/v1/{}", self.base_url, table)
    }

    fn request(&self, method: Method, table: &str) -> reqwest::RequestBuilder {
        self.http
            .request(method, self.table_url(table))
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("content-type", "application/json")
    }

    /// Build the insert request for an entry
    ///
    /// Conflicts on `id` are ignored, so re-sending an entry whose first insert
    /// actually landed does not create a second row.
    fn insert_request(&self, entry: &NewTimeEntry) -> Result<Request, StoreError> {
        debug!(id = %entry.id, "insert_request: called");
        Ok(self
            .request(Method::POST, &self.entries_table)
            .query(&[("on_conflict", "id")])
            .header("Prefer", "return=minimal,resolution=ignore-duplicates")
            .json(entry)
            .build()?)
    }

    fn list_entries_request(&self, user_id: &str) -> Result<Request, StoreError> {
        debug!(%user_id, "list_entries_request: called");
        let filter = format!("eq.{}", user_id);
        Ok(self
            .request(Method::GET, &self.entries_table)
            .query(&[
                ("select", "*"),
                ("user_id", filter.as_str()),
                ("order", "started_at.desc"),
            ])
            .build()?)
    }

    fn profile_lookup_request(&self, email: &str) -> Result<Request, StoreError> {
        debug!(%email, "profile_lookup_request: called");
        let filter = format!("eq.{}", email);
        Ok(self
            .request(Method::GET, &self.profiles_table)
            .query(&[("select", "*"), ("email", filter.as_str()), ("limit", "1")])
            .build()?)
    }

    fn profile_create_request(&self, email: &str) -> Result<Request, StoreError> {
        debug!(%email, "profile_create_request: called");
        Ok(self
            .request(Method::POST, &self.profiles_table)
            .header("Prefer", "return=representation")
            .json(&json!({ "id": Uuid::now_v7().to_string(), "email": email }))
            .build()?)
    }

    async fn send(&self, request: Request) -> Result<reqwest::Response, StoreError> {
        let method = request.method().clone();
        let url = request.url().clone();
        let response = self.http.execute(request).await?;
        let status = response.status();

        if !status.is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(%method, %url, status = status.as_u16(), %message, "send: store API error");
            return Err(StoreError::ApiError {
                status: status.as_u16(),
                message,
            });
        }

        debug!(%method, %url, status = status.as_u16(), "send: success");
        Ok(response)
    }

    async fn first_profile(response: reqwest::Response) -> Result<Option<Profile>, StoreError> {
        let body = response.text().await?;
        let rows: Vec<Profile> = serde_json::from_str(&body)?;
        Ok(rows.into_iter().next())
    }
}

#[async_trait]
impl EntryStore for RestStore {
    async fn insert(&self, entry: &NewTimeEntry) -> Result<(), StoreError> {
        debug!(id = %entry.id, table = %self.entries_table, "insert: called");
        let request = self.insert_request(entry)?;
        self.send(request).await?;
        info!(id = %entry.id, "Inserted time entry");
        Ok(())
    }

    async fn get_or_create_profile(&self, email: &str) -> Result<Profile, StoreError> {
        debug!(%email, "get_or_create_profile: called");
        if email.trim().is_empty() {
            return Err(StoreError::InvalidRequest(
                "User email is required to create a profile".to_string(),
            ));
        }

        let response = self.send(self.profile_lookup_request(email)?).await?;
        if let Some(profile) = Self::first_profile(response).await? {
            debug!(id = %profile.id, "get_or_create_profile: found existing profile");
            return Ok(profile);
        }

        debug!("get_or_create_profile: no profile, creating");
        let response = self.send(self.profile_create_request(email)?).await?;
        let profile = Self::first_profile(response)
            .await?
            .ok_or_else(|| StoreError::InvalidResponse("Profile insert returned no rows".to_string()))?;

        info!(id = %profile.id, "Created profile");
        Ok(profile)
    }

    async fn list_entries(&self, user_id: &str) -> Result<Vec<NewTimeEntry>, StoreError> {
        debug!(%user_id, table = %self.entries_table, "list_entries: called");
        if user_id.trim().is_empty() {
            return Err(StoreError::InvalidRequest("A profile is required to list entries".to_string()));
        }

        let response = self.send(self.list_entries_request(user_id)?).await?;
        let body = response.text().await?;
        let entries: Vec<NewTimeEntry> = serde_json::from_str(&body)?;
        debug!(count = entries.len(), "list_entries: fetched");
        Ok(entries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> RestStore {
        RestStore::new(RestStoreConfig::new("https://example.supabase.co/", "secret-key")).unwrap()
    }

    fn entry() -> NewTimeEntry {
        NewTimeEntry {
            id: Uuid::nil(),
            started_at: "2025-01-15T09:30:00-08:00".to_string(),
            timezone: "America/Los_Angeles".to_string(),
            duration: 90,
            location: "At Office".to_string(),
            topic: "review".to_string(),
            progress: "halfway".to_string(),
            project: "Apollo".to_string(),
            user_id: Some("p-1".to_string()),
            comments: None,
        }
    }

    #[test]
    fn test_rejects_missing_credentials() {
        let result = RestStore::new(RestStoreConfig::new("", "key"));
        assert!(matches!(result, Err(StoreError::NotConfigured(_))));

        let result = RestStore::new(RestStoreConfig::new("https://example.supabase.co", "  "));
        assert!(matches!(result, Err(StoreError::NotConfigured(_))));
    }

    #[test]
    fn test_insert_request_shape() {
        let request = store().insert_request(&entry()).unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(
            request.url().as_str(),
            "https://example.supabase.co/rest/v1/time_entries?on_conflict=id"
        );

        let headers = request.headers();
        assert_eq!(headers["apikey"], "secret-key");
        assert_eq!(headers["Authorization"], "Bearer secret-key");
        assert!(headers["Prefer"].to_str().unwrap().contains("ignore-duplicates"));

        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["duration"], 90);
        assert_eq!(json["user_id"], "p-1");
        assert!(json.get("comments").is_none());
    }

    #[test]
    fn test_custom_table_names() {
        let mut config = RestStoreConfig::new("https://example.supabase.co", "k");
        config.entries_table = "billable".to_string();
        let store = RestStore::new(config).unwrap();

        let request = store.insert_request(&entry()).unwrap();
        assert!(request.url().path().ends_with("/rest/v1/billable"));
    }

    #[test]
    fn test_profile_lookup_request_filters_by_email() {
        let request = store().profile_lookup_request("me@example.com").unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/profiles");
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert!(pairs.contains(&("email".to_string(), "eq.me@example.com".to_string())));
        assert!(pairs.contains(&("limit".to_string(), "1".to_string())));
    }

    #[test]
    fn test_list_entries_request_filters_and_orders() {
        let request = store().list_entries_request("p-1").unwrap();

        assert_eq!(request.method(), &Method::GET);
        assert_eq!(request.url().path(), "/rest/v1/time_entries");
        assert_eq!(request.headers()["apikey"], "secret-key");
        let pairs: Vec<(String, String)> = request.url().query_pairs().into_owned().collect();
        assert!(pairs.contains(&("user_id".to_string(), "eq.p-1".to_string())));
        assert!(pairs.contains(&("order".to_string(), "started_at.desc".to_string())));
    }

    #[test]
    fn test_entry_rows_tolerate_extra_columns() {
        let body = r#"[{
            "id": "00000000-0000-0000-0000-000000000000",
            "started_at": "2025-01-15T09:30:00-08:00",
            "timezone": "America/Los_Angeles",
            "duration": 90,
            "location": "At Office",
            "topic": "review",
            "progress": "halfway",
            "project": "Apollo",
            "user_id": "p-1",
            "comments": null,
            "created_at": "2025-01-15T18:00:00+00:00"
        }]"#;
        let rows: Vec<NewTimeEntry> = serde_json::from_str(body).unwrap();
        assert_eq!(rows, vec![entry()]);
    }

    #[tokio::test]
    async fn test_list_entries_requires_profile() {
        let result = store().list_entries(" ").await;
        assert!(matches!(result, Err(StoreError::InvalidRequest(_))));
    }

    #[test]
    fn test_profile_create_request_asks_for_representation() {
        let request = store().profile_create_request("me@example.com").unwrap();

        assert_eq!(request.method(), &Method::POST);
        assert_eq!(request.headers()["Prefer"], "return=representation");
        let body = request.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json["email"], "me@example.com");
        assert!(Uuid::parse_str(json["id"].as_str().unwrap()).is_ok());
    }
}
