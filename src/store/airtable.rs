//! Airtable-compatible record store backend.
//!
//! Speaks the tabular-record API: filter-formula queries with multi-key sort
//! parameters, offset-token pagination, and per-record PATCH writes, all
//! bearer-authenticated.

use async_trait::async_trait;
use reqwest::{header, Client};
use serde::Deserialize;
use serde_json::json;
use tracing::{debug, info};

use super::traits::{RoadmapStore, StoreError};
use crate::config::AirtableConfig;
use crate::roadmap::{self, Record};
use crate::types::{Roadmap, TaskStatus, UserProfile, PLACEHOLDER_USERNAME};

/// Page size requested from the store; pagination continues past it.
const PAGE_SIZE: u32 = 100;

/// One page of a list response.
#[derive(Debug, Deserialize)]
struct RecordPage {
    #[serde(default)]
    records: Vec<Record>,
    /// Continuation token, present while more pages remain
    offset: Option<String>,
}

/// Record store backed by the Airtable API.
pub struct AirtableStore {
    client: Client,
    config: AirtableConfig,
}

impl AirtableStore {
    /// Create a store client for the configured base.
    pub fn new(config: AirtableConfig) -> Self {
        let client = Client::builder()
            .build()
            .expect("Failed to create HTTP client");

        Self { client, config }
    }

    fn auth_header(&self) -> String {
        format!("Bearer {}", self.config.api_key)
    }

    /// Fetch every record of a table matching `filter`, following offset
    /// tokens until the store reports no continuation.
    async fn list_records(
        &self,
        table: &str,
        filter: Option<&str>,
        sorts: &[(&str, &str)],
    ) -> Result<Vec<Record>, StoreError> {
        let url = self.config.table_url(table);

        let mut params: Vec<(String, String)> = Vec::new();
        if let Some(filter) = filter {
            params.push(("filterByFormula".to_string(), filter.to_string()));
        }
        for (index, (field, direction)) in sorts.iter().enumerate() {
            params.push((format!("sort[{index}][field]"), (*field).to_string()));
            params.push((format!("sort[{index}][direction]"), (*direction).to_string()));
        }
        params.push(("pageSize".to_string(), PAGE_SIZE.to_string()));

        let mut all_records = Vec::new();
        let mut offset: Option<String> = None;

        loop {
            let mut request = self
                .client
                .get(&url)
                .header(header::AUTHORIZATION, self.auth_header())
                .query(&params);

            if let Some(offset) = &offset {
                request = request.query(&[("offset", offset.as_str())]);
            }

            let response = request
                .send()
                .await
                .map_err(|e| StoreError::Network(e.to_string()))?;

            let status = response.status();
            if !status.is_success() {
                let body = response.text().await.unwrap_or_default();
                return Err(StoreError::RequestFailed {
                    status: status.as_u16(),
                    body,
                });
            }

            let page: RecordPage = response
                .json()
                .await
                .map_err(|e| StoreError::Parse(e.to_string()))?;

            all_records.extend(page.records);

            match page.offset {
                Some(token) => offset = Some(token),
                None => break,
            }
        }

        debug!(table, count = all_records.len(), "Fetched records");
        Ok(all_records)
    }

    /// PATCH one record's fields and return the updated record.
    async fn patch_record(
        &self,
        table: &str,
        record_id: &str,
        fields: serde_json::Value,
    ) -> Result<Record, StoreError> {
        let response = self
            .client
            .patch(self.config.record_url(table, record_id))
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    /// POST a new record and return it.
    async fn create_record(
        &self,
        table: &str,
        fields: serde_json::Value,
    ) -> Result<Record, StoreError> {
        let response = self
            .client
            .post(self.config.table_url(table))
            .header(header::AUTHORIZATION, self.auth_header())
            .json(&json!({ "fields": fields }))
            .send()
            .await
            .map_err(|e| StoreError::Network(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(StoreError::RequestFailed {
                status: status.as_u16(),
                body,
            });
        }

        response
            .json()
            .await
            .map_err(|e| StoreError::Parse(e.to_string()))
    }

    fn profile_from_record(user_id: &str, record: &Record) -> UserProfile {
        let username = record
            .fields
            .get("UserName")
            .and_then(|v| v.as_str())
            .filter(|s| !s.trim().is_empty())
            .unwrap_or(PLACEHOLDER_USERNAME)
            .to_string();

        UserProfile {
            record_id: record.id.clone(),
            user_id: user_id.to_string(),
            username,
        }
    }

    fn user_filter(user_id: &str) -> String {
        format!("{{UserID}} = '{user_id}'")
    }
}

#[async_trait]
impl RoadmapStore for AirtableStore {
    async fn fetch_roadmap(&self, user_id: &str) -> Result<Option<Roadmap>, StoreError> {
        debug!(user_id, "Fetching roadmap data");

        let records = self
            .list_records(
                &self.config.progress_table,
                Some(&Self::user_filter(user_id)),
                &[("Week", "asc"), ("TaskID", "asc")],
            )
            .await?;

        Ok(roadmap::assemble(user_id, &records))
    }

    async fn set_task_status(
        &self,
        record_id: &str,
        status: TaskStatus,
    ) -> Result<(), StoreError> {
        info!(record_id, status = status.as_str(), "Updating task status");

        self.patch_record(
            &self.config.progress_table,
            record_id,
            json!({ "Status": status.as_str() }),
        )
        .await?;

        Ok(())
    }

    async fn fetch_profile(&self, user_id: &str) -> Result<Option<UserProfile>, StoreError> {
        let records = self
            .list_records(
                &self.config.users_table,
                Some(&Self::user_filter(user_id)),
                &[],
            )
            .await?;

        Ok(records
            .first()
            .map(|record| Self::profile_from_record(user_id, record)))
    }

    async fn ensure_profile(&self, user_id: &str) -> Result<UserProfile, StoreError> {
        if let Some(profile) = self.fetch_profile(user_id).await? {
            return Ok(profile);
        }

        info!(user_id, "Creating placeholder user profile");
        let record = self
            .create_record(
                &self.config.users_table,
                json!({ "UserID": user_id, "UserName": PLACEHOLDER_USERNAME }),
            )
            .await?;

        Ok(Self::profile_from_record(user_id, &record))
    }

    async fn update_username(
        &self,
        user_id: &str,
        username: &str,
    ) -> Result<UserProfile, StoreError> {
        let profile = self
            .fetch_profile(user_id)
            .await?
            .ok_or_else(|| StoreError::RecordNotFound(user_id.to_string()))?;

        info!(user_id, "Updating username");
        let record = self
            .patch_record(
                &self.config.users_table,
                &profile.record_id,
                json!({ "UserName": username }),
            )
            .await?;

        Ok(Self::profile_from_record(user_id, &record))
    }

    async fn count_users(&self) -> Result<usize, StoreError> {
        let records = self.list_records(&self.config.users_table, None, &[]).await?;
        Ok(records.len())
    }
}
