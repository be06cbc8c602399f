use std::sync::Arc;

use serde_json::Value;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::LeaderboardEntry;
use crate::stores::AuthStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

/// Individual standings. The family variant lives in
/// [`crate::stores::FamilyStore`] because it reuses the family record.
pub struct LeaderboardStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
}

impl LeaderboardStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        LeaderboardStore { api, auth }
    }

    /// Current standings, XP descending. Signed out resolves to an empty
    /// list, matching the auth gating of the other read paths.
    pub async fn individual(&self) -> Result<Vec<LeaderboardEntry>, ClientError> {
        if self.auth.current_user().is_none() {
            return Ok(Vec::new());
        }

        let body = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("leaderboard/getLeaderboard").await
        })
        .await?;

        let mut entries = decode_entries(&body)?;
        entries.sort_by(|a, b| b.xp.cmp(&a.xp));
        Ok(entries)
    }
}

fn decode_entries(body: &Value) -> Result<Vec<LeaderboardEntry>, ClientError> {
    let list = super::array_field(body, &["leaderboard", "data"])
        .ok_or_else(|| ClientError::shape("no leaderboard in response"))?;
    serde_json::from_value(list.clone())
        .map_err(|e| ClientError::shape(format!("leaderboard did not decode: {}", e)))
}
