use std::sync::Arc;

use serde_json::{json, Value};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::PremiumPlan;
use crate::stores::AuthStore;

/// Premium checkout. The client's whole job here is to open a checkout
/// session and hand back the hosted payment page URL; everything after that
/// happens between the user and the payment provider.
pub struct PremiumStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
}

impl PremiumStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        PremiumStore { api, auth }
    }

    /// Opens a checkout session for the signed-in user. The `pkg` field is
    /// the plan length in days, which is what the backend keys its prices on.
    pub async fn checkout(&self, plan: PremiumPlan) -> Result<String, ClientError> {
        let user = self.auth.require_user()?;
        let body = self
            .api
            .post(
                "premium/buy-premium",
                &json!({ "userId": user.id, "pkg": plan.days() }),
            )
            .await?;

        body.get("url")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| ClientError::shape("no checkout url in response"))
    }
}
