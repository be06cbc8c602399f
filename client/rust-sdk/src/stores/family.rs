use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde_json::{json, Value};
use validator::{Validate, ValidateEmail};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Family, NewFamily};
use crate::stores::AuthStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

#[derive(Default)]
struct FamilyState {
    family: Option<Family>,
    leaderboard: Vec<Family>,
    loading: bool,
}

/// Family membership and the family leaderboard. The backend has no "my
/// family" endpoint, so membership is derived by scanning the full family
/// list for the signed-in user's id.
pub struct FamilyStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
    state: RwLock<FamilyState>,
}

impl FamilyStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        FamilyStore {
            api,
            auth,
            state: RwLock::new(FamilyState::default()),
        }
    }

    /// Re-derives the signed-in user's family from the full list. Signed out
    /// means no family and no network call.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        let Some(user_id) = self.auth.user_id() else {
            self.write_state().family = None;
            return Ok(());
        };

        self.set_loading(true);
        let result = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("family/getFamilies").await
        })
        .await;
        self.set_loading(false);

        let families = decode_families(&result?)?;
        let mine = families.into_iter().find(|family| family.contains(&user_id));
        self.write_state().family = mine;
        Ok(())
    }

    /// Family standings, XP descending. The backend does not guarantee an
    /// order, so the sort happens here.
    pub async fn refresh_leaderboard(&self) -> Result<Vec<Family>, ClientError> {
        let body = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("family/famLeaderboard").await
        })
        .await?;

        let mut families = decode_families(&body)?;
        families.sort_by(|a, b| b.xp.cmp(&a.xp));
        self.write_state().leaderboard = families.clone();
        Ok(families)
    }

    pub async fn get_family(&self, family_id: &str) -> Result<Family, ClientError> {
        let body = self
            .api
            .get(&format!("family/getFamily/{}", family_id))
            .await?;
        decode_family(&body)
    }

    /// Create-then-join: the backend does not add the creator as a member, so
    /// the store joins right after creating and then re-fetches the canonical
    /// record. Join and re-fetch failures are logged and swallowed; the
    /// family from the create step stands, so a successful create always
    /// yields a family.
    pub async fn create_family(
        &self,
        name: &str,
        member_emails: Vec<String>,
    ) -> Result<Family, ClientError> {
        self.auth.require_user()?;
        let request = NewFamily {
            name: name.trim().to_string(),
            member_emails,
        };
        request.validate()?;

        let body = self.api.post("family/createFamily", &request).await?;
        let created = decode_family(&body)?;

        if let Err(e) = self
            .api
            .post_empty(&format!("family/addMember/{}", created.id))
            .await
        {
            tracing::warn!("Joining the new family failed, keeping create result: {}", e);
        }

        let family = match self.get_family(&created.id).await {
            Ok(canonical) => canonical,
            Err(e) => {
                tracing::warn!(
                    "Re-fetching the new family failed, keeping create result: {}",
                    e
                );
                created
            }
        };

        self.write_state().family = Some(family.clone());
        Ok(family)
    }

    /// Adds a member by email, then re-fetches the canonical record instead
    /// of patching membership locally. Aggregate XP moves with membership and
    /// only the server knows the new total.
    pub async fn add_member(&self, family_id: &str, email: &str) -> Result<Family, ClientError> {
        self.auth.require_user()?;
        let trimmed = email.trim();
        if !trimmed.validate_email() {
            return Err(ClientError::validation("Invalid email format"));
        }

        self.api
            .post(
                &format!("family/addMember/{}", family_id),
                &json!({ "email": trimmed }),
            )
            .await?;

        let family = self.get_family(family_id).await?;
        {
            let mut state = self.write_state();
            if state.family.as_ref().is_some_and(|f| f.id == family.id) {
                state.family = Some(family.clone());
            }
        }
        Ok(family)
    }

    /// Leaves the current family. Local membership clears on the server ack
    /// and a fresh scan settles the canonical answer.
    pub async fn leave_family(&self) -> Result<(), ClientError> {
        self.auth.require_user()?;
        let family_id = self
            .read_state(|state| state.family.as_ref().map(|f| f.id.clone()))
            .ok_or_else(|| ClientError::validation("Not in a family"))?;

        self.api
            .delete(&format!("family/leaveFamily/{}", family_id))
            .await?;

        self.write_state().family = None;
        if let Err(e) = self.refresh().await {
            tracing::debug!("Family refresh after leaving failed: {}", e);
        }
        Ok(())
    }

    pub fn family(&self) -> Option<Family> {
        self.read_state(|state| state.family.clone())
    }

    pub fn leaderboard(&self) -> Vec<Family> {
        self.read_state(|state| state.leaderboard.clone())
    }

    pub fn is_loading(&self) -> bool {
        self.read_state(|state| state.loading)
    }

    fn set_loading(&self, loading: bool) {
        self.write_state().loading = loading;
    }

    fn read_state<T>(&self, f: impl FnOnce(&FamilyState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, FamilyState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }
}

fn decode_families(body: &Value) -> Result<Vec<Family>, ClientError> {
    let list = super::array_field(body, &["families", "leaderboard", "data"])
        .ok_or_else(|| ClientError::shape("no family list in response"))?;
    serde_json::from_value(list.clone())
        .map_err(|e| ClientError::shape(format!("family list did not decode: {}", e)))
}

fn decode_family(body: &Value) -> Result<Family, ClientError> {
    let candidate = body
        .get("family")
        .or_else(|| body.get("data"))
        .unwrap_or(body);

    if candidate.get("_id").is_none() {
        return Err(ClientError::shape("no family object in response"));
    }

    serde_json::from_value(candidate.clone())
        .map_err(|e| ClientError::shape(format!("family object did not decode: {}", e)))
}
