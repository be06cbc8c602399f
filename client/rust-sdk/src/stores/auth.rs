use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use serde_json::{json, Value};
use validator::{Validate, ValidateEmail};

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{
    LoginRequest, ProfileUpdate, ResetPasswordRequest, SignupRequest, User, VerifyOtpRequest,
};
use crate::storage::SnapshotStorage;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

#[derive(Default)]
struct AuthState {
    user: Option<User>,
    needs_verification: bool,
    loading: bool,
}

/// Session owner. Holds the signed-in user, mirrors it to the snapshot cache
/// and drives every credential flow. The other stores hold a reference and
/// consult it before touching the network.
pub struct AuthStore {
    api: Arc<ApiClient>,
    storage: Arc<dyn SnapshotStorage>,
    state: RwLock<AuthState>,
}

impl AuthStore {
    pub fn new(api: Arc<ApiClient>, storage: Arc<dyn SnapshotStorage>) -> Self {
        AuthStore {
            api,
            storage,
            state: RwLock::new(AuthState::default()),
        }
    }

    /// Startup sequence: surface the cached snapshot immediately, then settle
    /// on what the server says. A transport failure keeps the cached user so
    /// an offline start still shows the last known session; a definitive
    /// "no session" answer clears it everywhere.
    pub async fn bootstrap(&self) {
        self.set_loading(true);

        match self.storage.load_user().await {
            Ok(Some(cached)) => {
                tracing::debug!("Using cached snapshot for {}", cached.email);
                self.install_user(cached);
            }
            Ok(None) => {}
            Err(e) => tracing::warn!("Could not read cached user snapshot: {}", e),
        }

        match self.check_session().await {
            Ok(Some(user)) => {
                self.persist_snapshot(&user).await;
                self.install_user(user);
            }
            Ok(None) => self.clear_user_everywhere().await,
            Err(e) => {
                tracing::warn!("Session check failed, keeping cached fallback: {}", e);
            }
        }

        self.set_loading(false);
    }

    /// Asks the server whether the cookie still names a live session.
    /// `Ok(None)` is a definitive no from the server; transport problems stay
    /// errors so the caller can tell "signed out" from "unreachable".
    async fn check_session(&self) -> Result<Option<User>, ClientError> {
        let alive = retry_async_with_config(RetryConfig::startup(), || async {
            match self.api.get("auth/is-auth").await {
                Ok(_) => Ok(true),
                Err(ClientError::Api { .. }) => Ok(false),
                Err(e) => Err(e),
            }
        })
        .await?;

        if !alive {
            return Ok(None);
        }

        let user = self.fetch_user_data().await?;
        Ok(Some(user))
    }

    pub async fn signup(&self, name: &str, email: &str, password: &str) -> Result<User, ClientError> {
        let request = SignupRequest {
            name: name.trim().to_string(),
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let body = self.api.post("auth/register", &request).await?;
        let user = match decode_user(&body) {
            Ok(user) => user,
            // Some deployments only ack the signup; fetch the canonical record.
            Err(_) => self.fetch_user_data().await?,
        };

        self.persist_snapshot(&user).await;
        self.install_user(user.clone());
        tracing::info!("Registered {}", user.email);
        Ok(user)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<User, ClientError> {
        let request = LoginRequest {
            email: email.trim().to_string(),
            password: password.to_string(),
        };
        request.validate()?;

        let body = self.api.post("auth/login", &request).await?;
        let user = match decode_user(&body) {
            Ok(user) => user,
            Err(_) => self.fetch_user_data().await?,
        };

        self.persist_snapshot(&user).await;
        self.install_user(user.clone());
        tracing::info!("Signed in as {}", user.email);
        Ok(user)
    }

    /// Optimistic sign-out: local state and the cached snapshot are cleared
    /// before the server call, so callers observe a signed-out client
    /// immediately. The server call is best-effort and its failure is only
    /// logged, never returned.
    pub async fn logout(&self) {
        self.clear_user_everywhere().await;

        if let Err(e) = self.api.post_empty("auth/logout").await {
            tracing::warn!("Server logout failed (local state already cleared): {}", e);
        }
    }

    pub async fn send_verification_otp(&self) -> Result<(), ClientError> {
        self.require_user()?;
        self.api.post_empty("auth/send-verify-otp").await?;
        Ok(())
    }

    /// Confirms the emailed 6-digit code. On success the verification gate
    /// lifts and the canonical user record is re-fetched.
    pub async fn verify_otp(&self, otp: &str) -> Result<User, ClientError> {
        let user = self.require_user()?;
        let request = VerifyOtpRequest {
            user_id: user.id,
            otp: otp.trim().to_string(),
        };
        request.validate()?;

        self.api.post("auth/verify-account", &request).await?;
        self.refresh_user().await
    }

    pub async fn send_reset_otp(&self, email: &str) -> Result<(), ClientError> {
        let trimmed = email.trim();
        if !trimmed.validate_email() {
            return Err(ClientError::validation("Invalid email format"));
        }
        self.api
            .post("auth/send-reset-otp", &json!({ "email": trimmed }))
            .await?;
        Ok(())
    }

    pub async fn reset_password(
        &self,
        email: &str,
        otp: &str,
        new_password: &str,
    ) -> Result<(), ClientError> {
        let request = ResetPasswordRequest {
            email: email.trim().to_string(),
            otp: otp.trim().to_string(),
            new_password: new_password.to_string(),
        };
        request.validate()?;
        self.api.post("auth/reset-password", &request).await?;
        Ok(())
    }

    /// Re-fetches the canonical user record and rewrites the snapshot. XP,
    /// league and premium flags all move server-side, so this is the one way
    /// local state catches up.
    pub async fn refresh_user(&self) -> Result<User, ClientError> {
        self.require_user()?;
        let user = self.fetch_user_data().await?;
        self.persist_snapshot(&user).await;
        self.install_user(user.clone());
        Ok(user)
    }

    /// Pushes profile edits, then trusts the server record rather than
    /// merging locally. Responses from this endpoint have been inconsistent
    /// about echoing the updated user.
    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ClientError> {
        self.require_user()?;
        update.validate()?;
        self.api.post("user/update-profile", update).await?;
        self.refresh_user().await
    }

    /// Asks the server to recompute the league from current XP.
    pub async fn update_badge(&self) -> Result<(), ClientError> {
        self.require_user()?;
        self.api.post_empty("user/updateBadge").await?;
        Ok(())
    }

    pub fn current_user(&self) -> Option<User> {
        self.read_state(|state| state.user.clone())
    }

    pub fn user_id(&self) -> Option<String> {
        self.read_state(|state| state.user.as_ref().map(|user| user.id.clone()))
    }

    pub fn is_admin(&self) -> bool {
        self.read_state(|state| state.user.as_ref().is_some_and(User::is_admin))
    }

    pub fn needs_verification(&self) -> bool {
        self.read_state(|state| state.needs_verification)
    }

    pub fn is_loading(&self) -> bool {
        self.read_state(|state| state.loading)
    }

    pub fn require_user(&self) -> Result<User, ClientError> {
        self.current_user().ok_or(ClientError::NotAuthenticated)
    }

    /// Gate for XP-earning actions: signed in and past email verification.
    pub fn require_verified_user(&self) -> Result<User, ClientError> {
        let user = self.require_user()?;
        if !user.is_account_verified {
            return Err(ClientError::VerificationRequired);
        }
        Ok(user)
    }

    pub fn require_admin(&self) -> Result<User, ClientError> {
        let user = self.require_user()?;
        if !user.is_admin() {
            return Err(ClientError::Forbidden("Admin role required".to_string()));
        }
        Ok(user)
    }

    async fn fetch_user_data(&self) -> Result<User, ClientError> {
        let body = self.api.post_empty("auth/get-user-data").await?;
        decode_user(&body)
    }

    fn install_user(&self, user: User) {
        let mut state = self.write_state();
        state.needs_verification = !user.is_account_verified;
        state.user = Some(user);
    }

    async fn clear_user_everywhere(&self) {
        {
            let mut state = self.write_state();
            state.user = None;
            state.needs_verification = false;
        }
        if let Err(e) = self.storage.clear_user().await {
            tracing::warn!("Could not clear cached user snapshot: {}", e);
        }
    }

    async fn persist_snapshot(&self, user: &User) {
        if let Err(e) = self.storage.save_user(user).await {
            tracing::warn!("Could not persist user snapshot: {}", e);
        }
    }

    fn set_loading(&self, loading: bool) {
        self.write_state().loading = loading;
    }

    fn read_state<T>(&self, f: impl FnOnce(&AuthState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, AuthState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn seed_user_for_tests(&self, user: User) {
        self.install_user(user);
    }
}

/// Pulls the user object out of an auth response. Deployments have nested it
/// under `user`, under `userData`, or returned it at the top level, so all
/// three spots are probed before giving up.
fn decode_user(body: &Value) -> Result<User, ClientError> {
    let candidate = body
        .get("user")
        .or_else(|| body.get("userData"))
        .unwrap_or(body);

    if candidate.get("_id").is_none() {
        return Err(ClientError::shape("no user object in response"));
    }

    serde_json::from_value(candidate.clone())
        .map_err(|e| ClientError::shape(format!("user object did not decode: {}", e)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn wire_user(id: &str) -> Value {
        json!({
            "_id": id,
            "name": "Ana",
            "email": "ana@example.com",
            "IsAccVerified": true,
            "xp": 40,
            "league": "BRONZE",
            "streak": 2,
            "premium": false
        })
    }

    #[test]
    fn test_decode_user_probes_known_nestings() {
        let raw = wire_user("u1");

        let nested = json!({ "success": true, "user": raw });
        assert_eq!(decode_user(&nested).unwrap().id, "u1");

        let legacy = json!({ "success": true, "userData": raw });
        assert_eq!(decode_user(&legacy).unwrap().id, "u1");

        assert_eq!(decode_user(&raw).unwrap().id, "u1");
    }

    #[test]
    fn test_decode_user_rejects_bodies_without_a_user() {
        let body = json!({ "success": true, "message": "ok" });
        assert!(matches!(
            decode_user(&body),
            Err(ClientError::Shape(_))
        ));
    }
}
