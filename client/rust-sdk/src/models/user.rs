use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

/// Account snapshot as returned by the auth endpoints.
///
/// The backend is authoritative for every field; the client only caches the
/// last snapshot it saw. Field renames follow the wire format, including the
/// irregular `IsAccVerified` spelling.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub role: Role,
    #[serde(rename = "IsAccVerified", default)]
    pub is_account_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bio: Option<String>,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub league: League,
    #[serde(default)]
    pub streak: u32,
    #[serde(default)]
    pub premium: bool,
}

impl User {
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

/// Account roles. Used for UI gating only; authorization is server-side.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum Role {
    #[default]
    Student,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &str {
        match self {
            Role::Student => "STUDENT",
            Role::Admin => "ADMIN",
        }
    }
}

/// Gamification tiers, lowest to highest. Ordering follows declaration order,
/// so `League::Gold > League::Silver` holds.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Default)]
#[serde(rename_all = "UPPERCASE")]
pub enum League {
    #[default]
    Bronze,
    Silver,
    Gold,
    Platinum,
    Diamond,
}

impl League {
    pub fn as_str(&self) -> &str {
        match self {
            League::Bronze => "BRONZE",
            League::Silver => "SILVER",
            League::Gold => "GOLD",
            League::Platinum => "PLATINUM",
            League::Diamond => "DIAMOND",
        }
    }
}

/// Request to create an account
#[derive(Debug, Clone, Serialize, Validate)]
pub struct SignupRequest {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub password: String,
}

/// Request to login
#[derive(Debug, Clone, Serialize, Validate)]
pub struct LoginRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(length(min = 1, message = "Password must not be empty"))]
    pub password: String,
}

/// One-time code confirming account ownership
#[derive(Debug, Clone, Serialize, Validate)]
pub struct VerifyOtpRequest {
    #[serde(rename = "userId")]
    pub user_id: String,

    #[validate(custom(function = "validate_otp"))]
    pub otp: String,
}

/// Request to set a new password after a reset code was issued
#[derive(Debug, Clone, Serialize, Validate)]
pub struct ResetPasswordRequest {
    #[validate(email(message = "Invalid email format"))]
    pub email: String,

    #[validate(custom(function = "validate_otp"))]
    pub otp: String,

    #[serde(rename = "newPassword")]
    #[validate(length(min = 8, message = "Password must be at least 8 characters"))]
    pub new_password: String,
}

/// Fields a user may edit on their own profile. `None` fields are left
/// untouched server-side.
#[derive(Debug, Clone, Default, Serialize, Validate)]
pub struct ProfileUpdate {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(
        min = 1,
        max = 100,
        message = "Name must be between 1 and 100 characters"
    ))]
    pub name: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    #[validate(length(max = 500, message = "Bio must be at most 500 characters"))]
    pub bio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

fn validate_otp(otp: &str) -> Result<(), ValidationError> {
    if otp.len() == 6 && otp.chars().all(|c| c.is_ascii_digit()) {
        Ok(())
    } else {
        let mut err = ValidationError::new("otp");
        err.message = Some("OTP must be exactly 6 digits".into());
        Err(err)
    }
}
