use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use crate::models::League;

/// Study group whose members' XP aggregates for the group leaderboard.
///
/// Depending on the endpoint, `members` arrives either populated or as bare
/// id strings; [`MemberRef`] absorbs both.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Family {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub members: Vec<MemberRef>,
    #[serde(default)]
    pub xp: u64,
}

impl Family {
    pub fn contains(&self, user_id: &str) -> bool {
        self.members.iter().any(|member| member.id() == user_id)
    }

    pub fn member_count(&self) -> usize {
        self.members.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MemberRef {
    Populated(FamilyMember),
    Id(String),
}

impl MemberRef {
    pub fn id(&self) -> &str {
        match self {
            MemberRef::Populated(member) => &member.id,
            MemberRef::Id(id) => id,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FamilyMember {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub league: League,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
}

/// Payload for `POST /family/createFamily`
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewFamily {
    #[validate(length(
        min = 1,
        max = 100,
        message = "Family name must be between 1 and 100 characters"
    ))]
    pub name: String,

    #[serde(rename = "memberEmails")]
    #[validate(custom(function = "validate_member_emails"))]
    pub member_emails: Vec<String>,
}

fn validate_member_emails(emails: &[String]) -> Result<(), ValidationError> {
    use validator::ValidateEmail;

    for email in emails {
        if !email.validate_email() {
            let mut err = ValidationError::new("email");
            err.message = Some(format!("Invalid member email: {}", email).into());
            return Err(err);
        }
    }
    Ok(())
}
