use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

/// Upper bound on media attachments per post.
pub const MAX_BLOG_MEDIA: usize = 3;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlogPost {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default = "default_author")]
    pub author: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub media: Vec<String>,
    /// Creation time; the backend has served this both as an RFC 3339 string
    /// and as epoch milliseconds, and sometimes not at all.
    #[serde(rename = "createdAt", default, with = "flexible_datetime")]
    pub created_at: Option<DateTime<Utc>>,
}

fn default_author() -> String {
    "Admin".to_string()
}

/// Payload for creating or replacing a post (admin). Sent as multipart so the
/// media bytes ride along with the text fields.
#[derive(Debug, Clone, Validate)]
pub struct NewBlogPost {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,

    #[validate(length(max = 3, message = "A post can carry at most 3 media files"))]
    pub media: Vec<BlogMedia>,
}

#[derive(Debug, Clone, Serialize)]
pub struct BlogMedia {
    pub file_name: String,
    pub mime_type: String,
    pub bytes: Vec<u8>,
}

// Serde converter tolerating RFC 3339 strings, epoch milliseconds, or nothing.
pub(crate) mod flexible_datetime {
    use chrono::{DateTime, Utc};
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn serialize<S>(date: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match date {
            Some(d) => serializer.serialize_str(&d.to_rfc3339()),
            None => serializer.serialize_none(),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let value: Option<serde_json::Value> = Option::deserialize(deserializer)?;
        Ok(value.and_then(parse))
    }

    fn parse(value: serde_json::Value) -> Option<DateTime<Utc>> {
        match value {
            serde_json::Value::String(s) => DateTime::parse_from_rfc3339(&s)
                .map(|dt| dt.with_timezone(&Utc))
                .ok(),
            serde_json::Value::Number(n) => n.as_i64().and_then(DateTime::from_timestamp_millis),
            _ => None,
        }
    }
}
