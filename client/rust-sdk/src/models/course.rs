use serde::{Deserialize, Serialize};
use validator::Validate;

/// Course as served by the catalog endpoints. Lessons arrive embedded and
/// ordered by their `order` field.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Course {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub category: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub lessons: Vec<Lesson>,
}

impl Course {
    pub fn lesson_count(&self) -> usize {
        self.lessons.len()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Lesson {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "courseId", default)]
    pub course_id: String,
    pub title: String,
    /// Scripture reference, e.g. "John 1:1-18".
    #[serde(default)]
    pub scripture: String,
    #[serde(default)]
    pub order: u32,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,
    /// XP the server awards for first completion.
    #[serde(default)]
    pub xp: u32,
}

/// Payload for creating a course (admin)
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewCourse {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    #[validate(length(min = 1, message = "Category must not be empty"))]
    pub category: String,

    #[validate(length(min = 1, message = "Description must not be empty"))]
    pub description: String,
}

/// Payload for adding a lesson to a course (admin)
#[derive(Debug, Clone, Serialize, Validate)]
pub struct NewLesson {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Title must be between 1 and 200 characters"
    ))]
    pub title: String,

    pub scripture: String,

    pub order: u32,

    #[validate(length(min = 1, message = "Content must not be empty"))]
    pub content: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub image: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub audio: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub pdf: Option<String>,

    pub xp: u32,
}
