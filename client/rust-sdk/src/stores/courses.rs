use std::collections::{BTreeMap, BTreeSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockWriteGuard};

use futures::join;
use serde_json::{json, Value};
use validator::Validate;

use crate::api::ApiClient;
use crate::error::ClientError;
use crate::models::{Course, NewCourse, NewLesson};
use crate::scoring;
use crate::stores::AuthStore;
use crate::utils::retry::{retry_async_with_config, RetryConfig};

#[derive(Default)]
struct CourseState {
    catalog: Vec<Course>,
    enrolled: BTreeSet<String>,
    /// Course id to the set of completed lesson ids.
    completed: BTreeMap<String, BTreeSet<String>>,
}

/// Catalog, enrollment and lesson completion, all keyed off the session in
/// [`AuthStore`]. Everything that changes XP goes to the server first; the
/// only optimistic write is the provisional completion insert, which rolls
/// back if the server refuses it.
pub struct CourseStore {
    api: Arc<ApiClient>,
    auth: Arc<AuthStore>,
    state: RwLock<CourseState>,
}

impl CourseStore {
    pub fn new(api: Arc<ApiClient>, auth: Arc<AuthStore>) -> Self {
        CourseStore {
            api,
            auth,
            state: RwLock::new(CourseState::default()),
        }
    }

    /// Reloads catalog, enrollment and completion in one concurrent sweep.
    /// With nobody signed in this resolves to empty collections, not an
    /// error, and skips the network entirely.
    pub async fn refresh(&self) -> Result<(), ClientError> {
        if self.auth.current_user().is_none() {
            *self.write_state() = CourseState::default();
            return Ok(());
        }

        let catalog_fut = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("course/getCourses").await
        });
        let enrolled_fut = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("course/getEnrolled").await
        });
        let completed_fut = retry_async_with_config(RetryConfig::default(), || async {
            self.api.get("lesson/getCompleted").await
        });
        let (catalog, enrolled, completed) = join!(catalog_fut, enrolled_fut, completed_fut);

        let catalog = decode_courses(&catalog?)?;
        let enrolled = decode_enrolled(&enrolled?);
        let completed = decode_completed(&completed?);

        let mut state = self.write_state();
        state.catalog = catalog;
        state.enrolled = enrolled;
        state.completed = completed;
        Ok(())
    }

    /// Creates a course, then refreshes so ids and ordering come from the
    /// server. Admin only.
    pub async fn add_course(&self, course: &NewCourse) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        course.validate()?;
        self.api.post("course/createCourse", course).await?;
        self.refresh().await
    }

    pub async fn add_lesson(&self, course_id: &str, lesson: &NewLesson) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        lesson.validate()?;
        self.api
            .post(&format!("course/addLesson/{}", course_id), lesson)
            .await?;
        self.refresh().await
    }

    /// Deletes a course and prunes every local trace of it. Admin only.
    pub async fn delete_course(&self, course_id: &str) -> Result<(), ClientError> {
        self.auth.require_admin()?;
        self.api
            .delete(&format!("course/deleteCourse/{}", course_id))
            .await?;

        let mut state = self.write_state();
        state.catalog.retain(|course| course.id != course_id);
        state.enrolled.remove(course_id);
        state.completed.remove(course_id);
        Ok(())
    }

    /// Enrollment is recorded locally only after the server ack.
    pub async fn enroll(&self, course_id: &str) -> Result<(), ClientError> {
        self.auth.require_user()?;
        self.api
            .post_empty(&format!("course/enroll/{}", course_id))
            .await?;
        self.write_state().enrolled.insert(course_id.to_string());
        Ok(())
    }

    pub async fn unenroll(&self, course_id: &str) -> Result<(), ClientError> {
        self.auth.require_user()?;
        self.api
            .delete(&format!("course/unenroll/{}", course_id))
            .await?;
        self.write_state().enrolled.remove(course_id);
        Ok(())
    }

    /// Two-phase completion: the lesson joins the completed set provisionally,
    /// the server is told, and the insert rolls back if the call fails.
    /// Re-completing an already-completed lesson is a local no-op, so the set
    /// never holds a duplicate and this client never asks for the same XP
    /// twice.
    pub async fn mark_lesson_complete(
        &self,
        course_id: &str,
        lesson_id: &str,
    ) -> Result<(), ClientError> {
        self.auth.require_verified_user()?;

        let inserted = self
            .write_state()
            .completed
            .entry(course_id.to_string())
            .or_default()
            .insert(lesson_id.to_string());
        if !inserted {
            return Ok(());
        }

        let result = self
            .api
            .post(
                &format!("lesson/complete/{}", lesson_id),
                &json!({ "courseId": course_id }),
            )
            .await;

        if let Err(e) = result {
            let mut state = self.write_state();
            if let Some(set) = state.completed.get_mut(course_id) {
                set.remove(lesson_id);
                if set.is_empty() {
                    state.completed.remove(course_id);
                }
            }
            return Err(e);
        }

        // XP moved server-side; pick up the new totals quietly.
        if let Err(e) = self.auth.refresh_user().await {
            tracing::debug!("User refresh after lesson completion failed: {}", e);
        }
        Ok(())
    }

    /// Percentage of a course's lessons completed, rounded half up. Unknown
    /// courses and courses with no lessons report 0. Only completion entries
    /// that still name a lesson in the catalog count, so stale server entries
    /// can never push this past 100.
    pub fn get_course_progress(&self, course_id: &str) -> u8 {
        self.read_state(|state| {
            let Some(course) = state.catalog.iter().find(|c| c.id == course_id) else {
                return 0;
            };
            if course.lessons.is_empty() {
                return 0;
            }
            let completed = state.completed.get(course_id).map_or(0, |set| {
                course
                    .lessons
                    .iter()
                    .filter(|lesson| set.contains(&lesson.id))
                    .count()
            });
            scoring::percentage(completed, course.lessons.len())
        })
    }

    pub fn is_lesson_completed(&self, course_id: &str, lesson_id: &str) -> bool {
        self.read_state(|state| {
            state
                .completed
                .get(course_id)
                .is_some_and(|set| set.contains(lesson_id))
        })
    }

    pub fn catalog(&self) -> Vec<Course> {
        self.read_state(|state| state.catalog.clone())
    }

    pub fn get_course(&self, course_id: &str) -> Option<Course> {
        self.read_state(|state| state.catalog.iter().find(|c| c.id == course_id).cloned())
    }

    pub fn enrolled_courses(&self) -> Vec<Course> {
        self.read_state(|state| {
            state
                .catalog
                .iter()
                .filter(|course| state.enrolled.contains(&course.id))
                .cloned()
                .collect()
        })
    }

    pub fn is_enrolled(&self, course_id: &str) -> bool {
        self.read_state(|state| state.enrolled.contains(course_id))
    }

    pub fn completed_count(&self, course_id: &str) -> usize {
        self.read_state(|state| state.completed.get(course_id).map_or(0, |set| set.len()))
    }

    fn read_state<T>(&self, f: impl FnOnce(&CourseState) -> T) -> T {
        f(&self.state.read().unwrap_or_else(PoisonError::into_inner))
    }

    fn write_state(&self) -> RwLockWriteGuard<'_, CourseState> {
        self.state.write().unwrap_or_else(PoisonError::into_inner)
    }

    #[cfg(test)]
    pub(crate) fn seed_for_tests(
        &self,
        catalog: Vec<Course>,
        enrolled: &[&str],
        completed: &[(&str, &[&str])],
    ) {
        let mut state = self.write_state();
        state.catalog = catalog;
        state.enrolled = enrolled.iter().map(|id| id.to_string()).collect();
        state.completed = completed
            .iter()
            .map(|(course, lessons)| {
                (
                    course.to_string(),
                    lessons.iter().map(|id| id.to_string()).collect(),
                )
            })
            .collect();
    }
}

fn decode_courses(body: &Value) -> Result<Vec<Course>, ClientError> {
    let list = super::array_field(body, &["courses", "data"])
        .ok_or_else(|| ClientError::shape("no course list in response"))?;
    serde_json::from_value(list.clone())
        .map_err(|e| ClientError::shape(format!("course list did not decode: {}", e)))
}

/// Enrollment comes back either as ids or as populated course objects
/// depending on the backend version. Unknown entries are dropped rather than
/// failing the whole refresh.
fn decode_enrolled(body: &Value) -> BTreeSet<String> {
    let Some(list) = super::array_field(body, &["enrolled", "courses", "data"]) else {
        return BTreeSet::new();
    };
    list.as_array()
        .into_iter()
        .flatten()
        .filter_map(entry_id)
        .collect()
}

fn decode_completed(body: &Value) -> BTreeMap<String, BTreeSet<String>> {
    let Some(map) = body
        .get("completed")
        .or_else(|| body.get("progress"))
        .and_then(Value::as_object)
    else {
        return BTreeMap::new();
    };

    map.iter()
        .map(|(course_id, lessons)| {
            let set = lessons
                .as_array()
                .into_iter()
                .flatten()
                .filter_map(entry_id)
                .collect();
            (course_id.clone(), set)
        })
        .collect()
}

fn entry_id(value: &Value) -> Option<String> {
    match value {
        Value::String(id) => Some(id.clone()),
        Value::Object(map) => map.get("_id").and_then(Value::as_str).map(str::to_string),
        _ => None,
    }
}
