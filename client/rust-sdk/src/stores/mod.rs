use serde_json::Value;

pub mod auth;
pub mod blog;
pub mod courses;
pub mod family;
pub mod leaderboard;
pub mod premium;
pub mod quiz;

pub use auth::AuthStore;
pub use blog::BlogStore;
pub use courses::CourseStore;
pub use family::FamilyStore;
pub use leaderboard::LeaderboardStore;
pub use premium::PremiumStore;
pub use quiz::QuizStore;

/// Finds the list inside a response body. The backend has wrapped its arrays
/// under different keys across deployments, and a couple of endpoints return
/// a bare array with no envelope at all, so every list-shaped response goes
/// through this probe.
pub(crate) fn array_field<'a>(body: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    if body.is_array() {
        return Some(body);
    }
    keys.iter()
        .find_map(|key| body.get(*key))
        .filter(|value| value.is_array())
}
