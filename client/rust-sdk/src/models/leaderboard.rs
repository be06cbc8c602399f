use serde::{Deserialize, Serialize};

use crate::models::League;

/// Row in the individual leaderboard. The backend occasionally omits the
/// gamification fields for fresh accounts, so everything defaults.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LeaderboardEntry {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub xp: u64,
    #[serde(default)]
    pub league: League,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub avatar: Option<String>,
    #[serde(default)]
    pub premium: bool,
}
