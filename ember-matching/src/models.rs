use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::{matches, streaks, swipes};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SwipeAction {
    Like,
    Pass,
    Superlike,
}

impl SwipeAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            SwipeAction::Like => "like",
            SwipeAction::Pass => "pass",
            SwipeAction::Superlike => "superlike",
        }
    }

    /// Like or superlike.
    pub fn is_positive(&self) -> bool {
        matches!(self, SwipeAction::Like | SwipeAction::Superlike)
    }
}

impl std::str::FromStr for SwipeAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "like" => Ok(SwipeAction::Like),
            "pass" => Ok(SwipeAction::Pass),
            "superlike" | "super_like" => Ok(SwipeAction::Superlike),
            _ => Err(format!("unknown swipe action: {s}")),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MatchStatus {
    Pending,
    Mutual,
    Rejected,
    Unmatched,
}

impl MatchStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            MatchStatus::Pending => "pending",
            MatchStatus::Mutual => "mutual",
            MatchStatus::Rejected => "rejected",
            MatchStatus::Unmatched => "unmatched",
        }
    }
}

impl std::str::FromStr for MatchStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(MatchStatus::Pending),
            "mutual" => Ok(MatchStatus::Mutual),
            "rejected" => Ok(MatchStatus::Rejected),
            "unmatched" => Ok(MatchStatus::Unmatched),
            _ => Err(format!("unknown match status: {s}")),
        }
    }
}

// --- Swipe ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = swipes)]
pub struct Swipe {
    pub id: Uuid,
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub action: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Swipe {
    pub fn action(&self) -> Option<SwipeAction> {
        self.action.parse().ok()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = swipes)]
pub struct NewSwipe<'a> {
    pub swiper_id: Uuid,
    pub swiped_id: Uuid,
    pub action: &'a str,
}

// --- Match (one row per direction) ---

#[derive(Debug, Queryable, Identifiable, Serialize, Clone)]
#[diesel(table_name = matches)]
pub struct Match {
    pub id: Uuid,
    pub user_id: Uuid,
    pub other_user_id: Uuid,
    pub status: String,
    pub initiated_by: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub matched_at: Option<DateTime<Utc>>,
}

impl Match {
    pub fn status(&self) -> Option<MatchStatus> {
        self.status.parse().ok()
    }
}

#[derive(Debug, Insertable)]
#[diesel(table_name = matches)]
pub struct NewMatch<'a> {
    pub user_id: Uuid,
    pub other_user_id: Uuid,
    pub status: &'a str,
    pub initiated_by: Uuid,
    pub matched_at: Option<DateTime<Utc>>,
}

// --- Streak ---

#[derive(Debug, Queryable, Identifiable, Insertable, AsChangeset, Serialize, Clone, PartialEq)]
#[diesel(table_name = streaks, primary_key(user_id), treat_none_as_null = true)]
pub struct Streak {
    pub user_id: Uuid,
    pub current_streak: i32,
    pub longest_streak: i32,
    pub last_active_date: Option<NaiveDate>,
    pub likes_used: i32,
    pub superlikes_used: i32,
    pub likes_reset_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn swipe_action_parsing() {
        assert_eq!("LIKE".parse::<SwipeAction>().unwrap(), SwipeAction::Like);
        assert_eq!("super_like".parse::<SwipeAction>().unwrap(), SwipeAction::Superlike);
        assert!("wink".parse::<SwipeAction>().is_err());
        assert!(!SwipeAction::Pass.is_positive());
        assert!(SwipeAction::Superlike.is_positive());
    }

    #[test]
    fn match_status_roundtrips_through_str() {
        for status in [
            MatchStatus::Pending,
            MatchStatus::Mutual,
            MatchStatus::Rejected,
            MatchStatus::Unmatched,
        ] {
            assert_eq!(status.as_str().parse::<MatchStatus>().unwrap(), status);
        }
    }
}
