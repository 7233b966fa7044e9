use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Compact profile card shared between services.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProfileSummary {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub photo_url: Option<String>,
    pub age: Option<i32>,
    pub is_online: bool,
    pub is_premium: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchProfilesRequest {
    pub user_ids: Vec<Uuid>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesRequest {
    pub user_id: Uuid,
    #[serde(default)]
    pub exclude: Vec<Uuid>,
    pub limit: i64,
}

/// The discovering user's own attributes and preferences.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryViewer {
    pub user_id: Uuid,
    pub age: Option<i32>,
    pub interests: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub max_distance_km: i32,
    pub is_premium: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidateProfile {
    #[serde(flatten)]
    pub summary: ProfileSummary,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub last_active_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CandidatesResponse {
    pub viewer: DiscoveryViewer,
    pub candidates: Vec<CandidateProfile>,
}
