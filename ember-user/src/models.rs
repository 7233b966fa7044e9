use chrono::{DateTime, NaiveDate, Utc};
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::schema::profiles;

// --- Gender / ShowMe ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Gender {
    Man,
    Woman,
    Nonbinary,
}

impl Gender {
    pub fn as_str(&self) -> &'static str {
        match self {
            Gender::Man => "man",
            Gender::Woman => "woman",
            Gender::Nonbinary => "nonbinary",
        }
    }
}

impl std::str::FromStr for Gender {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "man" => Ok(Gender::Man),
            "woman" => Ok(Gender::Woman),
            "nonbinary" => Ok(Gender::Nonbinary),
            _ => Err(format!("unknown gender: {s}")),
        }
    }
}

/// Who a user wants to be shown in discovery.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ShowMe {
    Men,
    Women,
    Everyone,
}

impl ShowMe {
    pub fn as_str(&self) -> &'static str {
        match self {
            ShowMe::Men => "men",
            ShowMe::Women => "women",
            ShowMe::Everyone => "everyone",
        }
    }

    /// Unknown genders are only shown to `Everyone`.
    pub fn includes(&self, gender: Option<Gender>) -> bool {
        match (self, gender) {
            (ShowMe::Everyone, _) => true,
            (ShowMe::Men, Some(Gender::Man)) => true,
            (ShowMe::Women, Some(Gender::Woman)) => true,
            _ => false,
        }
    }
}

impl std::str::FromStr for ShowMe {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "men" => Ok(ShowMe::Men),
            "women" => Ok(ShowMe::Women),
            "everyone" => Ok(ShowMe::Everyone),
            _ => Err(format!("unknown show_me value: {s}")),
        }
    }
}

// --- Profile ---

#[derive(Debug, Queryable, Identifiable, Selectable, Serialize, Clone)]
#[diesel(table_name = profiles)]
pub struct Profile {
    pub id: Uuid,
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub bio: Option<String>,
    pub birth_date: Option<NaiveDate>,
    pub gender: Option<String>,
    pub show_me: String,
    pub interests: serde_json::Value,
    pub photos: serde_json::Value,
    pub latitude: Option<f64>,
    pub longitude: Option<f64>,
    pub location_name: Option<String>,
    pub age_min: i32,
    pub age_max: i32,
    pub max_distance_km: i32,
    pub onboarding_complete: bool,
    pub is_premium: bool,
    pub premium_plan: Option<String>,
    pub premium_until: Option<DateTime<Utc>>,
    pub last_active_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Profile {
    pub fn interest_list(&self) -> Vec<String> {
        string_list(&self.interests)
    }

    pub fn photo_list(&self) -> Vec<String> {
        string_list(&self.photos)
    }

    pub fn gender(&self) -> Option<Gender> {
        self.gender.as_deref().and_then(|g| g.parse().ok())
    }

    pub fn show_me(&self) -> ShowMe {
        self.show_me.parse().unwrap_or(ShowMe::Everyone)
    }

    /// Premium flag that has not lapsed at `now`.
    pub fn has_active_premium(&self, now: DateTime<Utc>) -> bool {
        self.is_premium && self.premium_until.map_or(true, |until| until > now)
    }
}

fn string_list(value: &serde_json::Value) -> Vec<String> {
    value
        .as_array()
        .map(|items| {
            items
                .iter()
                .filter_map(|v| v.as_str().map(str::to_string))
                .collect()
        })
        .unwrap_or_default()
}

#[derive(Debug, Insertable)]
#[diesel(table_name = profiles)]
pub struct NewProfile {
    pub user_id: Uuid,
    pub last_active_at: Option<DateTime<Utc>>,
}

#[derive(Debug, AsChangeset, Default)]
#[diesel(table_name = profiles)]
pub struct ProfileChanges {
    pub bio: Option<String>,
    pub gender: Option<String>,
    pub show_me: Option<String>,
    pub interests: Option<serde_json::Value>,
    pub location_name: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    pub max_distance_km: Option<i32>,
}

#[cfg(test)]
pub(crate) mod fixtures {
    use super::*;

    /// A complete, onboarded profile for tests to tweak.
    pub fn profile() -> Profile {
        let now = Utc::now();
        Profile {
            id: Uuid::now_v7(),
            user_id: Uuid::now_v7(),
            display_name: Some("Alex".into()),
            bio: Some("Coffee, climbing and bad puns.".into()),
            birth_date: NaiveDate::from_ymd_opt(1995, 6, 15),
            gender: Some("woman".into()),
            show_me: "everyone".into(),
            interests: serde_json::json!(["climbing", "coffee", "jazz"]),
            photos: serde_json::json!([
                "http://localhost:9000/ember-media/a.jpg",
                "http://localhost:9000/ember-media/b.jpg",
                "http://localhost:9000/ember-media/c.jpg"
            ]),
            latitude: Some(48.8566),
            longitude: Some(2.3522),
            location_name: Some("Paris".into()),
            age_min: 18,
            age_max: 99,
            max_distance_km: 50,
            onboarding_complete: true,
            is_premium: false,
            premium_plan: None,
            premium_until: None,
            last_active_at: Some(now),
            created_at: now,
            updated_at: now,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    #[test]
    fn show_me_filters_by_gender() {
        assert!(ShowMe::Women.includes(Some(Gender::Woman)));
        assert!(!ShowMe::Women.includes(Some(Gender::Man)));
        assert!(!ShowMe::Men.includes(None));
        assert!(ShowMe::Everyone.includes(Some(Gender::Nonbinary)));
        assert!(ShowMe::Everyone.includes(None));
    }

    #[test]
    fn premium_lapses_after_until() {
        let now = Utc::now();
        let mut p = fixtures::profile();
        assert!(!p.has_active_premium(now));

        p.is_premium = true;
        assert!(p.has_active_premium(now));

        p.premium_until = Some(now - Duration::hours(1));
        assert!(!p.has_active_premium(now));
    }

    #[test]
    fn json_lists_ignore_non_strings() {
        let mut p = fixtures::profile();
        p.interests = serde_json::json!(["hiking", 3, null, "films"]);
        assert_eq!(p.interest_list(), vec!["hiking", "films"]);
        p.photos = serde_json::json!({"not": "a list"});
        assert!(p.photo_list().is_empty());
    }
}
