use serde::Serialize;

use crate::models::Profile;

const PHOTO_POINTS: u32 = 10;
const COUNTED_PHOTOS: usize = 3;
const INTEREST_POINTS: u32 = 5;
const COUNTED_INTERESTS: usize = 3;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Completeness {
    pub score: u32,
    pub missing: Vec<&'static str>,
}

/// Score a profile out of 100 and name every field short of its full weight.
pub fn calculate_profile_completeness(profile: &Profile) -> Completeness {
    let mut score = 0;
    let mut missing = Vec::new();

    let mut award = |field: &'static str, earned: u32, full: u32| {
        score += earned;
        if earned < full {
            missing.push(field);
        }
    };

    let has_text = |v: &Option<String>| v.as_deref().is_some_and(|s| !s.trim().is_empty());

    award("display_name", if has_text(&profile.display_name) { 10 } else { 0 }, 10);
    award("birth_date", if profile.birth_date.is_some() { 10 } else { 0 }, 10);
    award("bio", if has_text(&profile.bio) { 15 } else { 0 }, 15);
    award("gender", if profile.gender().is_some() { 5 } else { 0 }, 5);
    award("show_me", if profile.onboarding_complete { 5 } else { 0 }, 5);

    let photos = profile.photo_list().len().min(COUNTED_PHOTOS) as u32;
    award("photos", photos * PHOTO_POINTS, COUNTED_PHOTOS as u32 * PHOTO_POINTS);

    let interests = profile.interest_list().len().min(COUNTED_INTERESTS) as u32;
    award(
        "interests",
        interests * INTEREST_POINTS,
        COUNTED_INTERESTS as u32 * INTEREST_POINTS,
    );

    let located = profile.latitude.is_some() && profile.longitude.is_some();
    award("location", if located { 10 } else { 0 }, 10);

    Completeness { score, missing }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    #[test]
    fn full_profile_scores_100() {
        let c = calculate_profile_completeness(&fixtures::profile());
        assert_eq!(c.score, 100);
        assert!(c.missing.is_empty());
    }

    #[test]
    fn fresh_profile_scores_zero() {
        let mut p = fixtures::profile();
        p.display_name = None;
        p.bio = None;
        p.birth_date = None;
        p.gender = None;
        p.onboarding_complete = false;
        p.photos = serde_json::json!([]);
        p.interests = serde_json::json!([]);
        p.latitude = None;
        p.longitude = None;

        let c = calculate_profile_completeness(&p);
        assert_eq!(c.score, 0);
        assert_eq!(c.missing.len(), 8);
    }

    #[test]
    fn partial_photos_and_interests() {
        let mut p = fixtures::profile();
        p.photos = serde_json::json!(["http://x/1.jpg"]);
        p.interests = serde_json::json!(["a", "b", "c", "d", "e"]);
        let c = calculate_profile_completeness(&p);
        assert_eq!(c.score, 80);
        assert_eq!(c.missing, vec!["photos"]);
    }

    #[test]
    fn blank_bio_is_missing() {
        let mut p = fixtures::profile();
        p.bio = Some("   ".into());
        let c = calculate_profile_completeness(&p);
        assert_eq!(c.score, 85);
        assert_eq!(c.missing, vec!["bio"]);
    }
}
