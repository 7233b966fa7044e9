use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};

use ember_shared::types::profile::{CandidateProfile, DiscoveryViewer};

// -- Weights: shared interests dominate, then proximity --
const W_INTERESTS: f64 = 0.50;
const W_DISTANCE: f64 = 0.25;
const W_AGE: f64 = 0.15;
const W_ACTIVITY: f64 = 0.10;

const DISTANCE_DECAY_KM: f64 = 50.0;
const AGE_SPAN_YEARS: f64 = 30.0;
const MIN_FACTOR: f64 = 0.05;
const NEUTRAL: f64 = 0.5;

fn normalized(interests: &[String]) -> HashSet<String> {
    interests
        .iter()
        .map(|i| i.trim().to_lowercase())
        .filter(|i| !i.is_empty())
        .collect()
}

/// Jaccard similarity of two interest lists, ignoring case and padding.
pub fn interest_overlap(a: &[String], b: &[String]) -> f64 {
    let a = normalized(a);
    let b = normalized(b);
    let union = a.union(&b).count();
    if union == 0 {
        return 0.0;
    }
    a.intersection(&b).count() as f64 / union as f64
}

/// 0 km → 1.0, 50 km → ~0.37, 150+ km → 0.05. Unknown → neutral.
pub fn distance_factor(distance_km: Option<f64>) -> f64 {
    match distance_km {
        Some(km) => (-km / DISTANCE_DECAY_KM).exp().clamp(MIN_FACTOR, 1.0),
        None => NEUTRAL,
    }
}

/// Same age → 1.0, 15 years apart → 0.5. Unknown → neutral.
pub fn age_factor(age_a: Option<i32>, age_b: Option<i32>) -> f64 {
    match (age_a, age_b) {
        (Some(a), Some(b)) => {
            let diff = (a - b).abs() as f64;
            (1.0 - diff / AGE_SPAN_YEARS).clamp(MIN_FACTOR, 1.0)
        }
        _ => NEUTRAL,
    }
}

pub fn activity_factor(last_active_at: Option<DateTime<Utc>>, now: DateTime<Utc>) -> f64 {
    match last_active_at.map(|t| now - t) {
        Some(idle) if idle <= Duration::hours(24) => 1.0,
        Some(idle) if idle <= Duration::days(7) => 0.6,
        _ => 0.3,
    }
}

/// Compatibility of `candidate` for `viewer` on a 0..=100 scale.
pub fn compatibility_score(
    viewer: &DiscoveryViewer,
    candidate: &CandidateProfile,
    distance_km: Option<f64>,
    now: DateTime<Utc>,
) -> u8 {
    let score = W_INTERESTS * interest_overlap(&viewer.interests, &candidate.interests)
        + W_DISTANCE * distance_factor(distance_km)
        + W_AGE * age_factor(viewer.age, candidate.summary.age)
        + W_ACTIVITY * activity_factor(candidate.last_active_at, now);

    (score * 100.0).round().clamp(0.0, 100.0) as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use ember_shared::types::profile::ProfileSummary;
    use uuid::Uuid;

    fn strings(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    fn viewer(interests: &[&str], age: i32) -> DiscoveryViewer {
        DiscoveryViewer {
            user_id: Uuid::now_v7(),
            age: Some(age),
            interests: strings(interests),
            latitude: Some(48.85),
            longitude: Some(2.35),
            max_distance_km: 50,
            is_premium: false,
        }
    }

    fn candidate(interests: &[&str], age: i32, last_active_at: Option<DateTime<Utc>>) -> CandidateProfile {
        CandidateProfile {
            summary: ProfileSummary {
                user_id: Uuid::now_v7(),
                display_name: Some("Robin".into()),
                photo_url: None,
                age: Some(age),
                is_online: false,
                is_premium: false,
            },
            bio: None,
            interests: strings(interests),
            latitude: None,
            longitude: None,
            last_active_at,
        }
    }

    #[test]
    fn overlap_is_jaccard_and_case_insensitive() {
        let a = strings(&["Hiking", "jazz", "chess"]);
        let b = strings(&["hiking ", "Jazz", "films"]);
        assert!((interest_overlap(&a, &b) - 0.5).abs() < 1e-9);
        assert_eq!(interest_overlap(&[], &[]), 0.0);
        assert_eq!(interest_overlap(&a, &[]), 0.0);
    }

    #[test]
    fn distance_factor_decays_and_clamps() {
        assert!((distance_factor(Some(0.0)) - 1.0).abs() < 1e-9);
        assert!((distance_factor(Some(50.0)) - (-1.0f64).exp()).abs() < 1e-9);
        assert_eq!(distance_factor(Some(5_000.0)), MIN_FACTOR);
        assert_eq!(distance_factor(None), NEUTRAL);
    }

    #[test]
    fn age_factor_bounds() {
        assert_eq!(age_factor(Some(30), Some(30)), 1.0);
        assert!((age_factor(Some(30), Some(45)) - 0.5).abs() < 1e-9);
        assert_eq!(age_factor(Some(18), Some(80)), MIN_FACTOR);
        assert_eq!(age_factor(None, Some(30)), NEUTRAL);
    }

    #[test]
    fn activity_buckets() {
        let now = Utc::now();
        assert_eq!(activity_factor(Some(now - Duration::hours(2)), now), 1.0);
        assert_eq!(activity_factor(Some(now - Duration::days(3)), now), 0.6);
        assert_eq!(activity_factor(Some(now - Duration::days(30)), now), 0.3);
        assert_eq!(activity_factor(None, now), 0.3);
    }

    #[test]
    fn perfect_candidate_scores_100() {
        let now = Utc::now();
        let v = viewer(&["climbing", "jazz"], 30);
        let c = candidate(&["jazz", "climbing"], 30, Some(now));
        assert_eq!(compatibility_score(&v, &c, Some(0.0), now), 100);
    }

    #[test]
    fn shared_interests_outrank_proximity() {
        let now = Utc::now();
        let v = viewer(&["climbing", "jazz", "films"], 30);
        let far_but_aligned = candidate(&["climbing", "jazz", "films"], 30, Some(now));
        let near_but_different = candidate(&["golf"], 30, Some(now));

        let aligned = compatibility_score(&v, &far_but_aligned, Some(200.0), now);
        let different = compatibility_score(&v, &near_but_different, Some(1.0), now);
        assert!(aligned > different, "{aligned} <= {different}");
    }
}
