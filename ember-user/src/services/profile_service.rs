use chrono::{Datelike, NaiveDate, Utc};
use diesel::pg::PgConnection;
use diesel::prelude::*;
use uuid::Uuid;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::types::ProfileSummary;

use crate::models::{NewProfile, Profile};
use crate::schema::profiles;

pub const MIN_AGE: i32 = 18;
pub const MAX_AGE: i32 = 99;
pub const MAX_INTERESTS: usize = 10;
pub const MAX_INTEREST_CHARS: usize = 30;

pub fn find_by_user_id(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<Profile>> {
    Ok(profiles::table
        .filter(profiles::user_id.eq(user_id))
        .first::<Profile>(conn)
        .optional()?)
}

pub fn require_profile(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Profile> {
    find_by_user_id(conn, user_id)?
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))
}

/// Load the caller's profile, creating an empty one on first access.
pub fn get_or_create(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Profile> {
    if let Some(profile) = find_by_user_id(conn, user_id)? {
        return Ok(profile);
    }

    // A concurrent first request may have inserted the row already.
    let inserted = diesel::insert_into(profiles::table)
        .values(&NewProfile { user_id, last_active_at: Some(Utc::now()) })
        .on_conflict(profiles::user_id)
        .do_nothing()
        .get_result::<Profile>(conn)
        .optional()?;

    match inserted {
        Some(profile) => {
            tracing::info!(profile_id = %profile.id, user_id = %user_id, "default profile created");
            Ok(profile)
        }
        None => require_profile(conn, user_id),
    }
}

pub fn summary(profile: &Profile, is_online: bool) -> ProfileSummary {
    ProfileSummary {
        user_id: profile.user_id,
        display_name: profile.display_name.clone(),
        photo_url: profile.photo_list().into_iter().next(),
        age: age_today(profile.birth_date),
        is_online,
        is_premium: profile.has_active_premium(Utc::now()),
    }
}

/// Age in whole years on `today`.
pub fn age_on(birth_date: NaiveDate, today: NaiveDate) -> i32 {
    let mut age = today.year() - birth_date.year();
    if (today.month(), today.day()) < (birth_date.month(), birth_date.day()) {
        age -= 1;
    }
    age
}

pub fn age_today(birth_date: Option<NaiveDate>) -> Option<i32> {
    birth_date.map(|b| age_on(b, Utc::now().date_naive()))
}

pub fn validate_display_name(raw: &str) -> AppResult<String> {
    let name = raw.trim();
    let len = name.chars().count();
    if !(2..=30).contains(&len) {
        return Err(AppError::new(
            ErrorCode::InvalidDisplayName,
            "display name must be between 2 and 30 characters",
        ));
    }
    if !name
        .chars()
        .all(|c| c.is_alphanumeric() || c == ' ' || c == '_' || c == '-')
    {
        return Err(AppError::new(
            ErrorCode::InvalidDisplayName,
            "display name can only contain letters, numbers, spaces, underscores and hyphens",
        ));
    }
    Ok(name.to_string())
}

/// Trim, drop blanks and case-insensitive duplicates, keeping first spelling.
pub fn normalize_interests(raw: &[String]) -> AppResult<Vec<String>> {
    let mut seen = std::collections::HashSet::new();
    let mut out = Vec::new();
    for interest in raw {
        let trimmed = interest.trim();
        if trimmed.is_empty() {
            continue;
        }
        if trimmed.chars().count() > MAX_INTEREST_CHARS {
            return Err(AppError::new(
                ErrorCode::ValidationError,
                format!("interests must be at most {MAX_INTEREST_CHARS} characters"),
            ));
        }
        if seen.insert(trimmed.to_lowercase()) {
            out.push(trimmed.to_string());
        }
    }
    if out.len() > MAX_INTERESTS {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("at most {MAX_INTERESTS} interests are allowed"),
        ));
    }
    Ok(out)
}

pub fn validate_age_range(age_min: i32, age_max: i32) -> AppResult<()> {
    if age_min < MIN_AGE || age_max > MAX_AGE || age_min > age_max {
        return Err(AppError::new(
            ErrorCode::ValidationError,
            format!("age range must satisfy {MIN_AGE} <= age_min <= age_max <= {MAX_AGE}"),
        ));
    }
    Ok(())
}

pub fn parse_birth_date(raw: &str, today: NaiveDate) -> AppResult<NaiveDate> {
    let birth_date = NaiveDate::parse_from_str(raw, "%Y-%m-%d").map_err(|_| {
        AppError::new(ErrorCode::ValidationError, "invalid birth_date format, expected YYYY-MM-DD")
    })?;
    if birth_date > today {
        return Err(AppError::new(ErrorCode::ValidationError, "birth_date is in the future"));
    }
    if age_on(birth_date, today) < MIN_AGE {
        return Err(AppError::new(ErrorCode::Underage, "you must be at least 18 years old"));
    }
    Ok(birth_date)
}

/// Each profile's gender preference and age range accept the other.
pub fn are_mutually_discoverable(viewer: &Profile, candidate: &Profile, today: NaiveDate) -> bool {
    if !viewer.show_me().includes(candidate.gender()) || !candidate.show_me().includes(viewer.gender()) {
        return false;
    }
    let (Some(viewer_bd), Some(candidate_bd)) = (viewer.birth_date, candidate.birth_date) else {
        return false;
    };
    let viewer_age = age_on(viewer_bd, today);
    let candidate_age = age_on(candidate_bd, today);
    (viewer.age_min..=viewer.age_max).contains(&candidate_age)
        && (candidate.age_min..=candidate.age_max).contains(&viewer_age)
}

/// Interests both profiles list, compared case-insensitively, in `ours` order.
pub fn shared_interests(ours: &[String], theirs: &[String]) -> Vec<String> {
    let theirs: std::collections::HashSet<String> = theirs.iter().map(|i| i.to_lowercase()).collect();
    ours.iter()
        .filter(|i| theirs.contains(&i.to_lowercase()))
        .cloned()
        .collect()
}

/// `proposed` reorders `current` without adding or dropping any entry.
pub fn is_permutation(current: &[String], proposed: &[String]) -> bool {
    if current.len() != proposed.len() {
        return false;
    }
    let mut a: Vec<&String> = current.iter().collect();
    let mut b: Vec<&String> = proposed.iter().collect();
    a.sort();
    b.sort();
    a == b
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::fixtures;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn age_counts_birthday() {
        assert_eq!(age_on(date(2000, 6, 15), date(2025, 6, 14)), 24);
        assert_eq!(age_on(date(2000, 6, 15), date(2025, 6, 15)), 25);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 2, 28)), 24);
        assert_eq!(age_on(date(2000, 2, 29), date(2025, 3, 1)), 25);
    }

    #[test]
    fn display_name_rules() {
        assert_eq!(validate_display_name("  Sam  ").unwrap(), "Sam");
        assert_eq!(validate_display_name("Anne-Marie O").unwrap(), "Anne-Marie O");
        assert!(validate_display_name("S").is_err());
        assert!(validate_display_name("bad<script>").is_err());
        assert!(validate_display_name(&"x".repeat(31)).is_err());
    }

    #[test]
    fn interests_are_trimmed_and_deduplicated() {
        let raw = vec![" Hiking ".to_string(), "hiking".into(), "".into(), "Jazz".into()];
        assert_eq!(normalize_interests(&raw).unwrap(), vec!["Hiking", "Jazz"]);
    }

    #[test]
    fn too_many_interests_rejected() {
        let raw: Vec<String> = (0..11).map(|i| format!("topic{i}")).collect();
        assert!(normalize_interests(&raw).is_err());
    }

    #[test]
    fn age_range_bounds() {
        assert!(validate_age_range(18, 99).is_ok());
        assert!(validate_age_range(30, 25).is_err());
        assert!(validate_age_range(17, 30).is_err());
    }

    #[test]
    fn minors_cannot_onboard() {
        let today = date(2025, 1, 1);
        let err = parse_birth_date("2010-05-05", today).unwrap_err();
        assert_eq!(err.code(), Some(ErrorCode::Underage));
        assert!(parse_birth_date("1990-05-05", today).is_ok());
        assert!(parse_birth_date("05/05/1990", today).is_err());
    }

    #[test]
    fn discoverability_is_mutual() {
        let today = date(2025, 1, 1);
        let mut viewer = fixtures::profile();
        viewer.gender = Some("man".into());
        viewer.show_me = "women".into();

        let mut candidate = fixtures::profile();
        candidate.gender = Some("woman".into());
        candidate.show_me = "men".into();
        assert!(are_mutually_discoverable(&viewer, &candidate, today));

        candidate.show_me = "women".into();
        assert!(!are_mutually_discoverable(&viewer, &candidate, today));
    }

    #[test]
    fn discoverability_respects_age_ranges() {
        let today = date(2025, 1, 1);
        let mut viewer = fixtures::profile();
        viewer.birth_date = Some(date(1995, 1, 1));
        viewer.age_max = 25;
        let mut candidate = fixtures::profile();
        candidate.birth_date = Some(date(1990, 1, 1));
        assert!(!are_mutually_discoverable(&viewer, &candidate, today));

        viewer.age_max = 40;
        candidate.age_min = 31;
        assert!(!are_mutually_discoverable(&viewer, &candidate, today));
    }

    #[test]
    fn shared_interests_ignore_case() {
        let ours = vec!["Jazz".to_string(), "Hiking".into(), "Chess".into()];
        let theirs = vec!["hiking".to_string(), "jazz".into()];
        assert_eq!(shared_interests(&ours, &theirs), vec!["Jazz", "Hiking"]);
    }

    #[test]
    fn summary_uses_first_photo() {
        let p = fixtures::profile();
        let s = summary(&p, true);
        assert_eq!(s.photo_url.as_deref(), Some("http://localhost:9000/ember-media/a.jpg"));
        assert!(s.is_online);
        assert!(!s.is_premium);
        assert!(s.age.is_some_and(|a| a >= 29));
    }

    #[test]
    fn photo_order_must_be_permutation() {
        let current = vec!["a".to_string(), "b".into(), "c".into()];
        assert!(is_permutation(&current, &["c".into(), "a".into(), "b".into()]));
        assert!(!is_permutation(&current, &["a".into(), "b".into()]));
        assert!(!is_permutation(&current, &["a".into(), "b".into(), "d".into()]));
    }
}
