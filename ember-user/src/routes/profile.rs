use axum::extract::{Path, State};
use axum::Json;
use chrono::Utc;
use diesel::prelude::*;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use uuid::Uuid;
use validator::Validate;

use ember_shared::errors::{AppError, AppResult, ErrorCode};
use ember_shared::geo::{self, GeoPoint};
use ember_shared::types::auth::AuthUser;
use ember_shared::types::ApiResponse;

use crate::events::publisher;
use crate::models::{Gender, Profile, ProfileChanges, ShowMe};
use crate::schema::profiles;
use crate::services::completeness::{calculate_profile_completeness, Completeness};
use crate::services::profile_service;
use crate::AppState;

#[derive(Debug, Serialize)]
pub struct MyProfileResponse {
    #[serde(flatten)]
    pub profile: Profile,
    pub age: Option<i32>,
    pub completeness: Completeness,
}

impl From<Profile> for MyProfileResponse {
    fn from(profile: Profile) -> Self {
        Self {
            age: profile_service::age_today(profile.birth_date),
            completeness: calculate_profile_completeness(&profile),
            profile,
        }
    }
}

// --- GET /me ---

pub async fn get_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<MyProfileResponse>>> {
    let mut conn = state.db.get()?;

    let profile = profile_service::get_or_create(&mut conn, user.id)?;
    let profile = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set(profiles::last_active_at.eq(Some(Utc::now())))
        .get_result::<Profile>(&mut conn)?;

    if let Err(e) = state.redis.mark_online(&user.id).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to refresh presence");
    }

    Ok(Json(ApiResponse::ok(profile.into())))
}

// --- PATCH /me ---

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateProfileRequest {
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: Option<String>,
    pub gender: Option<Gender>,
    pub show_me: Option<ShowMe>,
    pub interests: Option<Vec<String>>,
    #[validate(length(max = 100, message = "location name must be at most 100 characters"))]
    pub location_name: Option<String>,
    pub age_min: Option<i32>,
    pub age_max: Option<i32>,
    #[validate(range(min = 1, max = 500, message = "max distance must be between 1 and 500 km"))]
    pub max_distance_km: Option<i32>,
}

pub async fn update_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateProfileRequest>,
) -> AppResult<Json<ApiResponse<MyProfileResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let mut conn = state.db.get()?;
    let profile = profile_service::get_or_create(&mut conn, user.id)?;

    if req.age_min.is_some() || req.age_max.is_some() {
        profile_service::validate_age_range(
            req.age_min.unwrap_or(profile.age_min),
            req.age_max.unwrap_or(profile.age_max),
        )?;
    }

    let interests = match &req.interests {
        Some(raw) => Some(serde_json::json!(profile_service::normalize_interests(raw)?)),
        None => None,
    };

    let changes = ProfileChanges {
        bio: req.bio.map(|b| b.trim().to_string()),
        gender: req.gender.map(|g| g.as_str().to_string()),
        show_me: req.show_me.map(|s| s.as_str().to_string()),
        interests,
        location_name: req.location_name.map(|l| l.trim().to_string()),
        age_min: req.age_min,
        age_max: req.age_max,
        max_distance_km: req.max_distance_km,
    };

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((&changes, profiles::updated_at.eq(Utc::now())))
        .get_result::<Profile>(&mut conn)?;

    tracing::debug!(user_id = %user.id, "profile updated");

    Ok(Json(ApiResponse::ok(updated.into())))
}

// --- DELETE /me ---

#[derive(Debug, Serialize)]
pub struct DeletedResponse {
    pub deleted: bool,
}

pub async fn delete_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<DeletedResponse>>> {
    let mut conn = state.db.get()?;
    let profile = profile_service::require_profile(&mut conn, user.id)?;

    diesel::delete(profiles::table.filter(profiles::id.eq(profile.id))).execute(&mut conn)?;
    drop(conn);

    for url in profile.photo_list() {
        if let Err(e) = state.storage.delete_by_url(&url).await {
            tracing::warn!(error = %e, url = %url, "failed to delete stored photo");
        }
    }

    if let Err(e) = state.redis.mark_offline(&user.id).await {
        tracing::warn!(error = %e, user_id = %user.id, "failed to clear presence");
    }

    publisher::publish_profile_deleted(&state.rabbitmq, user.id).await;
    metrics::counter!("profiles_deleted_total").increment(1);

    tracing::info!(user_id = %user.id, "profile deleted");

    Ok(Json(ApiResponse::ok_with_message(DeletedResponse { deleted: true }, "profile deleted")))
}

// --- POST /onboarding ---

#[derive(Debug, Deserialize, Validate)]
pub struct OnboardingRequest {
    pub display_name: String,
    pub birth_date: String,
    pub gender: Gender,
    pub show_me: ShowMe,
    #[serde(default)]
    pub interests: Vec<String>,
    #[validate(length(max = 500, message = "bio must be at most 500 characters"))]
    pub bio: Option<String>,
}

pub async fn complete_onboarding(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<OnboardingRequest>,
) -> AppResult<Json<ApiResponse<MyProfileResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let display_name = profile_service::validate_display_name(&req.display_name)?;
    let birth_date = profile_service::parse_birth_date(&req.birth_date, Utc::now().date_naive())?;
    let interests = profile_service::normalize_interests(&req.interests)?;

    let mut conn = state.db.get()?;
    let profile = profile_service::get_or_create(&mut conn, user.id)?;

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            profiles::display_name.eq(&display_name),
            profiles::birth_date.eq(birth_date),
            profiles::gender.eq(req.gender.as_str()),
            profiles::show_me.eq(req.show_me.as_str()),
            profiles::interests.eq(serde_json::json!(interests)),
            profiles::bio.eq(req.bio.as_deref().map(str::trim)),
            profiles::onboarding_complete.eq(true),
            profiles::updated_at.eq(Utc::now()),
        ))
        .get_result::<Profile>(&mut conn)?;

    tracing::info!(
        user_id = %user.id,
        display_name = %display_name,
        "onboarding completed"
    );

    Ok(Json(ApiResponse::ok(updated.into())))
}

// --- PUT /location ---

#[derive(Debug, Deserialize, Validate)]
pub struct UpdateLocationRequest {
    pub latitude: f64,
    pub longitude: f64,
    #[validate(length(max = 100, message = "location name must be at most 100 characters"))]
    pub location_name: Option<String>,
}

pub async fn update_location(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Json(req): Json<UpdateLocationRequest>,
) -> AppResult<Json<ApiResponse<MyProfileResponse>>> {
    req.validate().map_err(|e| AppError::Validation(e.to_string()))?;

    let point = GeoPoint::new(req.latitude, req.longitude).ok_or_else(|| {
        AppError::new(
            ErrorCode::InvalidLocation,
            "latitude must be within [-90, 90] and longitude within [-180, 180]",
        )
    })?;

    let mut conn = state.db.get()?;
    let profile = profile_service::get_or_create(&mut conn, user.id)?;

    let location_name = req
        .location_name
        .as_deref()
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .map(str::to_string)
        .or(profile.location_name.clone());

    let updated = diesel::update(profiles::table.filter(profiles::id.eq(profile.id)))
        .set((
            profiles::latitude.eq(Some(point.latitude)),
            profiles::longitude.eq(Some(point.longitude)),
            profiles::location_name.eq(location_name),
            profiles::updated_at.eq(Utc::now()),
        ))
        .get_result::<Profile>(&mut conn)?;

    Ok(Json(ApiResponse::ok(updated.into())))
}

// --- GET /me/completeness ---

pub async fn get_completeness(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<Completeness>>> {
    let mut conn = state.db.get()?;
    let profile = profile_service::get_or_create(&mut conn, user.id)?;
    Ok(Json(ApiResponse::ok(calculate_profile_completeness(&profile))))
}

// --- GET /profiles/:user_id ---

#[derive(Debug, Serialize)]
pub struct PublicProfile {
    pub user_id: Uuid,
    pub display_name: Option<String>,
    pub age: Option<i32>,
    pub gender: Option<String>,
    pub bio: Option<String>,
    pub interests: Vec<String>,
    pub photos: Vec<String>,
    pub location_name: Option<String>,
    pub distance_km: Option<i32>,
    pub shared_interests: Vec<String>,
    pub is_premium: bool,
    pub is_online: bool,
}

pub async fn get_public_profile(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(user_id): Path<Uuid>,
) -> AppResult<Json<ApiResponse<PublicProfile>>> {
    let mut conn = state.db.get()?;

    let profile = profile_service::find_by_user_id(&mut conn, user_id)?
        .filter(|p| p.onboarding_complete)
        .ok_or_else(|| AppError::new(ErrorCode::ProfileNotFound, "profile not found"))?;
    let viewer = profile_service::find_by_user_id(&mut conn, user.id)?;
    drop(conn);

    let own_location = GeoPoint::from_options(profile.latitude, profile.longitude);
    let (distance_km, shared_interests) = match &viewer {
        Some(v) => (
            geo::distance_between(GeoPoint::from_options(v.latitude, v.longitude), own_location)
                .map(geo::round_distance_km),
            profile_service::shared_interests(&profile.interest_list(), &v.interest_list()),
        ),
        None => (None, vec![]),
    };

    let is_online = state
        .redis
        .exists(&ember_shared::clients::redis::presence_key(&user_id))
        .await
        .unwrap_or(false);

    Ok(Json(ApiResponse::ok(PublicProfile {
        user_id: profile.user_id,
        display_name: profile.display_name.clone(),
        age: profile_service::age_today(profile.birth_date),
        gender: profile.gender.clone(),
        bio: profile.bio.clone(),
        interests: profile.interest_list(),
        photos: profile.photo_list(),
        location_name: profile.location_name.clone(),
        distance_km,
        shared_interests,
        is_premium: profile.has_active_premium(Utc::now()),
        is_online,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn update_with_bio(chars: usize) -> UpdateProfileRequest {
        serde_json::from_value(serde_json::json!({ "bio": "é".repeat(chars) })).unwrap()
    }

    #[test]
    fn bio_is_limited_to_500_characters() {
        assert!(update_with_bio(500).validate().is_ok());
        let errors = update_with_bio(501).validate().unwrap_err();
        assert!(errors.field_errors().contains_key("bio"));
    }
}
