// Profile handlers - `me` get-or-create plus the narrowed profile collection
// Non-staff callers only ever see their own profile; anyone else's reads as 404.

use axum::{
    extract::State,
    http::{Method, StatusCode},
    Json,
};
use tracing::info;

use crate::{
    app_state::AppState,
    database::BlogDatabase,
    entities::ProfileChanges,
    error::{AppError, AppResult},
    framework::{
        extract::{ApiJson, ApiPath},
        privacy::PROFILE_POLICY,
        validation::{check_max_len, check_url, FieldErrors},
    },
    infrastructure::{middleware::Vc, viewer::ViewerContext},
    models::{ProfileRecord, ProfileView, ProfileWrite},
    services::PostViewerService,
};

pub async fn get_my_profile(State(state): State<AppState>, vc: Vc) -> AppResult<Json<ProfileView>> {
    PROFILE_POLICY.check_request(&vc, &Method::GET)?;
    let user_id = vc.require_user()?;

    let profile = state.db.get_or_create_profile(user_id).await?;
    Ok(Json(profile_view(&state, profile).await?))
}

/// PUT and PATCH both apply only the fields sent.
pub async fn update_my_profile(
    State(state): State<AppState>,
    vc: Vc,
    method: Method,
    ApiJson(payload): ApiJson<ProfileWrite>,
) -> AppResult<Json<ProfileView>> {
    PROFILE_POLICY.check_request(&vc, &method)?;
    let user_id = vc.require_user()?;
    let changes = validate(payload)?;

    let profile = state.db.get_or_create_profile(user_id).await?;
    state.db.update_profile(profile.id, &changes).await?;
    info!(request_id = %vc.request_id, profile_id = profile.id, "own profile updated");

    let profile = load_profile(&state.db, &vc, profile.id).await?;
    Ok(Json(profile_view(&state, profile).await?))
}

pub async fn list_profiles(State(state): State<AppState>, vc: Vc) -> AppResult<Json<Vec<ProfileView>>> {
    PROFILE_POLICY.check_request(&vc, &Method::GET)?;

    let profiles = state.db.list_profiles(visible_owner(&vc)).await?;
    let views = PostViewerService::new(state.db.clone()).profile_views(profiles).await?;
    Ok(Json(views))
}

/// Creates the caller's profile; a second one is a validation error.
pub async fn create_profile(
    State(state): State<AppState>,
    vc: Vc,
    ApiJson(payload): ApiJson<ProfileWrite>,
) -> AppResult<(StatusCode, Json<ProfileView>)> {
    PROFILE_POLICY.check_request(&vc, &Method::POST)?;
    let user_id = vc.require_user()?;
    let changes = validate(payload)?;

    let profile = state.db.create_profile(user_id, &changes).await?;
    info!(request_id = %vc.request_id, profile_id = profile.id, "profile created");
    Ok((StatusCode::CREATED, Json(profile_view(&state, profile).await?)))
}

pub async fn get_profile(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(profile_id): ApiPath<i64>,
) -> AppResult<Json<ProfileView>> {
    PROFILE_POLICY.check_request(&vc, &Method::GET)?;
    let profile = load_profile(&state.db, &vc, profile_id).await?;
    Ok(Json(profile_view(&state, profile).await?))
}

/// Profile fields are all optional, so PUT and PATCH behave the same.
pub async fn update_profile(
    State(state): State<AppState>,
    vc: Vc,
    method: Method,
    ApiPath(profile_id): ApiPath<i64>,
    ApiJson(payload): ApiJson<ProfileWrite>,
) -> AppResult<Json<ProfileView>> {
    PROFILE_POLICY.check_request(&vc, &method)?;
    let profile = load_profile(&state.db, &vc, profile_id).await?;
    PROFILE_POLICY.check_object(&vc, &method, profile.user_id)?;
    let changes = validate(payload)?;

    state.db.update_profile(profile_id, &changes).await?;
    info!(request_id = %vc.request_id, profile_id, "profile updated");

    let profile = load_profile(&state.db, &vc, profile_id).await?;
    Ok(Json(profile_view(&state, profile).await?))
}

pub async fn delete_profile(
    State(state): State<AppState>,
    vc: Vc,
    ApiPath(profile_id): ApiPath<i64>,
) -> AppResult<StatusCode> {
    PROFILE_POLICY.check_request(&vc, &Method::DELETE)?;
    let profile = load_profile(&state.db, &vc, profile_id).await?;
    PROFILE_POLICY.check_object(&vc, &Method::DELETE, profile.user_id)?;

    state.db.delete_profile(profile_id).await?;
    info!(request_id = %vc.request_id, profile_id, "profile deleted");
    Ok(StatusCode::NO_CONTENT)
}

/// `None` for staff (every profile), otherwise the caller's own user id.
fn visible_owner(viewer: &ViewerContext) -> Option<i64> {
    if viewer.is_staff {
        None
    } else {
        // Authenticated by PROFILE_POLICY; an anonymous viewer would match nothing.
        Some(viewer.user_id.unwrap_or(-1))
    }
}

async fn load_profile(db: &BlogDatabase, vc: &Vc, profile_id: i64) -> AppResult<ProfileRecord> {
    db.get_profile(profile_id, visible_owner(vc))
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Profile {} not found", profile_id)))
}

async fn profile_view(state: &AppState, profile: ProfileRecord) -> AppResult<ProfileView> {
    PostViewerService::new(state.db.clone()).profile_view(profile).await
}

fn validate(payload: ProfileWrite) -> AppResult<ProfileChanges> {
    let mut errors = FieldErrors::new();

    if let Some(bio) = &payload.bio {
        check_max_len(&mut errors, "bio", bio, 500);
    }
    if let Some(location) = &payload.location {
        check_max_len(&mut errors, "location", location, 100);
    }

    // A blank URL clears the field.
    let avatar = payload.avatar.map(|url| url.filter(|u| !u.trim().is_empty()));
    let website = payload.website.map(|url| url.filter(|u| !u.trim().is_empty()));
    if let Some(Some(url)) = &avatar {
        check_url(&mut errors, "avatar", url);
    }
    if let Some(Some(url)) = &website {
        check_url(&mut errors, "website", url);
    }

    errors.into_result()?;

    Ok(ProfileChanges {
        bio: payload.bio,
        avatar,
        website,
        location: payload.location,
        birth_date: payload.birth_date,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_staff_see_every_profile() {
        let staff = ViewerContext::authenticated_user(1, "admin".to_string(), true, "req".to_string());
        let user = ViewerContext::authenticated_user(7, "ada".to_string(), false, "req".to_string());
        assert_eq!(visible_owner(&staff), None);
        assert_eq!(visible_owner(&user), Some(7));
    }

    #[test]
    fn test_blank_urls_clear_and_bad_urls_fail() {
        let changes = validate(ProfileWrite {
            website: Some(Some("  ".to_string())),
            ..ProfileWrite::default()
        })
        .unwrap();
        assert_eq!(changes.website, Some(None));

        let err = validate(ProfileWrite {
            avatar: Some(Some("not a url".to_string())),
            bio: Some("x".repeat(501)),
            ..ProfileWrite::default()
        })
        .unwrap_err();
        match err {
            AppError::Validation(fields) => {
                assert!(fields.get("avatar").is_some());
                assert!(fields.get("bio").is_some());
            }
            other => panic!("expected validation error, got {:?}", other),
        }
    }
}
