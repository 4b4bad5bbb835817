use axum::{
    extract::{DefaultBodyLimit, Multipart, State},
    routing::{get, put},
    Json, Router,
};
use tracing::{info, instrument, warn};

use crate::{auth::extractors::AuthUser, error::ApiError, state::AppState, store::User};

use super::dto::{ProfilePictureResponse, UpdateProfileRequest};
use super::picture;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/profile-picture", put(upload_picture).post(upload_picture))
        // Headroom above the picture cap so multipart framing overhead does
        // not trip the transport limit before validation answers.
        .layer(DefaultBodyLimit::max(picture::MAX_BYTES + 1024 * 1024))
}

#[instrument(skip(user))]
pub async fn get_profile(AuthUser(user): AuthUser) -> Json<User> {
    Json(user)
}

#[instrument(skip(state, user, payload))]
pub async fn update_profile(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    Json(payload): Json<UpdateProfileRequest>,
) -> Result<Json<User>, ApiError> {
    let changes = payload.into_changes()?;
    let updated = state
        .users
        .update_profile(user.id, changes)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user.id, "profile update for vanished user");
            ApiError::NotFound("User not found".into())
        })?;

    info!(user_id = %updated.id, "profile updated");
    Ok(Json(updated))
}

#[instrument(skip(state, user, multipart))]
pub async fn upload_picture(
    State(state): State<AppState>,
    AuthUser(user): AuthUser,
    mut multipart: Multipart,
) -> Result<Json<ProfilePictureResponse>, ApiError> {
    let mut upload = None;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| ApiError::Payload(format!("Malformed multipart body: {e}")))?
    {
        if field.name() != Some("profilePicture") {
            continue;
        }
        let file_name = field.file_name().unwrap_or_default().to_string();
        let declared_type = field.content_type().map(|s| s.to_string());
        let data = field
            .bytes()
            .await
            .map_err(|e| ApiError::Payload(format!("Failed to read upload: {e}")))?;
        upload = Some((file_name, declared_type, data));
        break;
    }

    let Some((file_name, declared_type, data)) = upload else {
        warn!(user_id = %user.id, "picture upload without profilePicture field");
        return Err(ApiError::Validation("No file uploaded".into()));
    };

    let mime = picture::validate_upload(&file_name, declared_type.as_deref(), &data)?;
    let data_uri = picture::to_data_uri(mime, &data);

    state
        .users
        .set_profile_picture(user.id, &data_uri)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %user.id, "picture upload for vanished user");
            ApiError::NotFound("User not found".into())
        })?;

    info!(user_id = %user.id, size = data.len(), mime, "profile picture updated");
    Ok(Json(ProfilePictureResponse {
        message: "Profile picture updated successfully".into(),
        profile_picture: data_uri,
    }))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{MaritalStatus, NewUser};

    async fn seeded_user(state: &AppState) -> User {
        state
            .users
            .create(NewUser {
                name: "Jane Doe".into(),
                email: "jane@example.com".into(),
                password_hash: "$argon2id$fake".into(),
                phone: None,
                age: Some(34),
                marital_status: None,
                children: None,
                education: None,
                address: None,
            })
            .await
            .expect("seed user")
    }

    #[tokio::test]
    async fn get_profile_returns_record_without_password_hash() {
        let state = AppState::fake();
        let user = seeded_user(&state).await;

        let Json(profile) = get_profile(AuthUser(user)).await;
        let json = serde_json::to_string(&profile).expect("serialize");
        assert!(json.contains("\"email\":\"jane@example.com\""));
        assert!(json.contains("\"maritalStatus\":\"Single\""));
        assert!(!json.contains("password"));
    }

    #[tokio::test]
    async fn update_touches_only_the_provided_fields() {
        let state = AppState::fake();
        let user = seeded_user(&state).await;

        let Json(updated) = update_profile(
            State(state.clone()),
            AuthUser(user.clone()),
            Json(UpdateProfileRequest {
                phone: Some("+4915112345678".into()),
                marital_status: Some(MaritalStatus::Married),
                ..Default::default()
            }),
        )
        .await
        .expect("update");

        assert_eq!(updated.phone.as_deref(), Some("+4915112345678"));
        assert_eq!(updated.marital_status, MaritalStatus::Married);
        assert_eq!(updated.name, "Jane Doe");
        assert_eq!(updated.email, "jane@example.com");
        assert_eq!(updated.age, Some(34));
    }

    #[tokio::test]
    async fn update_ignores_empty_strings() {
        let state = AppState::fake();
        let user = seeded_user(&state).await;

        let Json(updated) = update_profile(
            State(state.clone()),
            AuthUser(user.clone()),
            Json(UpdateProfileRequest {
                name: Some("".into()),
                education: Some("MSc".into()),
                ..Default::default()
            }),
        )
        .await
        .expect("update");

        assert_eq!(updated.name, "Jane Doe");
        assert_eq!(updated.education.as_deref(), Some("MSc"));
    }

    #[tokio::test]
    async fn email_change_to_taken_address_conflicts() {
        let state = AppState::fake();
        let jane = seeded_user(&state).await;
        let bob = state
            .users
            .create(NewUser {
                name: "Bob".into(),
                email: "bob@example.com".into(),
                password_hash: "$argon2id$fake".into(),
                phone: None,
                age: None,
                marital_status: None,
                children: None,
                education: None,
                address: None,
            })
            .await
            .expect("seed bob");

        let err = update_profile(
            State(state.clone()),
            AuthUser(bob),
            Json(UpdateProfileRequest {
                email: Some(jane.email.clone()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::CONFLICT);
    }

    #[tokio::test]
    async fn update_for_deleted_user_is_not_found() {
        let state = AppState::fake();
        let user = seeded_user(&state).await;
        // Simulate deletion by using a state with an empty store.
        let other = AppState::fake();

        let err = update_profile(
            State(other),
            AuthUser(user),
            Json(UpdateProfileRequest {
                phone: Some("+1".into()),
                ..Default::default()
            }),
        )
        .await
        .unwrap_err();
        assert_eq!(err.status(), axum::http::StatusCode::NOT_FOUND);
    }
}
