use axum::extract::{Multipart, Path, State};
use axum::http::StatusCode;
use axum::Json;
use serde::Serialize;
use std::sync::Arc;
use utoipa::{OpenApi, ToSchema};
use uuid::Uuid;

use foodies_shared::clients::db::run_blocking;
use foodies_shared::errors::{AppError, AppResult, ErrorCode};
use foodies_shared::middleware::OptionalAuthUser;
use foodies_shared::types::auth::AuthUser;
use foodies_shared::types::{ApiErrorResponse, ApiResponse, Empty};

use super::auth::UserPayload;
use super::{multipart_error, parse_id, read_upload};
use crate::models::{RecipeDetails, UserProfile, UserSummary};
use crate::services::user_service::{self, FollowOutcome};
use crate::AppState;

pub const AVATAR_FOLDER: &str = "foodies/avatars";

#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PublicProfile {
    #[serde(flatten)]
    pub profile: UserProfile,
    pub is_following: bool,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct PublicProfilePayload {
    pub user: PublicProfile,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvatarInfo {
    pub id: Uuid,
    pub avatar: String,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct AvatarPayload {
    pub user: AvatarInfo,
}

/// Multipart body of `PATCH /users/avatar`.
#[derive(ToSchema)]
#[allow(dead_code)]
pub struct AvatarUpload {
    #[schema(value_type = String, format = Binary)]
    avatar: Vec<u8>,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowersPayload {
    pub followers: Vec<UserSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct FollowingPayload {
    pub following: Vec<UserSummary>,
    pub total: usize,
}

#[derive(Debug, Serialize, ToSchema)]
pub struct RecipesPayload {
    pub recipes: Vec<RecipeDetails>,
}

fn user_not_found() -> AppError {
    AppError::new(ErrorCode::UserNotFound, "User not found")
}

// --- GET /users/current ---

#[utoipa::path(
    get,
    path = "/api/v1/users/current",
    tag = "users",
    responses(
        (status = 200, description = "Caller profile with stats", body = ApiResponse<UserPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn current_user(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<UserPayload>>> {
    let profile = user_service::get_user_profile_with_stats(&state.db, user.id)
        .await?
        .ok_or_else(user_not_found)?;
    Ok(Json(ApiResponse::ok(UserPayload { user: profile }, "Current user fetched")))
}

// --- GET /users/:id ---

#[utoipa::path(
    get,
    path = "/api/v1/users/{id}",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "Public profile. A bearer token fills in isFollowing", body = ApiResponse<PublicProfilePayload>),
        (status = 400, description = "Malformed id", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse)
    )
)]
pub async fn get_user(
    OptionalAuthUser(viewer): OptionalAuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<PublicProfilePayload>>> {
    let user_id = parse_id(&id)?;
    let profile = user_service::get_user_profile_with_stats(&state.db, user_id)
        .await?
        .ok_or_else(user_not_found)?;
    let is_following =
        user_service::is_following(&state.db, viewer.map(|v| v.id), Some(user_id)).await?;

    Ok(Json(ApiResponse::ok(
        PublicProfilePayload { user: PublicProfile { profile, is_following } },
        "User fetched",
    )))
}

// --- PATCH /users/avatar ---

#[utoipa::path(
    patch,
    path = "/api/v1/users/avatar",
    tag = "users",
    request_body(content_type = "multipart/form-data", content = AvatarUpload),
    responses(
        (status = 200, description = "Avatar stored", body = ApiResponse<AvatarPayload>),
        (status = 400, description = "No avatar file", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 413, description = "File too large", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn update_avatar(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    mut multipart: Multipart,
) -> AppResult<Json<ApiResponse<AvatarPayload>>> {
    let mut upload = None;
    while let Some(field) = multipart.next_field().await.map_err(multipart_error)? {
        if field.name() == Some("avatar") {
            upload = read_upload(field).await?;
        }
    }
    let upload = upload
        .ok_or_else(|| AppError::new(ErrorCode::AvatarRequired, "Avatar file is required"))?;

    let avatar = state
        .storage
        .store(AVATAR_FOLDER, upload.bytes, &upload.content_type)
        .await?;

    let user_id = user.id;
    let stored = avatar.clone();
    run_blocking(&state.db, move |conn| user_service::update_avatar(conn, user_id, &stored)).await?;

    Ok(Json(ApiResponse::ok(
        AvatarPayload { user: AvatarInfo { id: user.id, avatar } },
        "Avatar updated",
    )))
}

// --- GET /users/followers ---

#[utoipa::path(
    get,
    path = "/api/v1/users/followers",
    tag = "users",
    responses(
        (status = 200, description = "Users following the caller", body = ApiResponse<FollowersPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn followers(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<FollowersPayload>>> {
    let user_id = user.id;
    let followers = run_blocking(&state.db, move |conn| user_service::list_followers(conn, user_id)).await?;
    let total = followers.len();
    Ok(Json(ApiResponse::ok(FollowersPayload { followers, total }, "Followers fetched")))
}

// --- GET /users/following ---

#[utoipa::path(
    get,
    path = "/api/v1/users/following",
    tag = "users",
    responses(
        (status = 200, description = "Users the caller follows", body = ApiResponse<FollowingPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn following(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<FollowingPayload>>> {
    let user_id = user.id;
    let following = run_blocking(&state.db, move |conn| user_service::list_following(conn, user_id)).await?;
    let total = following.len();
    Ok(Json(ApiResponse::ok(FollowingPayload { following, total }, "Following fetched")))
}

// --- POST /users/:id/follow ---

#[utoipa::path(
    post,
    path = "/api/v1/users/{id}/follow",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 201, description = "Now following", body = ApiResponse<Empty>),
        (status = 400, description = "Cannot follow yourself", body = ApiErrorResponse),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse),
        (status = 404, description = "User not found", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn follow(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<(StatusCode, Json<ApiResponse<Empty>>)> {
    let target_id = parse_id(&id)?;
    let follower_id = user.id;
    let outcome = run_blocking(&state.db, move |conn| {
        user_service::follow_user(conn, follower_id, target_id)
    })
    .await?;

    Ok(match outcome {
        FollowOutcome::Followed => (StatusCode::CREATED, Json(ApiResponse::message("Followed user"))),
        FollowOutcome::AlreadyFollowing => (StatusCode::OK, Json(ApiResponse::message("Already following"))),
    })
}

// --- DELETE /users/:id/unfollow ---

#[utoipa::path(
    delete,
    path = "/api/v1/users/{id}/unfollow",
    tag = "users",
    params(("id" = Uuid, Path, description = "User id")),
    responses(
        (status = 200, description = "No longer following", body = ApiResponse<Empty>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn unfollow(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> AppResult<Json<ApiResponse<Empty>>> {
    let target_id = parse_id(&id)?;
    let follower_id = user.id;
    run_blocking(&state.db, move |conn| user_service::unfollow_user(conn, follower_id, target_id)).await?;
    Ok(Json(ApiResponse::message("Unfollowed user")))
}

// --- GET /users/own ---

#[utoipa::path(
    get,
    path = "/api/v1/users/own",
    tag = "users",
    responses(
        (status = 200, description = "Recipes created by the caller", body = ApiResponse<RecipesPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn own_recipes(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<RecipesPayload>>> {
    let user_id = user.id;
    let recipes = run_blocking(&state.db, move |conn| user_service::own_recipes(conn, user_id)).await?;
    Ok(Json(ApiResponse::ok(RecipesPayload { recipes }, "Own recipes fetched")))
}

// --- GET /users/favorites ---

#[utoipa::path(
    get,
    path = "/api/v1/users/favorites",
    tag = "users",
    responses(
        (status = 200, description = "Recipes the caller favorited", body = ApiResponse<RecipesPayload>),
        (status = 401, description = "Unauthorized", body = ApiErrorResponse)
    ),
    security(("bearer_auth" = []))
)]
pub async fn favorite_recipes(
    user: AuthUser,
    State(state): State<Arc<AppState>>,
) -> AppResult<Json<ApiResponse<RecipesPayload>>> {
    let user_id = user.id;
    let recipes = run_blocking(&state.db, move |conn| user_service::favorite_recipes(conn, user_id)).await?;
    Ok(Json(ApiResponse::ok(RecipesPayload { recipes }, "Favorite recipes fetched")))
}

#[derive(OpenApi)]
#[openapi(paths(
    current_user,
    get_user,
    update_avatar,
    followers,
    following,
    follow,
    unfollow,
    own_recipes,
    favorite_recipes,
))]
pub struct ApiDoc;
