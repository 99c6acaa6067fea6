use diesel::prelude::*;
use uuid::Uuid;

use foodies_shared::clients::db::{run_blocking, DbPool};
use foodies_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewFollow, RecipeDetails, UserProfile, UserRecord, UserStats, UserSummary};
use crate::schema::{recipes, user_favorite_recipes, user_followers, users};
use crate::services::recipe_service;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FollowOutcome {
    Followed,
    AlreadyFollowing,
}

pub fn find_user_record(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Option<UserRecord>> {
    let record = users::table
        .find(user_id)
        .select(UserRecord::as_select())
        .first(conn)
        .optional()?;
    Ok(record)
}

pub fn user_exists(conn: &mut PgConnection, user_id: Uuid) -> AppResult<bool> {
    let found = diesel::select(diesel::dsl::exists(users::table.find(user_id)))
        .get_result::<bool>(conn)?;
    Ok(found)
}

/// Profile plus the four social counters, or `None` for an unknown user.
pub async fn get_user_profile_with_stats(
    pool: &DbPool,
    user_id: Uuid,
) -> AppResult<Option<UserProfile>> {
    let Some(record) = run_blocking(pool, move |conn| find_user_record(conn, user_id)).await? else {
        return Ok(None);
    };

    let stats = get_user_stats(pool, user_id).await?;
    Ok(Some(UserProfile::new(record, stats)))
}

/// The four counts are independent and run concurrently on separate connections.
pub async fn get_user_stats(pool: &DbPool, user_id: Uuid) -> AppResult<UserStats> {
    let (recipes_count, favorites_count, followers_count, following_count) = tokio::try_join!(
        run_blocking(pool, move |conn| {
            let n = recipes::table
                .filter(recipes::owner_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?;
            Ok(n)
        }),
        run_blocking(pool, move |conn| {
            let n = user_favorite_recipes::table
                .filter(user_favorite_recipes::user_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?;
            Ok(n)
        }),
        run_blocking(pool, move |conn| {
            let n = user_followers::table
                .filter(user_followers::following_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?;
            Ok(n)
        }),
        run_blocking(pool, move |conn| {
            let n = user_followers::table
                .filter(user_followers::follower_id.eq(user_id))
                .count()
                .get_result::<i64>(conn)?;
            Ok(n)
        }),
    )?;

    Ok(UserStats {
        recipes_count,
        favorites_count,
        followers_count,
        following_count,
    })
}

/// `false` without touching storage when either side is unknown.
pub async fn is_following(
    pool: &DbPool,
    follower_id: Option<Uuid>,
    following_id: Option<Uuid>,
) -> AppResult<bool> {
    let (Some(follower_id), Some(following_id)) = (follower_id, following_id) else {
        return Ok(false);
    };
    run_blocking(pool, move |conn| follow_exists(conn, follower_id, following_id)).await
}

pub fn follow_exists(conn: &mut PgConnection, follower_id: Uuid, following_id: Uuid) -> AppResult<bool> {
    let found = diesel::select(diesel::dsl::exists(
        user_followers::table
            .filter(user_followers::follower_id.eq(follower_id))
            .filter(user_followers::following_id.eq(following_id)),
    ))
    .get_result::<bool>(conn)?;
    Ok(found)
}

pub fn follow_user(
    conn: &mut PgConnection,
    follower_id: Uuid,
    following_id: Uuid,
) -> AppResult<FollowOutcome> {
    if follower_id == following_id {
        return Err(AppError::new(ErrorCode::CannotFollowSelf, "You cannot follow yourself"));
    }
    if !user_exists(conn, following_id)? {
        return Err(AppError::new(ErrorCode::UserNotFound, "User not found"));
    }

    let inserted = diesel::insert_into(user_followers::table)
        .values(&NewFollow { follower_id, following_id })
        .on_conflict((user_followers::follower_id, user_followers::following_id))
        .do_nothing()
        .execute(conn)?;

    if inserted == 0 {
        return Ok(FollowOutcome::AlreadyFollowing);
    }

    tracing::info!(follower_id = %follower_id, following_id = %following_id, "user followed");
    Ok(FollowOutcome::Followed)
}

pub fn unfollow_user(conn: &mut PgConnection, follower_id: Uuid, following_id: Uuid) -> AppResult<()> {
    if !user_exists(conn, following_id)? {
        return Err(AppError::new(ErrorCode::UserNotFound, "User not found"));
    }

    let removed = diesel::delete(
        user_followers::table
            .filter(user_followers::follower_id.eq(follower_id))
            .filter(user_followers::following_id.eq(following_id)),
    )
    .execute(conn)?;

    tracing::info!(follower_id = %follower_id, following_id = %following_id, removed, "user unfollowed");
    Ok(())
}

/// Users following `user_id`, most recent first.
pub fn list_followers(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<UserSummary>> {
    let followers = user_followers::table
        .inner_join(users::table.on(users::id.eq(user_followers::follower_id)))
        .filter(user_followers::following_id.eq(user_id))
        .order(user_followers::created_at.desc())
        .select(UserSummary::as_select())
        .load(conn)?;
    Ok(followers)
}

/// Users `user_id` follows, most recent first.
pub fn list_following(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<UserSummary>> {
    let following = user_followers::table
        .inner_join(users::table.on(users::id.eq(user_followers::following_id)))
        .filter(user_followers::follower_id.eq(user_id))
        .order(user_followers::created_at.desc())
        .select(UserSummary::as_select())
        .load(conn)?;
    Ok(following)
}

pub fn own_recipes(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<RecipeDetails>> {
    let ids: Vec<Uuid> = recipes::table
        .filter(recipes::owner_id.eq(user_id))
        .order((recipes::created_at.desc(), recipes::id.desc()))
        .select(recipes::id)
        .load(conn)?;
    recipe_service::load_details(conn, &ids)
}

/// Recipes the user favorited, most recently favorited first.
pub fn favorite_recipes(conn: &mut PgConnection, user_id: Uuid) -> AppResult<Vec<RecipeDetails>> {
    let ids: Vec<Uuid> = user_favorite_recipes::table
        .filter(user_favorite_recipes::user_id.eq(user_id))
        .order(user_favorite_recipes::created_at.desc())
        .select(user_favorite_recipes::recipe_id)
        .load(conn)?;
    recipe_service::load_details(conn, &ids)
}

pub fn update_avatar(conn: &mut PgConnection, user_id: Uuid, avatar_url: &str) -> AppResult<()> {
    let updated = diesel::update(users::table.find(user_id))
        .set((
            users::avatar.eq(avatar_url),
            users::updated_at.eq(chrono::Utc::now()),
        ))
        .execute(conn)?;

    if updated == 0 {
        return Err(AppError::new(ErrorCode::UserNotFound, "User not found"));
    }

    tracing::info!(user_id = %user_id, "avatar updated");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use diesel::r2d2::{ConnectionManager, Pool};

    // Never connects: building unchecked skips the initial connection attempt.
    fn unreachable_pool() -> DbPool {
        Pool::builder()
            .max_size(1)
            .build_unchecked(ConnectionManager::new("postgres://invalid@127.0.0.1:1/none"))
    }

    #[tokio::test]
    async fn follow_check_short_circuits_on_missing_ids() {
        let pool = unreachable_pool();
        let id = Uuid::new_v4();
        assert!(!is_following(&pool, None, Some(id)).await.unwrap());
        assert!(!is_following(&pool, Some(id), None).await.unwrap());
        assert!(!is_following(&pool, None, None).await.unwrap());
    }
}
