use argon2::{
    password_hash::{rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString},
    Argon2,
};
use diesel::prelude::*;
use diesel::result::{DatabaseErrorKind, Error as DieselError};
use uuid::Uuid;

use foodies_shared::errors::{AppError, AppResult, ErrorCode};

use crate::models::{NewUser, User};
use crate::schema::users;

pub fn hash_password(password: &str) -> AppResult<String> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|h| h.to_string())
        .map_err(|e| AppError::internal(format!("password hashing failed: {e}")))
}

pub fn verify_password(password: &str, hash: &str) -> AppResult<bool> {
    let parsed_hash = PasswordHash::new(hash)
        .map_err(|e| AppError::internal(format!("invalid password hash: {e}")))?;
    Ok(Argon2::default()
        .verify_password(password.as_bytes(), &parsed_hash)
        .is_ok())
}

pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Creates the account and returns its id. A taken email is a conflict.
pub fn register_user(conn: &mut PgConnection, name: &str, email: &str, password: &str) -> AppResult<Uuid> {
    let email = normalize_email(email);
    let password_hash = hash_password(password)?;

    let user_id = diesel::insert_into(users::table)
        .values(&NewUser {
            name: name.trim(),
            email: &email,
            password: &password_hash,
        })
        .returning(users::id)
        .get_result::<Uuid>(conn)
        .map_err(|e| match e {
            DieselError::DatabaseError(DatabaseErrorKind::UniqueViolation, _) => {
                AppError::new(ErrorCode::EmailAlreadyExists, "Email already in use")
            }
            other => AppError::from(other),
        })?;

    tracing::info!(user_id = %user_id, "user registered");
    Ok(user_id)
}

/// Unknown email and wrong password are indistinguishable to the caller.
pub fn authenticate(conn: &mut PgConnection, email: &str, password: &str) -> AppResult<User> {
    let invalid = || AppError::new(ErrorCode::InvalidCredentials, "Invalid credentials");

    let user = users::table
        .filter(users::email.eq(normalize_email(email)))
        .select(User::as_select())
        .first(conn)
        .optional()?
        .ok_or_else(invalid)?;

    if !verify_password(password, &user.password)? {
        return Err(invalid());
    }

    tracing::info!(user_id = %user.id, "user logged in");
    Ok(user)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("secret-pass").unwrap();
        assert_ne!(hash, "secret-pass");
        assert!(verify_password("secret-pass", &hash).unwrap());
        assert!(!verify_password("wrong-pass", &hash).unwrap());
    }

    #[test]
    fn hashes_are_salted() {
        assert_ne!(hash_password("same").unwrap(), hash_password("same").unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("x", "not-a-phc-string").is_err());
    }

    #[test]
    fn emails_are_normalized() {
        assert_eq!(normalize_email("  Chef@Example.COM "), "chef@example.com");
    }
}
