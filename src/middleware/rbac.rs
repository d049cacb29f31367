// src/middleware/rbac.rs

use axum::{extract::FromRequestParts, http::request::Parts};
use std::marker::PhantomData;

use crate::{
    common::error::AppError,
    models::auth::{Role, User},
};

/// 1. O Trait que define quem pode passar
pub trait RoleRequirement: Send + Sync + 'static {
    fn allows(role: Role) -> bool;
    fn description() -> &'static str;
}

/// 2. O Extractor (Guardião). Depende do `auth_guard` ter rodado antes.
pub struct RequireRole<T>(pub PhantomData<T>);

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleRequirement,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let user = parts.extensions.get::<User>().ok_or(AppError::InvalidToken)?;
        check::<T>(user)?;
        Ok(RequireRole(PhantomData))
    }
}

fn check<T: RoleRequirement>(user: &User) -> Result<(), AppError> {
    if T::allows(user.role) {
        return Ok(());
    }
    tracing::warn!(
        "⛔ {} ({}) tentou uma ação restrita a {}",
        user.username,
        user.role.as_str(),
        T::description()
    );
    Err(AppError::Forbidden)
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

/// PRINCIPAL ou ADMINISTRATIVO.
pub struct OfficeStaff;
impl RoleRequirement for OfficeStaff {
    fn allows(role: Role) -> bool {
        role.is_office()
    }
    fn description() -> &'static str {
        "escritório"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;

    fn user(role: Role) -> User {
        User {
            id: 1,
            username: "u".into(),
            password_hash: String::new(),
            full_name: "U".into(),
            email: None,
            phone: None,
            role,
            active: true,
            created_at: Utc::now(),
            last_login_at: None,
        }
    }

    #[test]
    fn office_roles_pass() {
        assert!(check::<OfficeStaff>(&user(Role::Principal)).is_ok());
        assert!(check::<OfficeStaff>(&user(Role::Administrativo)).is_ok());
    }

    #[test]
    fn technicians_are_forbidden() {
        assert!(matches!(check::<OfficeStaff>(&user(Role::Tecnico)), Err(AppError::Forbidden)));
    }

    #[tokio::test]
    async fn extractor_reads_the_user_from_extensions() {
        let (mut parts, _) = axum::http::Request::new(()).into_parts();
        let err = RequireRole::<OfficeStaff>::from_request_parts(&mut parts, &()).await;
        assert!(matches!(err, Err(AppError::InvalidToken)));

        parts.extensions.insert(user(Role::Administrativo));
        assert!(RequireRole::<OfficeStaff>::from_request_parts(&mut parts, &()).await.is_ok());
    }
}
