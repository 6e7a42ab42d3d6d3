// src/middleware/rbac.rs

use std::marker::PhantomData;

use axum::{extract::FromRequestParts, http::request::Parts};

use crate::{
    access::{Denial, Role},
    common::error::{ApiError, AppError},
    middleware::{auth::AuthenticatedUser, i18n::Locale},
};

/// Conjunto de papéis aceitos por uma rota.
pub trait RoleDef: Send + Sync + 'static {
    fn allowed() -> &'static [Role];
}

/// O extrator (guardião). Precisa do `auth_guard` antes.
pub struct RequireRole<T>(pub AuthenticatedUser, PhantomData<T>);

impl<T> RequireRole<T> {
    pub fn user(&self) -> &AuthenticatedUser {
        &self.0
    }
}

impl<T, S> FromRequestParts<S> for RequireRole<T>
where
    T: RoleDef,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let user = AuthenticatedUser::from_request_parts(parts, state).await?;

        if !T::allowed().contains(&user.0.role) {
            let Ok(locale) = Locale::from_request_parts(parts, state).await;
            tracing::debug!(user_id = %user.0.id, role = ?user.0.role, "rota restrita por papel");
            return Err(AppError::AccessDenied(Denial::RoleForbidden).to_api_error(&locale));
        }

        Ok(RequireRole(user, PhantomData))
    }
}

// ---
// DEFINIÇÃO DOS PAPÉIS (TIPOS)
// ---

pub struct AdminOnly;
impl RoleDef for AdminOnly {
    fn allowed() -> &'static [Role] {
        &[Role::Admin]
    }
}
