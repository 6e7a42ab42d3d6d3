// src/services/user_service.rs

use sqlx::{Acquire, Executor, Postgres};
use uuid::Uuid;

use crate::{
    access::{self, Action, Denial, Principal, ResourceType, Role, Visibility},
    common::{
        db_utils::{Page, PageQuery},
        error::AppError,
    },
    db::UserRepository,
    models::{
        activity::ActivityAction,
        auth::{CreateUserPayload, UpdateUserPayload, User},
    },
    services::{activity_service::ActivityService, auth::AuthService, references},
};

#[derive(Clone)]
pub struct UserService {
    repo: UserRepository,
    activity: ActivityService,
}

impl UserService {
    pub fn new(repo: UserRepository, activity: ActivityService) -> Self {
        Self { repo, activity }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        role: Option<Role>,
        page: &PageQuery,
    ) -> Result<Page<User>, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let scope = access::scope_filter(principal, ResourceType::User, Visibility::from_flag(page.include_inactive))?;
        let mut conn = executor.acquire().await?;

        let items = self.repo.list(&mut *conn, &scope, role, page).await?;
        let total = self.repo.count(&mut *conn, &scope, role).await?;

        Ok(Page::new(items, total, page))
    }

    pub async fn get<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = self
            .repo
            .find_by_id(executor, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))?;

        access::authorize(principal, ResourceType::User, Action::Read, &user.ownership())?;
        Ok(user)
    }

    /// Convite de usuário (só admin). O escritório vem da sessão.
    pub async fn create<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        payload: &CreateUserPayload,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let office_id = access::tenant_for_create(principal, payload.office_id);
        if !access::policy::capability(principal.role, ResourceType::User, Action::Create) {
            return Err(Denial::RoleForbidden.into());
        }

        let hashed_password = AuthService::hash_password(&payload.password).await?;

        let mut tx = executor.begin().await?;

        if let Some(supervisor_id) = payload.supervisor_id {
            references::active_user(&mut tx, office_id, supervisor_id).await?;
        }
        // Usuário cliente precisa do vínculo; os outros papéis não têm.
        let client_id = match payload.role {
            Role::Client => {
                let client_id = payload.client_id.ok_or_else(|| {
                    AppError::DataIntegrityConflict("Usuário cliente precisa de clientId.".into())
                })?;
                references::active_client(&mut tx, office_id, client_id).await?;
                Some(client_id)
            }
            _ => None,
        };

        let user = self
            .repo
            .create_user(
                &mut *tx,
                office_id,
                &payload.email,
                &hashed_password,
                &payload.full_name,
                payload.phone.as_deref(),
                payload.role,
                payload.supervisor_id,
                client_id,
            )
            .await?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Create,
            ResourceType::User,
            user.id,
            format!("إضافة مستخدم: {}", user.full_name),
        );
        Ok(user)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        principal: &Principal,
        id: Uuid,
        payload: &UpdateUserPayload,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))?;
        access::authorize(principal, ResourceType::User, Action::Update, &current.ownership())?;

        // Papel, vínculo e status: só admin
        if payload.touches_admin_fields() && !principal.is_admin() {
            return Err(Denial::RoleForbidden.into());
        }
        if let Some(supervisor_id) = payload.supervisor_id {
            references::active_user(&mut tx, principal.office_id, supervisor_id).await?;
        }
        if let Some(client_id) = payload.client_id {
            references::active_client(&mut tx, principal.office_id, client_id).await?;
        }
        let demotes_admin = current.role == Role::Admin
            && (payload.role.is_some_and(|r| r != Role::Admin) || payload.is_active == Some(false));
        if demotes_admin && self.repo.lock_active_admins(&mut *tx, principal.office_id).await? <= 1 {
            return Err(AppError::DataIntegrityConflict(
                "O escritório precisa de pelo menos um administrador ativo.".into(),
            ));
        }

        let scope = access::scope_filter(principal, ResourceType::User, Visibility::ActiveOnly)?;
        if self.repo.update(&mut *tx, &scope, id, payload).await? == 0 {
            return Err(AppError::not_found(format!("user {}", id)));
        }

        let user = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))?;

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Update,
            ResourceType::User,
            user.id,
            format!("تعديل بيانات المستخدم: {}", user.full_name),
        );
        Ok(user)
    }

    pub async fn deactivate<'e, E>(&self, executor: E, principal: &Principal, id: Uuid) -> Result<(), AppError>
    where
        E: Executor<'e, Database = Postgres> + Acquire<'e, Database = Postgres>,
    {
        let mut tx = executor.begin().await?;

        let current = self
            .repo
            .find_by_id(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::not_found(format!("user {}", id)))?;
        access::authorize(principal, ResourceType::User, Action::Delete, &current.ownership())?;

        if current.id == principal.user_id {
            return Err(AppError::DataIntegrityConflict("Não é possível desativar a própria conta.".into()));
        }
        if current.role == Role::Admin && self.repo.lock_active_admins(&mut *tx, principal.office_id).await? <= 1 {
            return Err(AppError::DataIntegrityConflict(
                "O escritório precisa de pelo menos um administrador ativo.".into(),
            ));
        }

        let scope = access::scope_filter(principal, ResourceType::User, Visibility::ActiveOnly)?;
        if self.repo.deactivate(&mut *tx, &scope, id).await? == 0 {
            return Err(AppError::not_found(format!("user {}", id)));
        }

        tx.commit().await?;

        self.activity.record(
            principal,
            ActivityAction::Delete,
            ResourceType::User,
            id,
            format!("تعطيل المستخدم: {}", current.full_name),
        );
        Ok(())
    }
}
