// src/db/user_repo.rs

use sqlx::{Executor, Postgres, QueryBuilder};
use uuid::Uuid;

use crate::{
    access::{Role, ScopeFilter},
    common::{
        db_utils::{push_scoped_target, PageQuery},
        error::AppError,
    },
    models::auth::{UpdateUserPayload, User},
};

// O repositório de usuários, responsável por todas as interações com a tabela 'users'
#[derive(Clone, Copy, Default)]
pub struct UserRepository;

impl UserRepository {
    pub fn new() -> Self {
        Self
    }

    // Busca um usuário pelo seu e-mail (login)
    pub async fn find_by_email<'e, E>(&self, executor: E, email: &str) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE LOWER(email) = LOWER($1)")
            .bind(email)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    // Busca um usuário pelo seu ID
    pub async fn find_by_id<'e, E>(&self, executor: E, id: Uuid) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(id)
            .fetch_optional(executor)
            .await?;
        Ok(user)
    }

    /// Usuário ativo do mesmo escritório (destinatários, advogado do processo...).
    pub async fn find_active_in_office<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        id: Uuid,
    ) -> Result<Option<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND office_id = $2 AND is_active = TRUE",
        )
        .bind(id)
        .bind(office_id)
        .fetch_optional(executor)
        .await?;
        Ok(user)
    }

    fn push_filters(qb: &mut QueryBuilder<'_, Postgres>, scope: &ScopeFilter, role: Option<Role>) {
        qb.push(" WHERE ");
        scope.push_where(qb);
        if let Some(role) = role {
            qb.push(" AND u.role = ").push_bind(role);
        }
    }

    pub async fn list<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        role: Option<Role>,
        page: &PageQuery,
    ) -> Result<Vec<User>, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT u.* FROM users u");
        Self::push_filters(&mut qb, scope, role);
        qb.push(" ORDER BY u.full_name ASC");
        page.push_limit(&mut qb);

        let users = qb.build_query_as::<User>().fetch_all(executor).await?;
        Ok(users)
    }

    pub async fn count<'e, E>(&self, executor: E, scope: &ScopeFilter, role: Option<Role>) -> Result<i64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM users u");
        Self::push_filters(&mut qb, scope, role);

        let total: i64 = qb.build_query_scalar().fetch_one(executor).await?;
        Ok(total)
    }

    // Cria um novo usuário no banco de dados
    // Com tratamento de erro específico para e-mails duplicados.
    pub async fn create_user<'e, E>(
        &self,
        executor: E,
        office_id: Uuid,
        email: &str,
        password_hash: &str,
        full_name: &str,
        phone: Option<&str>,
        role: Role,
        supervisor_id: Option<Uuid>,
        client_id: Option<Uuid>,
    ) -> Result<User, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (office_id, email, password_hash, full_name, phone, role, supervisor_id, client_id)
            VALUES ($1, LOWER($2), $3, $4, $5, $6, $7, $8)
            RETURNING *
            "#,
        )
        .bind(office_id)
        .bind(email)
        .bind(password_hash)
        .bind(full_name)
        .bind(phone)
        .bind(role)
        .bind(supervisor_id)
        .bind(client_id)
        .fetch_one(executor)
        .await
        .map_err(|e| {
            if let sqlx::Error::Database(db_err) = &e {
                if db_err.is_unique_violation() {
                    return match db_err.constraint() {
                        // O nome padrão que o Postgres cria para "UNIQUE" na coluna email
                        Some("users_email_key") => AppError::EmailAlreadyExists,
                        Some(constraint) => AppError::UniqueConstraintViolation(constraint.to_string()),
                        None => AppError::EmailAlreadyExists,
                    };
                }
            }
            e.into()
        })?;

        Ok(user)
    }

    pub async fn update<'e, E>(
        &self,
        executor: E,
        scope: &ScopeFilter,
        id: Uuid,
        input: &UpdateUserPayload,
    ) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET updated_at = NOW()");
        if let Some(full_name) = &input.full_name {
            qb.push(", full_name = ").push_bind(full_name.clone());
        }
        if let Some(phone) = &input.phone {
            qb.push(", phone = ").push_bind(phone.clone());
        }
        if let Some(role) = input.role {
            qb.push(", role = ").push_bind(role);
        }
        if let Some(supervisor_id) = input.supervisor_id {
            qb.push(", supervisor_id = ").push_bind(supervisor_id);
        }
        if let Some(client_id) = input.client_id {
            qb.push(", client_id = ").push_bind(client_id);
        }
        if let Some(is_active) = input.is_active {
            qb.push(", is_active = ").push_bind(is_active);
        }
        push_scoped_target(&mut qb, "users u", "u.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    pub async fn deactivate<'e, E>(&self, executor: E, scope: &ScopeFilter, id: Uuid) -> Result<u64, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let mut qb = QueryBuilder::<Postgres>::new("UPDATE users SET is_active = FALSE, updated_at = NOW()");
        push_scoped_target(&mut qb, "users u", "u.id", id, scope);

        let result = qb.build().execute(executor).await?;
        Ok(result.rows_affected())
    }

    /// Quantos admins ativos o escritório tem (não deixamos zerar).
    /// Trava os admins ativos do escritório e devolve quantos são.
    /// Duas demissões cruzadas se serializam aqui: a segunda recontagem
    /// já enxerga a primeira.
    pub async fn lock_active_admins<'e, E>(&self, executor: E, office_id: Uuid) -> Result<usize, AppError>
    where
        E: Executor<'e, Database = Postgres>,
    {
        let admins: Vec<Uuid> = sqlx::query_scalar(
            "SELECT id FROM users WHERE office_id = $1 AND role = 'admin' AND is_active = TRUE FOR UPDATE",
        )
        .bind(office_id)
        .fetch_all(executor)
        .await?;
        Ok(admins.len())
    }
}
