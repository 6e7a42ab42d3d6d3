// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use sqlx::PgPool;

use crate::{
    access::{ResourceType, Role},
    common::error::AppError,
    db::{OfficeRepository, UserRepository},
    models::{
        activity::ActivityAction,
        auth::{AuthResponse, Claims, LoginUserPayload, RegisterOfficePayload, User},
    },
    services::activity_service::ActivityService,
};

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    office_repo: OfficeRepository,
    activity: ActivityService,
    jwt_secret: String,
    pool: PgPool,
}

impl AuthService {
    pub fn new(
        user_repo: UserRepository,
        office_repo: OfficeRepository,
        activity: ActivityService,
        jwt_secret: String,
        pool: PgPool,
    ) -> Self {
        Self { user_repo, office_repo, activity, jwt_secret, pool }
    }

    /// Hash fora do runtime assíncrono
    pub async fn hash_password(password: &str) -> Result<String, AppError> {
        let password_clone = password.to_owned();
        let hashed = tokio::task::spawn_blocking(move || hash(&password_clone, bcrypt::DEFAULT_COST))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
        Ok(hashed)
    }

    /// Cria o escritório e o primeiro admin numa transação.
    pub async fn register_office(&self, payload: &RegisterOfficePayload) -> Result<AuthResponse, AppError> {
        // 1. Hashing (fora da transação, não toca no banco)
        let hashed_password = Self::hash_password(&payload.password).await?;

        // --- INÍCIO DA TRANSAÇÃO ---
        let mut tx = self.pool.begin().await?;

        let office = self.office_repo.create(&mut *tx, &payload.office_name).await?;

        let admin = self
            .user_repo
            .create_user(
                &mut *tx,
                office.id,
                &payload.email,
                &hashed_password,
                &payload.full_name,
                None,
                Role::Admin,
                None,
                None,
            )
            .await?; // Se falhar aqui, o escritório criado acima é desfeito (drop = rollback)

        tx.commit().await?;
        // --- FIM DA TRANSAÇÃO ---

        tracing::info!(office_id = %office.id, "🏛️ Novo escritório registrado");
        self.activity.record(
            &admin.principal(),
            ActivityAction::Create,
            ResourceType::User,
            admin.id,
            format!("تسجيل مكتب جديد: {}", office.name),
        );

        let token = self.create_token(&admin)?;
        Ok(AuthResponse { token, user: admin })
    }

    pub async fn login_user(&self, payload: &LoginUserPayload) -> Result<AuthResponse, AppError> {
        let user = self
            .user_repo
            .find_by_email(&self.pool, &payload.email)
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = payload.password.clone();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        // Conta desativada responde igual a senha errada
        if !is_password_valid || !user.is_active {
            return Err(AppError::InvalidCredentials);
        }

        self.activity.record(
            &user.principal(),
            ActivityAction::Login,
            ResourceType::User,
            user.id,
            "تسجيل دخول",
        );

        let token = self.create_token(&user)?;
        Ok(AuthResponse { token, user })
    }

    /// Valida o JWT e recarrega o usuário: papel e escritório vêm sempre do banco.
    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let validation = Validation::default();
        let token_data = decode::<Claims>(token, &DecodingKey::from_secret(self.jwt_secret.as_ref()), &validation)
            .map_err(|_| AppError::InvalidToken)?;

        let user = self
            .user_repo
            .find_by_id(&self.pool, token_data.claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)?;

        if !user.is_active || user.office_id != token_data.claims.office {
            return Err(AppError::InvalidToken);
        }

        Ok(user)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(7);

        let claims = Claims {
            sub: user.id,
            office: user.office_id,
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        Ok(encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.jwt_secret.as_ref()),
        )?)
    }
}
