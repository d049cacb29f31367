// src/services/auth.rs

use bcrypt::{hash, verify};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};
use serde_json::json;
use sqlx::PgPool;

use crate::{
    common::error::AppError,
    db::UserRepository,
    models::auth::{Claims, CreateUserPayload, Role, UpdateUserPayload, User},
    realtime::{EntityChange, NotificationBus},
};

const TOKEN_DAYS: i64 = 7;

#[derive(Clone)]
pub struct AuthService {
    user_repo: UserRepository,
    jwt_secret: String,
    pool: PgPool,
    bus: NotificationBus,
}

impl AuthService {
    pub fn new(user_repo: UserRepository, jwt_secret: String, pool: PgPool, bus: NotificationBus) -> Self {
        Self {
            user_repo,
            jwt_secret,
            pool,
            bus,
        }
    }

    pub async fn login_user(&self, username: &str, password: &str) -> Result<String, AppError> {
        let user = self
            .user_repo
            .find_by_username(username.trim())
            .await?
            .ok_or(AppError::InvalidCredentials)?;

        let password_clone = password.to_owned();
        let password_hash_clone = user.password_hash.clone();

        // Executa a verificação em um thread separado
        let is_password_valid = tokio::task::spawn_blocking(move || verify(&password_clone, &password_hash_clone))
            .await
            .map_err(|e| anyhow::anyhow!("Falha na task de verificação de senha: {}", e))??;

        if !is_password_valid {
            tracing::warn!("Tentativa de login inválida para {}", user.username);
            return Err(AppError::InvalidCredentials);
        }

        self.user_repo.touch_last_login(user.id).await?;
        tracing::info!("🔑 {} entrou ({})", user.username, user.role.as_str());
        self.create_token(&user)
    }

    /// Cadastro feito pelo escritório. Usuário repetido vira `Conflict`.
    pub async fn create_user(&self, payload: CreateUserPayload) -> Result<User, AppError> {
        let hashed_password = hash_password(payload.password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .create_user(
                &mut *tx,
                payload.username.trim(),
                &hashed_password,
                payload.full_name.trim(),
                payload.email.as_deref(),
                payload.phone.as_deref(),
                payload.role,
            )
            .await?;
        tx.commit().await?;

        tracing::info!("👤 Usuário {} criado ({})", user.username, user.role.as_str());
        self.bus.publish_entity(
            "user",
            EntityChange::Created,
            json!({ "id": user.id, "username": user.username }),
            Some(format!("Usuário {} criado", user.username)),
        );
        Ok(user)
    }

    // --- Gestão de usuários (escritório) ---

    pub async fn list_users(&self) -> Result<Vec<User>, AppError> {
        self.user_repo.list().await
    }

    pub async fn update_user(&self, actor_id: i64, id: i64, payload: UpdateUserPayload) -> Result<User, AppError> {
        if payload.active == Some(false) {
            ensure_not_self(actor_id, id)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut user = self
            .user_repo
            .find_any(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuário".into()))?;
        payload.apply(&mut user);
        let user = self.user_repo.update_profile(&mut *tx, &user).await?;
        tx.commit().await?;

        tracing::info!("👤 Usuário {} atualizado ({}, ativo={})", user.username, user.role.as_str(), user.active);
        self.announce_user(&user, EntityChange::Updated, format!("Usuário {} atualizado", user.full_name));
        Ok(user)
    }

    /// Desativa a conta. As movimentações de estoque continuam apontando para ela.
    pub async fn deactivate_user(&self, actor_id: i64, id: i64) -> Result<(), AppError> {
        ensure_not_self(actor_id, id)?;

        let mut tx = self.pool.begin().await?;
        let mut user = self
            .user_repo
            .find_any(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuário".into()))?;
        user.active = false;
        let user = self.user_repo.update_profile(&mut *tx, &user).await?;
        tx.commit().await?;

        tracing::info!("🚫 Usuário {} desativado", user.username);
        self.announce_user(&user, EntityChange::Deleted, format!("Usuário {} removido", user.full_name));
        Ok(())
    }

    pub async fn change_password(&self, id: i64, password: String) -> Result<(), AppError> {
        let hashed_password = hash_password(password).await?;

        let mut tx = self.pool.begin().await?;
        let user = self
            .user_repo
            .find_any(&mut *tx, id)
            .await?
            .ok_or_else(|| AppError::NotFound("Usuário".into()))?;
        self.user_repo.set_password(&mut *tx, id, &hashed_password).await?;
        tx.commit().await?;

        tracing::info!("🔒 Senha de {} alterada", user.username);
        self.announce_user(&user, EntityChange::Updated, format!("Senha alterada para {}", user.full_name));
        Ok(())
    }

    fn announce_user(&self, user: &User, kind: EntityChange, message: String) {
        self.bus.publish_entity(
            "user",
            kind,
            json!({ "id": user.id, "username": user.username }),
            Some(message),
        );
    }

    /// Cria o primeiro PRINCIPAL quando a tabela está vazia e há senha configurada.
    pub async fn ensure_bootstrap_admin(&self, password: Option<&str>) -> Result<(), AppError> {
        let Some(password) = password.filter(|p| !p.is_empty()) else {
            return Ok(());
        };
        if self.user_repo.count().await? > 0 {
            return Ok(());
        }

        let hashed_password = hash_password(password.to_owned()).await?;
        self.user_repo
            .create_user(&self.pool, "admin", &hashed_password, "Administrador", None, None, Role::Principal)
            .await?;
        tracing::warn!("⚠️ Nenhum usuário encontrado: 'admin' criado a partir de BOOTSTRAP_ADMIN_PASSWORD");
        Ok(())
    }

    pub async fn validate_token(&self, token: &str) -> Result<User, AppError> {
        let claims = self.decode_claims(token)?;
        self.user_repo
            .find_by_id(claims.sub)
            .await?
            .ok_or(AppError::InvalidToken)
    }

    pub fn decode_claims(&self, token: &str) -> Result<Claims, AppError> {
        let token_data = decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.jwt_secret.as_ref()),
            &Validation::default(),
        )
        .map_err(|_| AppError::InvalidToken)?;
        Ok(token_data.claims)
    }

    fn create_token(&self, user: &User) -> Result<String, AppError> {
        let now = Utc::now();
        let expires_at = now + chrono::Duration::days(TOKEN_DAYS);

        let claims = Claims {
            sub: user.id,
            role: user.role,
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

// Ninguém desativa a própria conta.
fn ensure_not_self(actor_id: i64, target_id: i64) -> Result<(), AppError> {
    if actor_id == target_id {
        return Err(AppError::ValidationError("Você não pode desativar o seu próprio usuário".into()));
    }
    Ok(())
}

async fn hash_password(password: String) -> Result<String, AppError> {
    let hashed = tokio::task::spawn_blocking(move || hash(&password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| anyhow::anyhow!("Falha na task de hashing: {}", e))??;
    Ok(hashed)
}
