use crate::{
    auth::{hash_password, verify_password},
    db::DbPool,
    entities::{user, UserRole},
    errors::ServiceError,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, PaginatorTrait, QueryFilter,
    QueryOrder, Set,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument, warn};
use utoipa::ToSchema;
use uuid::Uuid;
use validator::Validate;

#[derive(Debug, Clone, Serialize, Deserialize, Validate, ToSchema)]
pub struct CreateUserInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1, max = 255))]
    pub name: String,
    #[validate(length(min = 8, max = 128))]
    pub password: String,
    pub role: UserRole,
}

#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct LoginInput {
    #[validate(email)]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

pub struct UserService {
    db_pool: Arc<DbPool>,
}

impl UserService {
    pub fn new(db_pool: Arc<DbPool>) -> Self {
        Self { db_pool }
    }

    #[instrument(skip(self, input), fields(email = %input.email, role = %input.role))]
    pub async fn create_user(&self, input: CreateUserInput) -> Result<user::Model, ServiceError> {
        input.validate()?;
        let email = input.email.trim().to_ascii_lowercase();
        let password_hash = hash_password(&input.password)?;

        let created = user::ActiveModel {
            email: Set(email.clone()),
            name: Set(input.name.trim().to_string()),
            password_hash: Set(password_hash),
            role: Set(input.role),
            active: Set(true),
            ..Default::default()
        }
        .insert(&*self.db_pool)
        .await
        .map_err(|e| ServiceError::from_write(e, format!("User {} already exists", email)))?;

        info!(user_id = %created.id, "user created");
        Ok(created)
    }

    #[instrument(skip(self))]
    pub async fn list_users(
        &self,
        role: Option<UserRole>,
        page: u64,
        per_page: u64,
    ) -> Result<(Vec<user::Model>, u64), ServiceError> {
        let mut query = user::Entity::find();
        if let Some(role) = role {
            query = query.filter(user::Column::Role.eq(role));
        }
        let paginator = query
            .order_by_asc(user::Column::Email)
            .paginate(&*self.db_pool, per_page);
        let total = paginator.num_items().await?;
        let users = paginator.fetch_page(page.saturating_sub(1)).await?;
        Ok((users, total))
    }

    #[instrument(skip(self))]
    pub async fn get_user(&self, id: Uuid) -> Result<user::Model, ServiceError> {
        user::Entity::find_by_id(id)
            .one(&*self.db_pool)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("User {} not found", id)))
    }

    #[instrument(skip(self))]
    pub async fn set_active(&self, id: Uuid, active: bool) -> Result<user::Model, ServiceError> {
        let user = self.get_user(id).await?;
        let mut model = user.into_active_model();
        model.active = Set(active);
        let user = model.update(&*self.db_pool).await?;
        info!(user_id = %user.id, active, "user activation changed");
        Ok(user)
    }

    /// Checks credentials. Unknown emails and bad passwords are
    /// indistinguishable to the caller.
    #[instrument(skip(self, password))]
    pub async fn authenticate(&self, email: &str, password: &str) -> Result<user::Model, ServiceError> {
        let email = email.trim().to_ascii_lowercase();
        let invalid = || ServiceError::Unauthorized("Invalid email or password".to_string());

        let user = user::Entity::find()
            .filter(user::Column::Email.eq(email.as_str()))
            .one(&*self.db_pool)
            .await?
            .ok_or_else(invalid)?;
        if !verify_password(password, &user.password_hash)? {
            warn!(user_id = %user.id, "failed login");
            return Err(invalid());
        }
        if !user.active {
            return Err(ServiceError::Unauthorized("Account is disabled".to_string()));
        }
        Ok(user)
    }
}
