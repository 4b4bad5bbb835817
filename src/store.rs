use anyhow::Context;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

/// User record as persisted by the store.
///
/// The password hash is carried for verification but never serialized, so
/// handlers can return the record directly as the profile projection.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: Uuid,
    pub name: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub marital_status: MaritalStatus,
    pub children: i32,
    pub education: Option<String>,
    pub address: Option<String>,
    pub profile_picture: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

#[derive(
    Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::Type,
)]
#[sqlx(type_name = "marital_status")]
pub enum MaritalStatus {
    #[default]
    Single,
    Married,
    Divorced,
    Widowed,
}

/// Input for account creation. `password_hash` must already be a digest;
/// plaintext never reaches the store.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub marital_status: Option<MaritalStatus>,
    pub children: Option<i32>,
    pub education: Option<String>,
    pub address: Option<String>,
}

/// Partial profile update: only `Some` fields are applied, everything else
/// is left untouched.
#[derive(Debug, Clone, Default)]
pub struct ProfileChanges {
    pub name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub age: Option<i32>,
    pub marital_status: Option<MaritalStatus>,
    pub children: Option<i32>,
    pub education: Option<String>,
    pub address: Option<String>,
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("email already registered")]
    DuplicateEmail,
    #[error("user store unavailable: {0}")]
    Backend(#[source] anyhow::Error),
}

impl From<sqlx::Error> for StoreError {
    fn from(err: sqlx::Error) -> Self {
        if let sqlx::Error::Database(db_err) = &err {
            // 23505 = unique_violation; the only unique column is the email.
            if db_err.code().as_deref() == Some("23505") {
                return StoreError::DuplicateEmail;
            }
        }
        StoreError::Backend(anyhow::Error::new(err))
    }
}

/// The document-store collaborator: one collection of user records with
/// plain CRUD semantics. Constructed once in the composition root and
/// injected through `AppState`.
#[async_trait]
pub trait UserStore: Send + Sync {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;
    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError>;
    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError>;
    async fn set_profile_picture(
        &self,
        id: Uuid,
        picture: &str,
    ) -> Result<Option<User>, StoreError>;
    /// Cheap connectivity probe for the health endpoint.
    async fn ping(&self) -> Result<(), StoreError>;
}

const USER_COLUMNS: &str = "id, name, email, password_hash, phone, age, marital_status, \
     children, education, address, profile_picture, created_at, updated_at";

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            INSERT INTO users (name, email, password_hash, phone, age, marital_status,
                               children, education, address)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(&new_user.name)
        .bind(&new_user.email)
        .bind(&new_user.password_hash)
        .bind(&new_user.phone)
        .bind(new_user.age)
        .bind(new_user.marital_status.unwrap_or_default())
        .bind(new_user.children.unwrap_or(0))
        .bind(&new_user.education)
        .bind(&new_user.address)
        .fetch_one(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE email = $1"#
        ))
        .bind(email)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"SELECT {USER_COLUMNS} FROM users WHERE id = $1"#
        ))
        .bind(id)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET
                name = COALESCE($2, name),
                email = COALESCE($3, email),
                phone = COALESCE($4, phone),
                age = COALESCE($5, age),
                marital_status = COALESCE($6, marital_status),
                children = COALESCE($7, children),
                education = COALESCE($8, education),
                address = COALESCE($9, address),
                updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(&changes.name)
        .bind(&changes.email)
        .bind(&changes.phone)
        .bind(changes.age)
        .bind(changes.marital_status)
        .bind(changes.children)
        .bind(&changes.education)
        .bind(&changes.address)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn set_profile_picture(
        &self,
        id: Uuid,
        picture: &str,
    ) -> Result<Option<User>, StoreError> {
        let user = sqlx::query_as::<_, User>(&format!(
            r#"
            UPDATE users SET profile_picture = $2, updated_at = now()
            WHERE id = $1
            RETURNING {USER_COLUMNS}
            "#
        ))
        .bind(id)
        .bind(picture)
        .fetch_optional(&self.db)
        .await?;
        Ok(user)
    }

    async fn ping(&self) -> Result<(), StoreError> {
        sqlx::query("SELECT 1")
            .execute(&self.db)
            .await
            .context("store ping")
            .map_err(StoreError::Backend)?;
        Ok(())
    }
}

/// In-memory store with the same uniqueness behavior as the Postgres
/// implementation; backs handler and router tests.
#[cfg(test)]
#[derive(Default)]
pub struct InMemoryUserStore {
    users: tokio::sync::Mutex<Vec<User>>,
}

#[cfg(test)]
#[async_trait]
impl UserStore for InMemoryUserStore {
    async fn create(&self, new_user: NewUser) -> Result<User, StoreError> {
        let mut users = self.users.lock().await;
        if users.iter().any(|u| u.email == new_user.email) {
            return Err(StoreError::DuplicateEmail);
        }
        let now = OffsetDateTime::now_utc();
        let user = User {
            id: Uuid::new_v4(),
            name: new_user.name,
            email: new_user.email,
            password_hash: new_user.password_hash,
            phone: new_user.phone,
            age: new_user.age,
            marital_status: new_user.marital_status.unwrap_or_default(),
            children: new_user.children.unwrap_or(0),
            education: new_user.education,
            address: new_user.address,
            profile_picture: None,
            created_at: now,
            updated_at: now,
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.email == email).cloned())
    }

    async fn find_by_id(&self, id: Uuid) -> Result<Option<User>, StoreError> {
        let users = self.users.lock().await;
        Ok(users.iter().find(|u| u.id == id).cloned())
    }

    async fn update_profile(
        &self,
        id: Uuid,
        changes: ProfileChanges,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().await;
        if !users.iter().any(|u| u.id == id) {
            return Ok(None);
        }
        if let Some(email) = &changes.email {
            if users.iter().any(|u| u.email == *email && u.id != id) {
                return Err(StoreError::DuplicateEmail);
            }
        }
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        if let Some(name) = changes.name {
            user.name = name;
        }
        if let Some(email) = changes.email {
            user.email = email;
        }
        if let Some(phone) = changes.phone {
            user.phone = Some(phone);
        }
        if let Some(age) = changes.age {
            user.age = Some(age);
        }
        if let Some(marital_status) = changes.marital_status {
            user.marital_status = marital_status;
        }
        if let Some(children) = changes.children {
            user.children = children;
        }
        if let Some(education) = changes.education {
            user.education = Some(education);
        }
        if let Some(address) = changes.address {
            user.address = Some(address);
        }
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn set_profile_picture(
        &self,
        id: Uuid,
        picture: &str,
    ) -> Result<Option<User>, StoreError> {
        let mut users = self.users.lock().await;
        let Some(user) = users.iter_mut().find(|u| u.id == id) else {
            return Ok(None);
        };
        user.profile_picture = Some(picture.to_string());
        user.updated_at = OffsetDateTime::now_utc();
        Ok(Some(user.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}
