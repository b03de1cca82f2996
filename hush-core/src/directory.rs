use async_trait::async_trait;
use hush_db_entities::Permission;
use sea_orm::{ActiveModelTrait, ActiveValue::Set, DatabaseConnection, EntityTrait};

use hush_db_entities::Principal;

use crate::error::HushError;

/// A registered principal as the rest of the core sees it (the `sea-orm`
/// `Model` stays behind this trait, per the out-of-scope note on schema
/// details in SPEC_FULL.md §1/§6).
#[derive(Debug, Clone)]
pub struct PrincipalRecord {
    pub username: String,
    pub public_key_pem: Option<String>,
    pub permission: Permission,
}

impl PrincipalRecord {
    pub fn is_tombstoned(&self) -> bool {
        self.public_key_pem.is_none()
    }
}

impl TryFrom<Principal::Model> for PrincipalRecord {
    type Error = HushError;

    fn try_from(model: Principal::Model) -> Result<Self, Self::Error> {
        let permission = model
            .permission()
            .map_err(|e| HushError::Other(anyhow::anyhow!(e)))?;
        Ok(Self {
            username: model.username,
            public_key_pem: model.public_key_pem,
            permission,
        })
    }
}

/// Narrow persistence interface over the `principals` table, mirroring
/// `warpgate-core::ConfigProvider`'s shape: callers never see `sea-orm`
/// types directly (SPEC_FULL.md §6 persistence boundary).
#[async_trait]
pub trait Directory: Send + Sync {
    async fn find(&self, username: &str) -> Result<Option<PrincipalRecord>, HushError>;
    async fn insert(&self, username: &str, public_key_pem: &str) -> Result<(), HushError>;
    async fn list(&self) -> Result<Vec<PrincipalRecord>, HushError>;
    /// Permanently removes a principal with no cached-message references.
    async fn delete(&self, username: &str) -> Result<(), HushError>;
    /// Nulls the public key instead of deleting, preserving cached-message
    /// foreign keys (§4.6 DEREG tombstone fallback).
    async fn tombstone(&self, username: &str) -> Result<(), HushError>;
    async fn set_permission(&self, username: &str, permission: Permission) -> Result<(), HushError>;
}

pub struct SeaOrmDirectory {
    db: DatabaseConnection,
}

impl SeaOrmDirectory {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl Directory for SeaOrmDirectory {
    async fn find(&self, username: &str) -> Result<Option<PrincipalRecord>, HushError> {
        let model = Principal::Entity::find_by_id(username.to_owned())
            .one(&self.db)
            .await?;
        model.map(PrincipalRecord::try_from).transpose()
    }

    async fn insert(&self, username: &str, public_key_pem: &str) -> Result<(), HushError> {
        let active = Principal::ActiveModel {
            username: Set(username.to_owned()),
            public_key_pem: Set(Some(public_key_pem.to_owned())),
            permission: Set(Permission::User.as_i16()),
            tombstoned: Set(false),
            created_at: Set(chrono::Utc::now()),
        };
        Principal::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn list(&self) -> Result<Vec<PrincipalRecord>, HushError> {
        Principal::Entity::find()
            .all(&self.db)
            .await?
            .into_iter()
            .map(PrincipalRecord::try_from)
            .collect()
    }

    async fn delete(&self, username: &str) -> Result<(), HushError> {
        Principal::Entity::delete_by_id(username.to_owned())
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn tombstone(&self, username: &str) -> Result<(), HushError> {
        let model = Principal::Entity::find_by_id(username.to_owned())
            .one(&self.db)
            .await?
            .ok_or_else(|| HushError::PrincipalNotFound(username.to_owned()))?;
        let mut active: Principal::ActiveModel = model.into();
        active.public_key_pem = Set(None);
        active.tombstoned = Set(true);
        active.update(&self.db).await?;
        Ok(())
    }

    async fn set_permission(&self, username: &str, permission: Permission) -> Result<(), HushError> {
        let model = Principal::Entity::find_by_id(username.to_owned())
            .one(&self.db)
            .await?
            .ok_or_else(|| HushError::PrincipalNotFound(username.to_owned()))?;
        let mut active: Principal::ActiveModel = model.into();
        active.permission = Set(permission.as_i16());
        active.update(&self.db).await?;
        Ok(())
    }
}
