use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

use crate::permission::{Permission, UnknownPermission};

/// A registered username (§2 GLOSSARY: "Principal"). `public_key_pem` is
/// `None` only for the brief window between a tombstoned deregistration and
/// the row's eventual cleanup; callers should treat such rows as absent.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "principals")]
pub struct Model {
    #[sea_orm(primary_key, auto_increment = false)]
    pub username: String,
    pub public_key_pem: Option<String>,
    pub permission: i16,
    pub tombstoned: bool,
    pub created_at: DateTime<Utc>,
}

impl Model {
    pub fn permission(&self) -> Result<Permission, UnknownPermission> {
        Permission::try_from(self.permission)
    }

    pub fn is_active(&self) -> bool {
        !self.tombstoned && self.public_key_pem.is_some()
    }
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    CachedMessagesSent,
    CachedMessagesReceived,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::CachedMessagesSent => Entity::has_many(super::CachedMessage::Entity)
                .from(Column::Username)
                .to(super::CachedMessage::Column::Sender)
                .into(),
            Self::CachedMessagesReceived => Entity::has_many(super::CachedMessage::Entity)
                .from(Column::Username)
                .to(super::CachedMessage::Column::Recipient)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
