use chrono::{DateTime, Utc};
use sea_orm::entity::prelude::*;

/// A message queued for a recipient who was offline when it was sent (§4.5,
/// §9). `id` is a surrogate autoincrement key, not a timestamp: catch-up
/// delivery deletes by `id <= last_delivered_id` rather than by `sent_at`, so
/// two messages landing in the same instant never race each other out.
#[derive(Clone, Debug, PartialEq, Eq, DeriveEntityModel)]
#[sea_orm(table_name = "cached_messages")]
pub struct Model {
    #[sea_orm(primary_key)]
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub ciphertext: Vec<u8>,
    pub sent_at: DateTime<Utc>,
}

#[derive(Copy, Clone, Debug, EnumIter)]
pub enum Relation {
    Sender,
    Recipient,
}

impl RelationTrait for Relation {
    fn def(&self) -> RelationDef {
        match self {
            Self::Sender => Entity::belongs_to(super::Principal::Entity)
                .from(Column::Sender)
                .to(super::Principal::Column::Username)
                .into(),
            Self::Recipient => Entity::belongs_to(super::Principal::Entity)
                .from(Column::Recipient)
                .to(super::Principal::Column::Username)
                .into(),
        }
    }
}

impl ActiveModelBehavior for ActiveModel {}
