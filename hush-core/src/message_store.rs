use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveValue::Set, ColumnTrait, Condition, DatabaseConnection, EntityTrait, Order, PaginatorTrait,
    QueryFilter, QueryOrder,
};

use hush_db_entities::CachedMessage;

use crate::error::HushError;

/// A message queued for a recipient who was offline when it arrived (§3
/// "Cached message").
#[derive(Debug, Clone)]
pub struct CachedMessageRecord {
    pub id: i64,
    pub sender: String,
    pub recipient: String,
    pub ciphertext: Vec<u8>,
    pub sent_at: DateTime<Utc>,
}

impl From<CachedMessage::Model> for CachedMessageRecord {
    fn from(model: CachedMessage::Model) -> Self {
        Self {
            id: model.id,
            sender: model.sender,
            recipient: model.recipient,
            ciphertext: model.ciphertext,
            sent_at: model.sent_at,
        }
    }
}

/// Narrow persistence interface over the `cached_messages` table (§4.6 MSG/RECIV).
#[async_trait]
pub trait MessageStore: Send + Sync {
    /// `sent_at` is the timestamp the sender supplied on the wire (MSG's
    /// second argument), not the time the server happened to persist the
    /// row, so catch-up replays it unchanged (§3 "Cached message").
    async fn cache(
        &self,
        sender: &str,
        recipient: &str,
        ciphertext: Vec<u8>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), HushError>;

    /// All cached messages for `recipient`, oldest first (§5 "non-decreasing
    /// timestamp order").
    async fn drain(&self, recipient: &str) -> Result<Vec<CachedMessageRecord>, HushError>;

    /// Deletes every entry for `recipient` with `id <= last_delivered_id`
    /// (§9 catch-up deletion-boundary decision). Only called after every
    /// drained message has been successfully emitted.
    async fn delete_up_to(&self, recipient: &str, last_delivered_id: i64) -> Result<(), HushError>;

    /// True if any cached message references `username` as sender or
    /// recipient (§4.6 DEREG's tombstone-vs-delete decision).
    async fn has_any(&self, username: &str) -> Result<bool, HushError>;
}

pub struct SeaOrmMessageStore {
    db: DatabaseConnection,
}

impl SeaOrmMessageStore {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

#[async_trait]
impl MessageStore for SeaOrmMessageStore {
    async fn cache(
        &self,
        sender: &str,
        recipient: &str,
        ciphertext: Vec<u8>,
        sent_at: DateTime<Utc>,
    ) -> Result<(), HushError> {
        let active = CachedMessage::ActiveModel {
            id: sea_orm::ActiveValue::NotSet,
            sender: Set(sender.to_owned()),
            recipient: Set(recipient.to_owned()),
            ciphertext: Set(ciphertext),
            sent_at: Set(sent_at),
        };
        CachedMessage::Entity::insert(active).exec(&self.db).await?;
        Ok(())
    }

    async fn drain(&self, recipient: &str) -> Result<Vec<CachedMessageRecord>, HushError> {
        let models = CachedMessage::Entity::find()
            .filter(CachedMessage::Column::Recipient.eq(recipient))
            .order_by(CachedMessage::Column::Id, Order::Asc)
            .all(&self.db)
            .await?;
        Ok(models.into_iter().map(CachedMessageRecord::from).collect())
    }

    async fn delete_up_to(&self, recipient: &str, last_delivered_id: i64) -> Result<(), HushError> {
        CachedMessage::Entity::delete_many()
            .filter(CachedMessage::Column::Recipient.eq(recipient))
            .filter(CachedMessage::Column::Id.lte(last_delivered_id))
            .exec(&self.db)
            .await?;
        Ok(())
    }

    async fn has_any(&self, username: &str) -> Result<bool, HushError> {
        let count = CachedMessage::Entity::find()
            .filter(
                Condition::any()
                    .add(CachedMessage::Column::Sender.eq(username))
                    .add(CachedMessage::Column::Recipient.eq(username)),
            )
            .count(&self.db)
            .await?;
        Ok(count > 0)
    }
}
