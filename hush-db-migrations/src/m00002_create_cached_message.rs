use sea_orm::Schema;
use sea_orm_migration::prelude::*;

pub mod cached_message {
    use chrono::{DateTime, Utc};
    use sea_orm::entity::prelude::*;

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

    #[derive(Copy, Clone, Debug, EnumIter, DeriveRelation)]
    pub enum Relation {}

    impl ActiveModelBehavior for ActiveModel {}
}

pub struct Migration;

impl MigrationName for Migration {
    fn name(&self) -> &str {
        "m00002_create_cached_message"
    }
}

#[async_trait::async_trait]
impl MigrationTrait for Migration {
    async fn up(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        let builder = manager.get_database_backend();
        let schema = Schema::new(builder);
        manager
            .create_table(schema.create_table_from_entity(cached_message::Entity))
            .await?;
        manager
            .create_index(
                Index::create()
                    .name("idx_cached_messages_recipient")
                    .table(cached_message::Entity)
                    .col(cached_message::Column::Recipient)
                    .to_owned(),
            )
            .await
    }

    async fn down(&self, manager: &SchemaManager) -> Result<(), DbErr> {
        manager
            .drop_table(Table::drop().table(cached_message::Entity).to_owned())
            .await
    }
}
