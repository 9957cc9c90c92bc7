use crate::error::{StoreError, StoreResult};
use crate::models::{Message, SenderCount};
use crate::query::{CursorMode, FindOptions, MessageField, MessageFilter, SortDirection};
use crate::repository::{ensure_storable, ensure_text_field, MessageRepository};
use async_trait::async_trait;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPool;
use sqlx::{Postgres, QueryBuilder};
use tracing::debug;

pub static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

const SELECT_MESSAGES: &str =
    "SELECT id, conversation_id, sender_id, content, metadata, \"timestamp\" FROM messages";

/// Postgres bind parameters per statement are capped at 65535.
const INSERT_CHUNK: usize = 1000;

/// PostgreSQL-backed message repository.
#[derive(Clone)]
pub struct PgMessageRepository {
    pool: PgPool,
}

impl PgMessageRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Apply pending schema migrations.
    pub async fn migrate(&self) -> StoreResult<()> {
        MIGRATOR.run(&self.pool).await?;
        debug!("Message store migrations applied");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

fn push_where(qb: &mut QueryBuilder<'_, Postgres>, filter: &MessageFilter) {
    qb.push(" WHERE TRUE");

    if let Some(conversation_id) = &filter.conversation_id {
        qb.push(" AND conversation_id = ")
            .push_bind(conversation_id.clone());
    }
    if let Some(sender_id) = &filter.sender_id {
        qb.push(" AND sender_id = ").push_bind(sender_id.clone());
    }
    if let Some(ids) = &filter.ids {
        qb.push(" AND id = ANY(").push_bind(ids.clone()).push(")");
    }
    if let Some(keyset) = &filter.keyset {
        match keyset.mode {
            CursorMode::Loose => {
                let op = match keyset.direction {
                    SortDirection::Asc => ">=",
                    SortDirection::Desc => "<=",
                };
                qb.push(format!(" AND \"timestamp\" {} ", op))
                    .push_bind(keyset.last_timestamp)
                    .push(" AND id >= ")
                    .push_bind(keyset.last_id.clone());
            }
            CursorMode::Composite => {
                let op = match keyset.direction {
                    SortDirection::Asc => ">",
                    SortDirection::Desc => "<",
                };
                qb.push(format!(" AND (\"timestamp\" {} ", op))
                    .push_bind(keyset.last_timestamp)
                    .push(" OR (\"timestamp\" = ")
                    .push_bind(keyset.last_timestamp)
                    .push(" AND id >= ")
                    .push_bind(keyset.last_id.clone())
                    .push("))");
            }
        }
    }
}

fn push_order_and_limit(qb: &mut QueryBuilder<'_, Postgres>, options: &FindOptions) {
    for (i, key) in options.sort.iter().enumerate() {
        qb.push(if i == 0 { " ORDER BY " } else { ", " });
        qb.push(key.field.column())
            .push(" ")
            .push(key.direction.as_sql());
    }
    if let Some(limit) = options.limit {
        qb.push(" LIMIT ").push_bind(limit.max(0));
    }
}

#[async_trait]
impl MessageRepository for PgMessageRepository {
    async fn find(
        &self,
        filter: &MessageFilter,
        options: &FindOptions,
    ) -> StoreResult<Vec<Message>> {
        let mut qb = QueryBuilder::<Postgres>::new(SELECT_MESSAGES);
        push_where(&mut qb, filter);
        push_order_and_limit(&mut qb, options);

        let messages = qb
            .build_query_as::<Message>()
            .fetch_all(&self.pool)
            .await?;
        Ok(messages)
    }

    async fn find_by_id(&self, id: &str) -> StoreResult<Option<Message>> {
        let message = sqlx::query_as::<_, Message>(&format!("{} WHERE id = $1", SELECT_MESSAGES))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(message)
    }

    async fn create(&self, message: &Message) -> StoreResult<()> {
        ensure_storable(std::slice::from_ref(message))?;
        let result = sqlx::query(
            r#"
            INSERT INTO messages (id, conversation_id, sender_id, content, metadata, "timestamp")
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(&message.id)
        .bind(&message.conversation_id)
        .bind(&message.sender_id)
        .bind(&message.content)
        .bind(&message.metadata)
        .bind(message.timestamp)
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(()),
            Err(sqlx::Error::Database(db)) if db.is_unique_violation() => {
                Err(StoreError::Duplicate(message.id.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    async fn insert_many(&self, messages: &[Message]) -> StoreResult<u64> {
        ensure_storable(messages)?;
        let mut inserted = 0;

        for chunk in messages.chunks(INSERT_CHUNK) {
            let mut qb = QueryBuilder::<Postgres>::new(
                "INSERT INTO messages (id, conversation_id, sender_id, content, metadata, \"timestamp\") ",
            );
            qb.push_values(chunk, |mut row, message| {
                row.push_bind(message.id.clone())
                    .push_bind(message.conversation_id.clone())
                    .push_bind(message.sender_id.clone())
                    .push_bind(message.content.clone())
                    .push_bind(message.metadata.clone())
                    .push_bind(message.timestamp);
            });
            qb.push(" ON CONFLICT (id) DO NOTHING");

            let result = qb.build().execute(&self.pool).await?;
            inserted += result.rows_affected();
        }

        debug!(
            requested = messages.len(),
            inserted, "Inserted message batch"
        );
        Ok(inserted)
    }

    async fn delete_many(&self, filter: &MessageFilter) -> StoreResult<u64> {
        let mut qb = QueryBuilder::<Postgres>::new("DELETE FROM messages");
        push_where(&mut qb, filter);
        let result = qb.build().execute(&self.pool).await?;
        Ok(result.rows_affected())
    }

    async fn aggregate(&self, filter: &MessageFilter) -> StoreResult<Vec<SenderCount>> {
        let mut qb =
            QueryBuilder::<Postgres>::new("SELECT sender_id, COUNT(*) AS message_count FROM messages");
        push_where(&mut qb, filter);
        qb.push(" GROUP BY sender_id ORDER BY message_count DESC, sender_id ASC");

        let counts = qb
            .build_query_as::<SenderCount>()
            .fetch_all(&self.pool)
            .await?;
        Ok(counts)
    }

    async fn distinct(
        &self,
        field: MessageField,
        filter: &MessageFilter,
    ) -> StoreResult<Vec<String>> {
        ensure_text_field(field)?;
        let column = field.column();

        let mut qb = QueryBuilder::<Postgres>::new(format!("SELECT DISTINCT {} FROM messages", column));
        push_where(&mut qb, filter);
        qb.push(format!(" ORDER BY {} ASC", column));

        let values = qb
            .build_query_scalar::<String>()
            .fetch_all(&self.pool)
            .await?;
        Ok(values)
    }
}
