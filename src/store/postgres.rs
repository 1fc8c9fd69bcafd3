use serde_json::{Map, Value};
use sqlx::{types::Json, PgPool};
use uuid::Uuid;

use super::{Collection, Document, DocumentStore, Filter, Mutation};
use crate::error::{AppError, AppResult};

/// Document store on a single PostgreSQL `documents` table with JSONB bodies
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

/// Folds equality filters into one JSONB object for a containment (`@>`)
/// match. Only scalar filter values are exact equality under containment.
fn containment_criteria(filters: &[Filter]) -> Value {
    let mut criteria = Map::new();
    for filter in filters {
        criteria.insert(filter.field.to_string(), filter.value.clone());
    }
    Value::Object(criteria)
}

/// Advisory lock key for a single document
fn lock_key(collection: Collection, key: &str) -> String {
    format!("{}/{}", collection, key)
}

const UPSERT_SQL: &str = r#"
    INSERT INTO documents (collection, key, body)
    VALUES ($1, $2, $3)
    ON CONFLICT (collection, key) DO UPDATE SET body = EXCLUDED.body
"#;

#[async_trait::async_trait]
impl DocumentStore for PgDocumentStore {
    async fn get(&self, collection: Collection, key: &str) -> AppResult<Option<Value>> {
        let body = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND key = $2",
        )
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(body.map(|Json(value)| value))
    }

    async fn set(&self, collection: Collection, key: &str, document: Value) -> AppResult<()> {
        sqlx::query(UPSERT_SQL)
            .bind(collection.as_str())
            .bind(key)
            .bind(Json(document))
            .execute(&self.pool)
            .await?;
        Ok(())
    }

    async fn add(&self, collection: Collection, document: Value) -> AppResult<String> {
        let key = Uuid::new_v4().simple().to_string();
        sqlx::query("INSERT INTO documents (collection, key, body) VALUES ($1, $2, $3)")
            .bind(collection.as_str())
            .bind(&key)
            .bind(Json(document))
            .execute(&self.pool)
            .await?;
        Ok(key)
    }

    async fn update_field(
        &self,
        collection: Collection,
        key: &str,
        field: &str,
        value: Value,
    ) -> AppResult<()> {
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(body, $3::text[], $4, true)
            WHERE collection = $1 AND key = $2
            "#,
        )
        .bind(collection.as_str())
        .bind(key)
        .bind(vec![field.to_string()])
        .bind(Json(value))
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            return Err(AppError::NotFound(format!("{}/{}", collection, key)));
        }
        Ok(())
    }

    async fn query(&self, collection: Collection, filters: &[Filter]) -> AppResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, Json<Value>)>(
            r#"
            SELECT key, body FROM documents
            WHERE collection = $1 AND body @> $2
            ORDER BY created_at, key
            "#,
        )
        .bind(collection.as_str())
        .bind(Json(containment_criteria(filters)))
        .fetch_all(&self.pool)
        .await?;

        Ok(rows
            .into_iter()
            .map(|(key, Json(body))| Document { key, body })
            .collect())
    }

    async fn run_transaction(
        &self,
        collection: Collection,
        key: &str,
        mutation: Mutation,
    ) -> AppResult<()> {
        let mut tx = self.pool.begin().await?;

        // Row locks cannot cover a document that does not exist yet, so the
        // whole key is guarded by a transaction-scoped advisory lock
        sqlx::query("SELECT pg_advisory_xact_lock(hashtextextended($1, 0))")
            .bind(lock_key(collection, key))
            .execute(&mut *tx)
            .await?;

        let current = sqlx::query_scalar::<_, Json<Value>>(
            "SELECT body FROM documents WHERE collection = $1 AND key = $2",
        )
        .bind(collection.as_str())
        .bind(key)
        .fetch_optional(&mut *tx)
        .await?;

        // Dropping `tx` on error rolls back and releases the lock
        let updated = mutation(current.map(|Json(value)| value))?;

        sqlx::query(UPSERT_SQL)
            .bind(collection.as_str())
            .bind(key)
            .bind(Json(updated))
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }
}
