// src/db/pg_store.rs

use async_trait::async_trait;
use serde_json::{Map, Value};
use sqlx::{PgPool, Postgres, QueryBuilder};

use crate::{
    common::error::AppError,
    db::store::{Collection, Direction, Document, DocumentStore, FilterOp, Query},
};

// Documentos em Postgres: tabela única `documents` com o corpo em JSONB.
#[derive(Clone)]
pub struct PgDocumentStore {
    pool: PgPool,
}

impl PgDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

fn into_document((id, data): (String, Value)) -> Document {
    let data = match data {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    Document { id, data }
}

#[async_trait]
impl DocumentStore for PgDocumentStore {
    async fn list(&self, collection: Collection, query: &Query) -> Result<Vec<Document>, AppError> {
        let mut qb: QueryBuilder<Postgres> =
            QueryBuilder::new("SELECT id, data FROM documents WHERE collection = ");
        qb.push_bind(collection.name());

        for filter in &query.filters {
            // `data -> campo` compara JSONB com JSONB (números com números, strings com strings)
            qb.push(" AND data -> ");
            qb.push_bind(filter.field.clone());
            qb.push(match filter.op {
                FilterOp::Eq => " = ",
                FilterOp::Gte => " >= ",
                FilterOp::Lte => " <= ",
            });
            qb.push_bind(filter.value.clone());
        }

        match &query.order_by {
            Some((field, direction)) => {
                qb.push(" ORDER BY data -> ");
                qb.push_bind(field.clone());
                qb.push(match direction {
                    Direction::Asc => " ASC NULLS LAST",
                    Direction::Desc => " DESC NULLS LAST",
                });
                qb.push(", created_at ASC");
            }
            // Ordem "natural": ordem de inserção
            None => {
                qb.push(" ORDER BY created_at ASC, id ASC");
            }
        }

        let rows: Vec<(String, Value)> = qb.build_query_as().fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(into_document).collect())
    }

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, AppError> {
        let row = sqlx::query_as::<_, (String, Value)>(
            "SELECT id, data FROM documents WHERE collection = $1 AND id = $2",
        )
        .bind(collection.name())
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(into_document))
    }

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, AppError> {
        let row = sqlx::query_as::<_, (String, Value)>(
            "INSERT INTO documents (collection, id, data) VALUES ($1, $2, $3) RETURNING id, data",
        )
        .bind(collection.name())
        .bind(id)
        .bind(Value::Object(data))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            // Converte erro de violação de chave única em um erro mais amigável
            if let Some(db_err) = e.as_database_error() {
                if db_err.is_unique_violation() {
                    return AppError::validation(format!(
                        "Ya existe un documento '{}' en {}",
                        id, collection
                    ));
                }
            }
            AppError::DatabaseError(e)
        })?;

        Ok(into_document(row))
    }

    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, AppError> {
        // `||` faz merge raso: chaves novas entram, existentes são sobrescritas
        let result = sqlx::query(
            r#"
            UPDATE documents
            SET data = data || $3, updated_at = NOW()
            WHERE collection = $1 AND id = $2
            "#,
        )
        .bind(collection.name())
        .bind(id)
        .bind(Value::Object(fields))
        .execute(&self.pool)
        .await?;

        Ok(result.rows_affected() > 0)
    }

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, AppError> {
        let result = sqlx::query("DELETE FROM documents WHERE collection = $1 AND id = $2")
            .bind(collection.name())
            .bind(id)
            .execute(&self.pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }
}
