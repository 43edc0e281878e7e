// src/db/store.rs

use std::fmt;

use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::common::error::AppError;

/// As coleções do sistema.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Quotes,
    Clients,
    Items,
    Categories,
    Users,
    Settings,
}

impl Collection {
    pub const fn name(self) -> &'static str {
        match self {
            Collection::Quotes => "cotizaciones",
            Collection::Clients => "clientes",
            Collection::Items => "items",
            Collection::Categories => "categorias",
            Collection::Users => "usuarios",
            Collection::Settings => "configuracion",
        }
    }
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterOp {
    Eq,
    Gte,
    Lte,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    pub field: String,
    pub op: FilterOp,
    pub value: Value,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Asc,
    Desc,
}

/// Filtros simples (igualdade/intervalo) + ordenação por um único campo.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Query {
    pub filters: Vec<Filter>,
    pub order_by: Option<(String, Direction)>,
}

impl Query {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op: FilterOp::Eq, value: value.into() });
        self
    }

    pub fn gte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op: FilterOp::Gte, value: value.into() });
        self
    }

    pub fn lte(mut self, field: &str, value: impl Into<Value>) -> Self {
        self.filters.push(Filter { field: field.to_string(), op: FilterOp::Lte, value: value.into() });
        self
    }

    pub fn order_by(mut self, field: &str, direction: Direction) -> Self {
        self.order_by = Some((field.to_string(), direction));
        self
    }
}

/// Um documento: id + corpo JSON (sem o id dentro).
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub data: Map<String, Value>,
}

impl Document {
    /// Converte para um registro tipado, injetando o `id` no corpo.
    pub fn into_record<T: DeserializeOwned>(self) -> Result<T, AppError> {
        let mut data = self.data;
        data.insert("id".to_string(), Value::String(self.id));
        Ok(serde_json::from_value(Value::Object(data))?)
    }
}

/// Serializa um registro como corpo de documento (o `id` fica de fora).
pub fn to_document_body<T: Serialize>(record: &T) -> Result<Map<String, Value>, AppError> {
    match serde_json::to_value(record)? {
        Value::Object(mut map) => {
            map.remove("id");
            Ok(map)
        }
        other => Err(AppError::InternalServerError(anyhow::anyhow!(
            "registro não serializa como objeto: {}",
            other
        ))),
    }
}

/// O contrato mínimo que os serviços precisam do armazenamento.
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn list(&self, collection: Collection, query: &Query) -> Result<Vec<Document>, AppError>;

    async fn get(&self, collection: Collection, id: &str) -> Result<Option<Document>, AppError>;

    async fn create(
        &self,
        collection: Collection,
        id: &str,
        data: Map<String, Value>,
    ) -> Result<Document, AppError>;

    /// Faz merge raso de `fields` no documento. `false` se o id não existe.
    async fn update_fields(
        &self,
        collection: Collection,
        id: &str,
        fields: Map<String, Value>,
    ) -> Result<bool, AppError>;

    async fn delete(&self, collection: Collection, id: &str) -> Result<bool, AppError>;
}
