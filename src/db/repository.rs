// src/db/repository.rs

use std::{collections::HashSet, marker::PhantomData, sync::Arc};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::{Map, Value};

use crate::{
    common::error::AppError,
    db::store::{to_document_body, Collection, DocumentStore, Query},
    models::{
        catalog::{Category, Item},
        client::Client,
        settings::ConfigEntry,
        user::User,
    },
};

/// Entidade "plana" gravada como documento sem conversões especiais.
pub trait Record: Serialize + DeserializeOwned + Send + Sync {
    const COLLECTION: Collection;

    fn id(&self) -> &str;
}

impl Record for Client {
    const COLLECTION: Collection = Collection::Clients;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Item {
    const COLLECTION: Collection = Collection::Items;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for Category {
    const COLLECTION: Collection = Collection::Categories;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for ConfigEntry {
    const COLLECTION: Collection = Collection::Settings;
    fn id(&self) -> &str {
        &self.id
    }
}

impl Record for User {
    const COLLECTION: Collection = Collection::Users;
    fn id(&self) -> &str {
        &self.id
    }
}

pub struct Repository<T> {
    store: Arc<dyn DocumentStore>,
    _record: PhantomData<fn() -> T>,
}

// Manual: o derive exigiria `T: Clone`.
impl<T> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            _record: PhantomData,
        }
    }
}

impl<T: Record> Repository<T> {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self {
            store,
            _record: PhantomData,
        }
    }

    /// Lista registros. Documentos que não convertem são pulados (com aviso).
    pub async fn list(&self, query: &Query) -> Result<Vec<T>, AppError> {
        let docs = self.store.list(T::COLLECTION, query).await?;
        let mut records = Vec::with_capacity(docs.len());
        for doc in docs {
            let id = doc.id.clone();
            match doc.into_record::<T>() {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("Documento {}/{} ignorado: {}", T::COLLECTION, id, e),
            }
        }
        Ok(records)
    }

    pub async fn find(&self, id: &str) -> Result<Option<T>, AppError> {
        match self.store.get(T::COLLECTION, id).await? {
            Some(doc) => Ok(Some(doc.into_record()?)),
            None => Ok(None),
        }
    }

    /// Primeiro registro com `field == value`.
    pub async fn find_one(&self, field: &str, value: impl Into<Value>) -> Result<Option<T>, AppError> {
        let query = Query::new().eq(field, value);
        Ok(self.list(&query).await?.into_iter().next())
    }

    pub async fn count(&self, query: &Query) -> Result<usize, AppError> {
        Ok(self.store.list(T::COLLECTION, query).await?.len())
    }

    pub async fn insert(&self, record: &T) -> Result<T, AppError> {
        let body = to_document_body(record)?;
        let doc = self.store.create(T::COLLECTION, record.id(), body).await?;
        doc.into_record()
    }

    /// Regrava todos os campos do registro.
    pub async fn save(&self, record: &T) -> Result<bool, AppError> {
        let body = to_document_body(record)?;
        self.store.update_fields(T::COLLECTION, record.id(), body).await
    }

    pub async fn update_fields(&self, id: &str, fields: Map<String, Value>) -> Result<bool, AppError> {
        self.store.update_fields(T::COLLECTION, id, fields).await
    }

    pub async fn delete(&self, id: &str) -> Result<bool, AppError> {
        self.store.delete(T::COLLECTION, id).await
    }
}

// =========================================================================
//  BUSCAS ESPECÍFICAS (usadas nas checagens de unicidade)
// =========================================================================

impl Repository<Client> {
    /// E-mails são gravados já normalizados (trim + minúsculas).
    pub async fn find_by_email(&self, email: &str) -> Result<Option<Client>, AppError> {
        self.find_one("email", email.trim().to_lowercase()).await
    }
}

impl Repository<Item> {
    pub async fn find_by_code(&self, codigo: &str) -> Result<Option<Item>, AppError> {
        self.find_one("codigo", codigo.trim().to_uppercase()).await
    }

    pub async fn count_by_category(&self, categoria_id: &str) -> Result<usize, AppError> {
        self.count(&Query::new().eq("categoria_id", categoria_id)).await
    }
}

impl Repository<Category> {
    /// Nome sem diferenciar maiúsculas/minúsculas nem espaços nas pontas.
    pub async fn find_by_name(&self, nombre: &str) -> Result<Option<Category>, AppError> {
        let wanted = nombre.trim().to_lowercase();
        Ok(self
            .list(&Query::new())
            .await?
            .into_iter()
            .find(|c| c.nombre.trim().to_lowercase() == wanted))
    }
}

impl Repository<ConfigEntry> {
    pub async fn find_by_key(&self, clave: &str) -> Result<Option<ConfigEntry>, AppError> {
        self.find_one("clave", clave.trim()).await
    }
}

impl Repository<User> {
    /// E-mails dos usuários ativos que pediram notificações por e-mail.
    pub async fn list_email_recipients(&self) -> Result<Vec<String>, AppError> {
        let mut seen = HashSet::new();
        Ok(self
            .list(&Query::new())
            .await?
            .into_iter()
            .filter(|u| u.activo && u.notificaciones_email)
            .map(|u| u.email.trim().to_string())
            .filter(|e| !e.is_empty() && seen.insert(e.to_lowercase()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::memory_store::MemoryDocumentStore;
    use serde_json::json;

    fn store() -> Arc<dyn DocumentStore> {
        Arc::new(MemoryDocumentStore::new())
    }

    async fn seed(store: &Arc<dyn DocumentStore>, collection: Collection, id: &str, data: Value) {
        let Value::Object(map) = data else { panic!("objeto esperado") };
        store.create(collection, id, map).await.unwrap();
    }

    #[tokio::test]
    async fn category_lookup_ignores_case() {
        let store = store();
        seed(&store, Collection::Categories, "c1", json!({"nombre": "Audio", "activo": true})).await;
        let repo: Repository<Category> = Repository::new(store);

        let found = repo.find_by_name("  aUDIO ").await.unwrap();
        assert_eq!(found.map(|c| c.id), Some("c1".to_string()));
        assert!(repo.find_by_name("Video").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn recipients_are_active_users_with_email_notifications() {
        let store = store();
        seed(&store, Collection::Users, "u1", json!({"nombre": "Ana", "email": "ana@av.mx", "activo": true, "notificaciones_email": true})).await;
        seed(&store, Collection::Users, "u2", json!({"nombre": "Beto", "email": "beto@av.mx", "activo": false, "notificaciones_email": true})).await;
        seed(&store, Collection::Users, "u3", json!({"nombre": "Caro", "email": "caro@av.mx", "activo": true, "notificaciones_email": false})).await;
        let repo: Repository<User> = Repository::new(store);

        assert_eq!(repo.list_email_recipients().await.unwrap(), vec!["ana@av.mx".to_string()]);
    }

    #[tokio::test]
    async fn broken_documents_are_skipped_in_listings() {
        let store = store();
        seed(&store, Collection::Clients, "ok", json!({"nombre": "Acme", "email": "a@acme.mx"})).await;
        seed(&store, Collection::Clients, "bad", json!({"email": 42})).await;
        let repo: Repository<Client> = Repository::new(store);

        let all = repo.list(&Query::new()).await.unwrap();
        assert_eq!(all.len(), 1);
        assert!(all[0].activo);
    }
}
