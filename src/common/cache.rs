// src/common/cache.rs

use std::{
    collections::HashMap,
    future::Future,
    sync::Arc,
    time::{Duration, Instant},
};

use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;

use crate::common::error::AppError;

/// Forma da consulta; cada uma tem seu próprio TTL.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    List,
    Detail,
    Stats,
}

#[derive(Debug, Clone, Copy)]
pub struct CacheTtls {
    pub list: Duration,
    pub detail: Duration,
    pub stats: Duration,
}

impl CacheTtls {
    pub fn for_shape(&self, shape: QueryShape) -> Duration {
        match shape {
            QueryShape::List => self.list,
            QueryShape::Detail => self.detail,
            QueryShape::Stats => self.stats,
        }
    }
}

impl Default for CacheTtls {
    fn default() -> Self {
        Self {
            list: Duration::from_secs(300),
            detail: Duration::from_secs(600),
            stats: Duration::from_secs(120),
        }
    }
}

#[derive(Debug)]
struct CacheEntry {
    value: Value,
    expires_at: Instant,
}

#[derive(Debug, Default)]
struct CacheState {
    entries: HashMap<String, CacheEntry>,
    // Sobe a cada invalidação; leitura que começou antes não grava.
    generations: HashMap<String, u64>,
}

impl CacheState {
    fn generation(&self, entity: &str) -> u64 {
        self.generations.get(entity).copied().unwrap_or(0)
    }
}

fn entity_of(key: &str) -> &str {
    key.split(':').next().unwrap_or(key)
}

/// Cache de leituras em memória, com expiração por entrada.
///
/// As chaves seguem `"<entidade>:<forma>:<parâmetros>"`; uma escrita numa
/// entidade invalida o prefixo inteiro (`"<entidade>:"`).
#[derive(Clone)]
pub struct QueryCache {
    state: Arc<RwLock<CacheState>>,
    ttls: CacheTtls,
}

impl QueryCache {
    pub fn new(ttls: CacheTtls) -> Self {
        Self {
            state: Arc::new(RwLock::new(CacheState::default())),
            ttls,
        }
    }

    pub fn key(entity: &str, shape: QueryShape, params: &str) -> String {
        let shape = match shape {
            QueryShape::List => "list",
            QueryShape::Detail => "detail",
            QueryShape::Stats => "stats",
        };
        format!("{}:{}:{}", entity, shape, params)
    }

    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Option<T> {
        let state = self.state.read().await;
        let entry = state.entries.get(key)?;
        if entry.expires_at <= Instant::now() {
            return None;
        }
        serde_json::from_value(entry.value.clone()).ok()
    }

    pub async fn put<T: Serialize>(&self, key: String, shape: QueryShape, value: &T) {
        self.put_if_current(key, shape, value, None).await;
    }

    // Com `seen`, só grava se a entidade não foi invalidada desde então.
    async fn put_if_current<T: Serialize>(&self, key: String, shape: QueryShape, value: &T, seen: Option<u64>) {
        let value = match serde_json::to_value(value) {
            Ok(v) => v,
            Err(e) => {
                tracing::warn!("Valor não cacheável em {}: {}", key, e);
                return;
            }
        };
        let expires_at = Instant::now() + self.ttls.for_shape(shape);
        let mut state = self.state.write().await;
        if let Some(seen) = seen {
            if state.generation(entity_of(&key)) != seen {
                tracing::debug!("cache descartado (invalidado durante a leitura): {}", key);
                return;
            }
        }
        state.entries.insert(key, CacheEntry { value, expires_at });
    }

    /// Lê do cache ou executa `load` e guarda o resultado.
    pub async fn get_or_load<T, F, Fut>(
        &self,
        key: String,
        shape: QueryShape,
        load: F,
    ) -> Result<T, AppError>
    where
        T: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<T, AppError>>,
    {
        if let Some(hit) = self.get::<T>(&key).await {
            tracing::debug!("cache hit: {}", key);
            return Ok(hit);
        }
        let seen = self.state.read().await.generation(entity_of(&key));
        let fresh = load().await?;
        self.put_if_current(key, shape, &fresh, Some(seen)).await;
        Ok(fresh)
    }

    /// Remove todas as entradas de uma entidade.
    pub async fn invalidate_entity(&self, entity: &str) {
        let prefix = format!("{}:", entity);
        let mut state = self.state.write().await;
        state.entries.retain(|k, _| !k.starts_with(&prefix));
        *state.generations.entry(entity.to_string()).or_default() += 1;
    }

    /// Remove entradas vencidas; devolve quantas saíram.
    pub async fn sweep(&self) -> usize {
        let now = Instant::now();
        let mut state = self.state.write().await;
        let before = state.entries.len();
        state.entries.retain(|_, e| e.expires_at > now);
        before - state.entries.len()
    }

    pub async fn len(&self) -> usize {
        self.state.read().await.entries.len()
    }

    /// Tarefa periódica de limpeza.
    pub fn spawn_sweeper(&self, every: Duration) -> tokio::task::JoinHandle<()> {
        let cache = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            ticker.tick().await;
            loop {
                ticker.tick().await;
                let removed = cache.sweep().await;
                if removed > 0 {
                    tracing::debug!("🧹 {} entradas de cache expiradas removidas", removed);
                }
            }
        })
    }
}
