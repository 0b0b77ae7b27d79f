use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tracing::{debug, info, instrument};

use billflow_billing::Billing;
use billflow_core::{BillingId, UserId};

use super::{BillingRepository, RepositoryError, RepositoryResult, ensure_key, validate_collection};
use crate::cache::EntityCache;
use crate::document_store::{Document, DocumentStore, StorageError};

/// Persisted shape of a billing. `state` is the lowercase stage name and an empty
/// `username` means no brief info was submitted yet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingDocument {
    #[serde(rename = "_id")]
    pub id: String,
    pub user_id: String,
    pub state: String,
    #[serde(default)]
    pub username: String,
}

impl BillingDocument {
    pub fn from_model(billing: &Billing) -> Self {
        Self {
            id: billing.id_typed().to_string(),
            user_id: billing.owner_id().to_string(),
            state: billing.state().as_str().to_string(),
            username: billing.brief_info().username.clone(),
        }
    }

    pub fn into_model(self) -> RepositoryResult<Billing> {
        Ok(Billing::rehydrate(
            &self.id,
            &self.user_id,
            &self.state,
            self.username,
        )?)
    }
}

fn encode(billing: &Billing) -> RepositoryResult<Document> {
    serde_json::to_value(BillingDocument::from_model(billing))
        .map_err(|e| StorageError::Serialization(e.to_string()).into())
}

fn decode(document: Document) -> RepositoryResult<Billing> {
    serde_json::from_value::<BillingDocument>(document)
        .map_err(|e| RepositoryError::Decode(e.to_string()))?
        .into_model()
}

/// Document-backed billing store with a write-through cache.
pub struct BillingStore<D> {
    documents: D,
    collection: String,
    cache: EntityCache<Billing>,
    write_gate: Mutex<()>,
}

impl<D: DocumentStore> BillingStore<D> {
    /// Ping the backend and eagerly load every billing into the cache. A single
    /// undecodable record aborts construction.
    #[instrument(skip(documents), err)]
    pub async fn connect(documents: D, collection: &str) -> RepositoryResult<Self> {
        validate_collection(collection)?;
        documents.ping().await?;

        let store = Self {
            documents,
            collection: collection.to_string(),
            cache: EntityCache::new(),
            write_gate: Mutex::new(()),
        };
        let billings = store.load_all().await?;
        store.cache.extend(billings);
        info!(count = store.cache.len(), "billing cache warmed");

        Ok(store)
    }

    pub fn collection(&self) -> &str {
        &self.collection
    }

    async fn load_all(&self) -> RepositoryResult<Vec<Billing>> {
        self.documents
            .find_all(&self.collection)
            .await?
            .into_iter()
            .map(decode)
            .collect()
    }
}

#[async_trait]
impl<D: DocumentStore> BillingRepository for BillingStore<D> {
    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get(&self, id: BillingId) -> RepositoryResult<Billing> {
        if let Some(billing) = self.cache.get(&id) {
            return Ok(billing);
        }

        let _gate = self.write_gate.lock().await;
        if let Some(billing) = self.cache.get(&id) {
            return Ok(billing);
        }

        debug!("cache miss");
        let document = self
            .documents
            .find_one(&self.collection, &id.to_string())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        let billing = decode(document)?;
        ensure_key(&id, &billing)?;
        self.cache.insert(billing.clone());
        Ok(billing)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_by_owner(&self, owner_id: UserId) -> RepositoryResult<Vec<Billing>> {
        Ok(self.cache.filter(|billing| billing.owner_id() == owner_id))
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn get_all(&self) -> RepositoryResult<Vec<Billing>> {
        if !self.cache.is_empty() {
            return Ok(self.cache.values());
        }

        let _gate = self.write_gate.lock().await;
        let billings = self.load_all().await?;
        self.cache.extend(billings.iter().cloned());
        Ok(billings)
    }

    #[instrument(skip(self, billing), fields(collection = %self.collection, id = %billing.id_typed()))]
    async fn create(&self, billing: Billing) -> RepositoryResult<Billing> {
        let _gate = self.write_gate.lock().await;
        self.documents
            .insert_one(&self.collection, encode(&billing)?)
            .await?;
        self.cache.insert(billing.clone());
        Ok(billing)
    }

    #[instrument(
        skip(self, billing),
        fields(collection = %self.collection, id = %billing.id_typed(), state = %billing.state())
    )]
    async fn update(&self, billing: Billing) -> RepositoryResult<Billing> {
        let id = billing.id_typed();
        let _gate = self.write_gate.lock().await;
        self.documents
            .find_one_and_replace(&self.collection, &id.to_string(), encode(&billing)?)
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.cache.insert(billing.clone());
        Ok(billing)
    }

    #[instrument(skip(self), fields(collection = %self.collection))]
    async fn delete(&self, id: BillingId) -> RepositoryResult<Billing> {
        let _gate = self.write_gate.lock().await;
        let document = self
            .documents
            .find_one_and_delete(&self.collection, &id.to_string())
            .await?
            .ok_or(RepositoryError::NotFound)?;
        self.cache.remove(&id);
        let billing = decode(document)?;
        ensure_key(&id, &billing)?;
        Ok(billing)
    }
}
