use std::sync::Arc;

use anyhow::Context;
use tracing::info;

use billflow_infra::{
    BillingStore, DocumentStore, InMemoryDocumentStore, PostgresDocumentStore, RepositoryResult,
    UserStore,
};
use billflow_services::{BillingWorkflow, UserDirectory};

use crate::config::Config;

/// Document backend shared by both stores; in-memory or Postgres at runtime.
pub type Documents = Arc<dyn DocumentStore>;
pub type Users = Arc<UserStore<Documents>>;
pub type Billings = Arc<BillingStore<Documents>>;

/// Services reachable from every handler.
pub struct AppServices {
    pub workflow: BillingWorkflow<Users, Billings>,
    pub directory: UserDirectory<Users>,
}

impl AppServices {
    /// Build both stores over `documents` (ping + eager load each) and wire the
    /// services on top of them.
    pub async fn connect(
        documents: Documents,
        user_collection: &str,
        billing_collection: &str,
    ) -> RepositoryResult<Self> {
        let users: Users = Arc::new(UserStore::connect(documents.clone(), user_collection).await?);
        let billings: Billings =
            Arc::new(BillingStore::connect(documents, billing_collection).await?);

        Ok(Self {
            workflow: BillingWorkflow::new(users.clone(), billings),
            directory: UserDirectory::new(users),
        })
    }
}

/// Open the document backend selected by `config` and build the services.
pub async fn build_services(config: &Config) -> anyhow::Result<AppServices> {
    let documents: Documents = if config.uses_memory_store() {
        info!("using in-memory document store");
        Arc::new(InMemoryDocumentStore::new())
    } else {
        let store = PostgresDocumentStore::connect(&config.database_url, config.database.as_str())
            .await
            .context("failed to connect to postgres")?;
        store
            .ensure_schema()
            .await
            .context("failed to create documents table")?;
        info!(table = %config.database, "using postgres document store");
        Arc::new(store)
    };

    AppServices::connect(documents, &config.user_collection, &config.billing_collection)
        .await
        .context("failed to initialise stores")
}
