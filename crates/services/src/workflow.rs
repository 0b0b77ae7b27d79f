use thiserror::Error;
use tracing::{info, instrument};

use billflow_billing::Billing;
use billflow_core::{BillingId, DomainError, UserId};
use billflow_infra::{BillingRepository, RepositoryError, UserRepository};

/// Billing workflow error.
#[derive(Debug, Error)]
pub enum WorkflowError {
    #[error("user not found")]
    UserNotFound,

    #[error("billing not found")]
    BillingNotFound,

    #[error("brief info already existing")]
    BriefInfoAlreadySet,

    /// State-machine boundary or input validation failure.
    #[error(transparent)]
    Domain(#[from] DomainError),

    /// Any other repository failure (storage down, corrupt record).
    #[error("{context}: {source}")]
    Repository {
        context: &'static str,
        #[source]
        source: RepositoryError,
    },
}

pub type WorkflowResult<T> = Result<T, WorkflowError>;

fn repository(context: &'static str) -> impl FnOnce(RepositoryError) -> WorkflowError {
    move |source| WorkflowError::Repository { context, source }
}

/// Drives billings through `pending → design → layout → completed`.
pub struct BillingWorkflow<U, B> {
    users: U,
    billings: B,
}

impl<U, B> BillingWorkflow<U, B>
where
    U: UserRepository,
    B: BillingRepository,
{
    pub fn new(users: U, billings: B) -> Self {
        Self { users, billings }
    }

    /// Open a new billing for an existing user.
    #[instrument(skip(self))]
    pub async fn create(&self, owner_id: UserId) -> WorkflowResult<Billing> {
        self.require_user(owner_id).await?;

        let billing = self
            .billings
            .create(Billing::create(owner_id))
            .await
            .map_err(repository("create billing"))?;
        info!(billing_id = %billing.id_typed(), "billing created");
        Ok(billing)
    }

    pub async fn get_all(&self) -> WorkflowResult<Vec<Billing>> {
        self.billings
            .get_all()
            .await
            .map_err(repository("list billings"))
    }

    pub async fn get_by_id(&self, id: BillingId) -> WorkflowResult<Billing> {
        self.load(id).await
    }

    /// Every billing owned by `owner_id`; the owner itself must exist.
    #[instrument(skip(self))]
    pub async fn get_all_by_owner(&self, owner_id: UserId) -> WorkflowResult<Vec<Billing>> {
        self.require_user(owner_id).await?;
        self.billings
            .get_by_owner(owner_id)
            .await
            .map_err(repository("list billings by owner"))
    }

    #[instrument(skip(self))]
    pub async fn advance(&self, id: BillingId) -> WorkflowResult<Billing> {
        let mut billing = self.load(id).await?;
        billing.advance()?;
        self.persist(billing).await
    }

    #[instrument(skip(self))]
    pub async fn retreat(&self, id: BillingId) -> WorkflowResult<Billing> {
        let mut billing = self.load(id).await?;
        billing.retreat()?;
        self.persist(billing).await
    }

    /// Overwrite the brief info without moving the workflow.
    #[instrument(skip(self))]
    pub async fn set_brief_info(&self, id: BillingId, username: &str) -> WorkflowResult<Billing> {
        let mut billing = self.load(id).await?;
        billing.set_brief_info(username)?;
        self.persist(billing).await
    }

    /// Record the brief info for the first time and move the billing one stage on.
    ///
    /// Both changes are applied to the loaded billing and written with a single
    /// update, so a failed advance (already completed) persists nothing.
    #[instrument(skip(self))]
    pub async fn submit_brief_info(
        &self,
        id: BillingId,
        username: &str,
    ) -> WorkflowResult<Billing> {
        let mut billing = self.load(id).await?;
        if billing.brief_info().is_set() {
            return Err(WorkflowError::BriefInfoAlreadySet);
        }
        billing.set_brief_info(username)?;
        billing.advance()?;
        self.persist(billing).await
    }

    #[instrument(skip(self))]
    pub async fn delete(&self, id: BillingId) -> WorkflowResult<Billing> {
        match self.billings.delete(id).await {
            Ok(billing) => {
                info!("billing deleted");
                Ok(billing)
            }
            Err(RepositoryError::NotFound) => Err(WorkflowError::BillingNotFound),
            Err(e) => Err(repository("delete billing")(e)),
        }
    }

    async fn require_user(&self, id: UserId) -> WorkflowResult<()> {
        match self.users.get(id).await {
            Ok(_) => Ok(()),
            Err(RepositoryError::NotFound) => Err(WorkflowError::UserNotFound),
            Err(e) => Err(repository("get user")(e)),
        }
    }

    async fn load(&self, id: BillingId) -> WorkflowResult<Billing> {
        match self.billings.get(id).await {
            Ok(billing) => Ok(billing),
            Err(RepositoryError::NotFound) => Err(WorkflowError::BillingNotFound),
            Err(e) => Err(repository("get billing")(e)),
        }
    }

    async fn persist(&self, billing: Billing) -> WorkflowResult<Billing> {
        match self.billings.update(billing).await {
            Ok(billing) => Ok(billing),
            // deleted between load and update
            Err(RepositoryError::NotFound) => Err(WorkflowError::BillingNotFound),
            Err(e) => Err(repository("update billing")(e)),
        }
    }
}
