//! Application services: the billing workflow and the user directory.
//!
//! Services are stateless orchestration over the repositories. They translate
//! repository outcomes into caller-facing errors and never touch storage or caches
//! directly.

pub mod directory;
pub mod workflow;

pub use directory::{DirectoryError, DirectoryResult, UserDirectory};
pub use workflow::{BillingWorkflow, WorkflowError, WorkflowResult};
