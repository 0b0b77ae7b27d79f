use serde::{Deserialize, Serialize};

use billflow_billing::Billing;
use billflow_users::User;

// -------------------------
// Request DTOs
// -------------------------

// Missing fields deserialize to "" and are rejected by the handlers with the
// matching "cannot be empty" message.

#[derive(Debug, Deserialize)]
pub struct CreateUserRequest {
    #[serde(default)]
    pub telegram_username: String,
}

#[derive(Debug, Deserialize)]
pub struct CreateBillingRequest {
    #[serde(default)]
    pub user_id: String,
}

#[derive(Debug, Deserialize)]
pub struct BriefInfoRequest {
    #[serde(default)]
    pub username: String,
}

#[derive(Debug, Deserialize)]
pub struct UserQuery {
    pub telegram_username: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BillingQuery {
    pub user_id: Option<String>,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserResponse {
    pub id: String,
    pub telegram_username: String,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id_typed().to_string(),
            telegram_username: user.handle().to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BillingResponse {
    pub id: String,
    pub user_id: String,
    pub state: String,
    pub username: String,
}

impl From<&Billing> for BillingResponse {
    fn from(billing: &Billing) -> Self {
        Self {
            id: billing.id_typed().to_string(),
            user_id: billing.owner_id().to_string(),
            state: billing.state().as_str().to_string(),
            username: billing.brief_info().username.clone(),
        }
    }
}

pub fn users_to_json(users: &[User]) -> Vec<UserResponse> {
    users.iter().map(UserResponse::from).collect()
}

pub fn billings_to_json(billings: &[Billing]) -> Vec<BillingResponse> {
    billings.iter().map(BillingResponse::from).collect()
}
