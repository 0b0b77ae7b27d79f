/// Admin identity for a request that passed basic auth.
///
/// Only the password is checked; the username is whatever the caller sent and is
/// kept for log attribution.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminContext {
    username: String,
}

impl AdminContext {
    pub fn new(username: impl Into<String>) -> Self {
        Self {
            username: username.into(),
        }
    }

    pub fn username(&self) -> &str {
        &self.username
    }
}
