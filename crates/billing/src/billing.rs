use core::str::FromStr;

use serde::{Deserialize, Serialize};

use billflow_core::{BillingId, DomainError, DomainResult, Entity, UserId};

/// Billing workflow stage.
///
/// Ordered `Pending < Design < Layout < Completed`; transitions move one step at a
/// time and never wrap.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BillingState {
    Pending,
    Design,
    Layout,
    Completed,
}

impl BillingState {
    pub const ALL: [BillingState; 4] = [
        BillingState::Pending,
        BillingState::Design,
        BillingState::Layout,
        BillingState::Completed,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            BillingState::Pending => "pending",
            BillingState::Design => "design",
            BillingState::Layout => "layout",
            BillingState::Completed => "completed",
        }
    }

    /// The following stage, or `None` at `Completed`.
    pub fn next(self) -> Option<Self> {
        match self {
            BillingState::Pending => Some(BillingState::Design),
            BillingState::Design => Some(BillingState::Layout),
            BillingState::Layout => Some(BillingState::Completed),
            BillingState::Completed => None,
        }
    }

    /// The preceding stage, or `None` at `Pending`.
    pub fn prev(self) -> Option<Self> {
        match self {
            BillingState::Pending => None,
            BillingState::Design => Some(BillingState::Pending),
            BillingState::Layout => Some(BillingState::Design),
            BillingState::Completed => Some(BillingState::Layout),
        }
    }
}

impl core::fmt::Display for BillingState {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BillingState {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        BillingState::ALL
            .into_iter()
            .find(|state| state.as_str() == s)
            .ok_or_else(|| DomainError::invalid_state(s))
    }
}

/// Descriptive metadata attached to a billing before it leaves `Pending`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct BriefInfo {
    /// Empty means unset.
    pub username: String,
}

impl BriefInfo {
    pub fn is_set(&self) -> bool {
        !self.username.is_empty()
    }
}

/// One workflow instance owned by a user.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Billing {
    id: BillingId,
    owner_id: UserId,
    state: BillingState,
    brief_info: BriefInfo,
}

impl Billing {
    /// Start a new workflow for `owner_id` in `Pending` with no brief info.
    ///
    /// The owner id is already validated by its type; whether the user exists is
    /// the workflow service's concern.
    pub fn create(owner_id: UserId) -> Self {
        Self {
            id: BillingId::new(),
            owner_id,
            state: BillingState::Pending,
            brief_info: BriefInfo::default(),
        }
    }

    /// Rebuild a billing from persisted fields.
    ///
    /// Re-validates both identifiers and parses the state name; a record that fails
    /// any of these is rejected instead of being loaded.
    pub fn rehydrate(
        id: &str,
        owner_id: &str,
        state: &str,
        username: impl Into<String>,
    ) -> DomainResult<Self> {
        let state = state.parse::<BillingState>()?;
        let owner_id = owner_id.parse::<UserId>()?;
        let id = id.parse::<BillingId>()?;
        Ok(Self {
            id,
            owner_id,
            state,
            brief_info: BriefInfo {
                username: username.into(),
            },
        })
    }

    pub fn id_typed(&self) -> BillingId {
        self.id
    }

    pub fn owner_id(&self) -> UserId {
        self.owner_id
    }

    pub fn state(&self) -> BillingState {
        self.state
    }

    pub fn brief_info(&self) -> &BriefInfo {
        &self.brief_info
    }

    /// Move to the next stage in place.
    pub fn advance(&mut self) -> DomainResult<BillingState> {
        let next = self.state.next().ok_or(DomainError::NextFromCompleted)?;
        self.state = next;
        Ok(next)
    }

    /// Move to the previous stage in place.
    pub fn retreat(&mut self) -> DomainResult<BillingState> {
        let prev = self.state.prev().ok_or(DomainError::PrevFromPending)?;
        self.state = prev;
        Ok(prev)
    }

    /// Replace the brief info username. Does not touch the workflow state.
    pub fn set_brief_info(&mut self, username: impl Into<String>) -> DomainResult<&BriefInfo> {
        let username = username.into();
        if username.is_empty() {
            return Err(DomainError::validation("username cannot be empty"));
        }
        self.brief_info.username = username;
        Ok(&self.brief_info)
    }
}

impl Entity for Billing {
    type Id = BillingId;

    fn id(&self) -> &Self::Id {
        &self.id
    }
}
