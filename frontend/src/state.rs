//! # App State Module
//!
//! Client-wide state that outlives any single form or table: who is signed
//! in, which organization and branch they are working in, and the pending
//! confirmation prompt.
//!
//! ## Key Types:
//! - `AppState` - Plain state value, changed only through `AppState::reduce`
//! - `Action` - Everything that can change it
//! - `AppStore` - Shared handle with `snapshot`, `dispatch` and `subscribe`
//!
//! The store is passed to whatever needs it; there is no global instance.

use serde::{Deserialize, Serialize};
use shared::{Branch, Organization};
use tokio::sync::watch;
use tracing::{debug, warn};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserSummary {
    pub id: String,
    pub user_name: String,
    pub email: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationRef {
    pub id: String,
    pub name: String,
}

impl From<&Organization> for OrganizationRef {
    fn from(organization: &Organization) -> Self {
        Self {
            id: organization.id.clone(),
            name: organization.name.clone(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BranchRef {
    pub id: String,
    pub organization_id: String,
    pub name: String,
}

impl From<&Branch> for BranchRef {
    fn from(branch: &Branch) -> Self {
        Self {
            id: branch.id.clone(),
            organization_id: branch.organization_id.clone(),
            name: branch.name.clone(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AuthState {
    pub user: Option<UserSummary>,
    pub organization: Option<OrganizationRef>,
    pub branch: Option<BranchRef>,
}

/// A yes/no prompt waiting on the operator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfirmRequest {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub confirm_label: String,
    pub cancel_label: String,
}

impl ConfirmRequest {
    pub fn new(id: u64, title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            id,
            title: title.into(),
            description: description.into(),
            confirm_label: "Confirm".to_string(),
            cancel_label: "Cancel".to_string(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ConfirmAnswer {
    pub id: u64,
    pub confirmed: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AppState {
    pub auth: AuthState,
    pub confirm: Option<ConfirmRequest>,
    pub last_answer: Option<ConfirmAnswer>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    SignIn(UserSummary),
    SignOut,
    SelectOrganization(OrganizationRef),
    SelectBranch(BranchRef),
    OpenConfirm(ConfirmRequest),
    ResolveConfirm(ConfirmAnswer),
}

impl AppState {
    pub fn current_branch_id(&self) -> Option<&str> {
        self.auth.branch.as_ref().map(|b| b.id.as_str())
    }

    pub fn current_organization_id(&self) -> Option<&str> {
        self.auth.organization.as_ref().map(|o| o.id.as_str())
    }

    /// Next state after `action`. Actions that do not fit the current state
    /// leave it unchanged.
    pub fn reduce(&self, action: Action) -> AppState {
        let mut next = self.clone();
        match action {
            Action::SignIn(user) => {
                next.auth = AuthState {
                    user: Some(user),
                    ..AuthState::default()
                };
            }
            Action::SignOut => {
                next = AppState::default();
            }
            Action::SelectOrganization(organization) => {
                if next.auth.user.is_none() {
                    return next;
                }
                // switching organization drops a branch that belongs to the old one
                if next.auth.current_branch_org() != Some(organization.id.as_str()) {
                    next.auth.branch = None;
                }
                next.auth.organization = Some(organization);
            }
            Action::SelectBranch(branch) => {
                if self.current_organization_id() == Some(branch.organization_id.as_str()) {
                    next.auth.branch = Some(branch);
                }
            }
            Action::OpenConfirm(request) => {
                next.confirm = Some(request);
            }
            Action::ResolveConfirm(answer) => {
                if next.confirm.as_ref().map(|c| c.id) == Some(answer.id) {
                    next.confirm = None;
                    next.last_answer = Some(answer);
                }
            }
        }
        next
    }
}

impl AuthState {
    fn current_branch_org(&self) -> Option<&str> {
        self.branch.as_ref().map(|b| b.organization_id.as_str())
    }
}

/// Shared handle to the application state
#[derive(Clone)]
pub struct AppStore {
    sender: watch::Sender<AppState>,
}

impl Default for AppStore {
    fn default() -> Self {
        Self::new(AppState::default())
    }
}

impl AppStore {
    pub fn new(initial: AppState) -> Self {
        let (sender, _) = watch::channel(initial);
        Self { sender }
    }

    pub fn snapshot(&self) -> AppState {
        self.sender.borrow().clone()
    }

    /// Apply an action. Returns whether the state changed.
    pub fn dispatch(&self, action: Action) -> bool {
        debug!(?action, "dispatch");
        self.sender.send_if_modified(|state| {
            let next = state.reduce(action);
            if next == *state {
                false
            } else {
                *state = next;
                true
            }
        })
    }

    pub fn subscribe(&self) -> watch::Receiver<AppState> {
        self.sender.subscribe()
    }

    /// Open a confirmation prompt and wait for the operator's answer.
    /// A prompt replaced by another one, or a closed store, counts as
    /// declined.
    pub async fn confirm(&self, request: ConfirmRequest) -> bool {
        let id = request.id;
        let mut receiver = self.subscribe();
        self.dispatch(Action::OpenConfirm(request));
        loop {
            {
                let state = receiver.borrow_and_update();
                if let Some(answer) = state.last_answer.filter(|a| a.id == id) {
                    return answer.confirmed;
                }
                if state.confirm.as_ref().map(|c| c.id) != Some(id) {
                    warn!(id, "confirmation prompt replaced before an answer");
                    return false;
                }
            }
            if receiver.changed().await.is_err() {
                return false;
            }
        }
    }
}
