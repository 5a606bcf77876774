//! In-memory user directory: the single owner of the record collection and
//! the query state.
//!
//! All mutation goes through `&mut self`, so a multi-threaded host serializes
//! access by ownership. Reloads carry a sequence number: when reloads race,
//! the latest one issued wins and a slower stale response is ignored.

use tracing::{debug, info, warn};

use crate::api::{ApiError, UserApi};
use crate::listing::{compute_view, ListingView, QueryState};
use crate::models::{UserPayload, UserRecord};

/// Delete workflow state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeleteState {
    Idle,
    /// A delete was requested and awaits confirmation; nothing is mutated.
    ConfirmPending(i64),
    /// The delete request is in flight.
    Deleting(i64),
}

/// Owner of the raw record collection, the query state and the delete
/// workflow.
pub struct UserDirectory {
    records: Vec<UserRecord>,
    query: QueryState,
    delete_state: DeleteState,
    /// Sequence number of the newest reload issued
    reload_seq: u64,
}

/// Handle for one reload round-trip; pass it back to [`UserDirectory::apply_reload`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReloadTicket(u64);

impl UserDirectory {
    pub fn new(query: QueryState) -> Self {
        Self {
            records: Vec::new(),
            query,
            delete_state: DeleteState::Idle,
            reload_seq: 0,
        }
    }

    pub fn records(&self) -> &[UserRecord] {
        &self.records
    }

    pub fn query(&self) -> &QueryState {
        &self.query
    }

    /// Mutable access to the query state; its own mutators keep the
    /// page-reset invariants.
    pub fn query_mut(&mut self) -> &mut QueryState {
        &mut self.query
    }

    pub fn delete_state(&self) -> DeleteState {
        self.delete_state
    }

    /// Compute the visible page for the current records and query.
    pub fn view(&self) -> ListingView<'_> {
        compute_view(&self.records, &self.query)
    }

    // -------------------------------------------------------------------------
    // Reload (last-write-wins)
    // -------------------------------------------------------------------------

    /// Start a reload round-trip and get its ticket. Issuing a new ticket
    /// supersedes every earlier one still in flight.
    pub fn begin_reload(&mut self) -> ReloadTicket {
        self.reload_seq += 1;
        ReloadTicket(self.reload_seq)
    }

    /// Apply a finished reload. Returns false (and changes nothing) when the
    /// ticket has been superseded by a newer reload.
    pub fn apply_reload(&mut self, ticket: ReloadTicket, records: Vec<UserRecord>) -> bool {
        if ticket.0 < self.reload_seq {
            debug!(
                ticket = ticket.0,
                newest = self.reload_seq,
                "Ignoring stale reload response"
            );
            return false;
        }

        info!(count = records.len(), "Loaded user records");
        self.records = records;
        true
    }

    /// Fetch the collection and apply it in one step.
    pub async fn reload(&mut self, api: &dyn UserApi) -> Result<(), ApiError> {
        let ticket = self.begin_reload();
        let records = api.list_users().await?;
        self.apply_reload(ticket, records);
        Ok(())
    }

    // -------------------------------------------------------------------------
    // Delete workflow
    // -------------------------------------------------------------------------

    /// Ask for confirmation to delete `id`. Never mutates the collection.
    ///
    /// Returns false when the target is unknown or a delete is already in
    /// flight.
    pub fn request_delete(&mut self, id: i64) -> bool {
        if matches!(self.delete_state, DeleteState::Deleting(_)) {
            warn!(id, "Delete already in flight, request ignored");
            return false;
        }
        if !self.records.iter().any(|u| u.id == id) {
            return false;
        }
        self.delete_state = DeleteState::ConfirmPending(id);
        true
    }

    /// Cancel a pending confirmation.
    pub fn cancel_delete(&mut self) {
        if let DeleteState::ConfirmPending(_) = self.delete_state {
            self.delete_state = DeleteState::Idle;
        }
    }

    /// Execute the confirmed delete: exactly one request to the API.
    ///
    /// On success the record is removed from the local collection; on
    /// failure the collection is untouched and the error is returned. With
    /// nothing pending (or a delete already in flight) the call is ignored
    /// and returns `Ok(false)`.
    pub async fn confirm_delete(&mut self, api: &dyn UserApi) -> Result<bool, ApiError> {
        let id = match self.delete_state {
            DeleteState::ConfirmPending(id) => id,
            DeleteState::Idle | DeleteState::Deleting(_) => return Ok(false),
        };

        self.delete_state = DeleteState::Deleting(id);

        match api.delete_user(id).await {
            Ok(()) => {
                self.records.retain(|u| u.id != id);
                self.delete_state = DeleteState::Idle;
                info!(id, "Deleted user");
                Ok(true)
            }
            Err(e) => {
                self.delete_state = DeleteState::Idle;
                warn!(id, error = %e, "Delete failed, record retained");
                Err(e)
            }
        }
    }

    // -------------------------------------------------------------------------
    // Write-through create/update
    // -------------------------------------------------------------------------

    /// Create a user remotely and append it to the local collection.
    /// On failure nothing local changes.
    pub async fn create(
        &mut self,
        api: &dyn UserApi,
        payload: &UserPayload,
    ) -> Result<UserRecord, ApiError> {
        let user = api.create_user(payload).await?;
        info!(id = user.id, "Created user");
        self.records.push(user.clone());
        Ok(user)
    }

    /// Update a user remotely and replace the local copy.
    /// On failure nothing local changes.
    pub async fn update(
        &mut self,
        api: &dyn UserApi,
        id: i64,
        payload: &UserPayload,
    ) -> Result<UserRecord, ApiError> {
        let user = api.update_user(id, payload).await?;
        info!(id, "Updated user");
        if let Some(slot) = self.records.iter_mut().find(|u| u.id == id) {
            *slot = user.clone();
        }
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::ErrorKind;
    use crate::listing::{SearchPolicy, DEFAULT_PAGE_SIZE};
    use crate::models::Role;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn user(id: i64, name: &str) -> UserRecord {
        UserRecord {
            id,
            name: name.to_string(),
            email: format!("{}@mail.com", name.to_lowercase()),
            role: Role::Customer,
            avatar_url: String::new(),
        }
    }

    fn directory_with(records: Vec<UserRecord>) -> UserDirectory {
        let mut dir = UserDirectory::new(QueryState::new(
            DEFAULT_PAGE_SIZE,
            SearchPolicy::StartsWith,
        ));
        let ticket = dir.begin_reload();
        dir.apply_reload(ticket, records);
        dir
    }

    /// Collaborator stub: configurable delete failure, call counting.
    struct StubApi {
        users: Vec<UserRecord>,
        fail_delete: bool,
        delete_calls: AtomicUsize,
    }

    impl StubApi {
        fn new(users: Vec<UserRecord>) -> Self {
            Self {
                users,
                fail_delete: false,
                delete_calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl UserApi for StubApi {
        async fn authenticate(&self, _email: &str, _password: &str) -> Result<String, ApiError> {
            Ok("tok".to_string())
        }

        async fn fetch_profile(&self, _token: &str) -> Result<UserRecord, ApiError> {
            Ok(user(0, "Admin"))
        }

        async fn list_users(&self) -> Result<Vec<UserRecord>, ApiError> {
            Ok(self.users.clone())
        }

        async fn fetch_user(&self, id: i64) -> Result<UserRecord, ApiError> {
            self.users
                .iter()
                .find(|u| u.id == id)
                .cloned()
                .ok_or_else(|| ApiError::not_found("User not found"))
        }

        async fn create_user(&self, payload: &UserPayload) -> Result<UserRecord, ApiError> {
            Ok(UserRecord {
                id: 100,
                name: payload.name.clone(),
                email: payload.email.clone(),
                role: payload.role,
                avatar_url: payload.avatar_url.clone(),
            })
        }

        async fn update_user(
            &self,
            id: i64,
            payload: &UserPayload,
        ) -> Result<UserRecord, ApiError> {
            Ok(UserRecord {
                id,
                name: payload.name.clone(),
                email: payload.email.clone(),
                role: payload.role,
                avatar_url: payload.avatar_url.clone(),
            })
        }

        async fn delete_user(&self, _id: i64) -> Result<(), ApiError> {
            self.delete_calls.fetch_add(1, Ordering::SeqCst);
            if self.fail_delete {
                Err(ApiError::fetch("Server error"))
            } else {
                Ok(())
            }
        }
    }

    #[test]
    fn test_stale_reload_is_ignored() {
        let mut dir = UserDirectory::new(QueryState::new(6, SearchPolicy::StartsWith));

        let first = dir.begin_reload();
        let second = dir.begin_reload();

        // The newer reload finishes first.
        assert!(dir.apply_reload(second, vec![user(2, "New")]));
        // The older, slower response must not overwrite it.
        assert!(!dir.apply_reload(first, vec![user(1, "Old")]));

        assert_eq!(dir.records().len(), 1);
        assert_eq!(dir.records()[0].id, 2);
    }

    #[tokio::test]
    async fn test_reload_populates_records() {
        let api = StubApi::new(vec![user(1, "John"), user(2, "Joanna")]);
        let mut dir = UserDirectory::new(QueryState::new(6, SearchPolicy::StartsWith));

        dir.reload(&api).await.unwrap();
        assert_eq!(dir.records().len(), 2);
        assert_eq!(dir.view().total_matched, 2);
    }

    #[test]
    fn test_request_delete_is_pure() {
        let mut dir = directory_with(vec![user(5, "Mark")]);

        assert!(dir.request_delete(5));
        assert_eq!(dir.delete_state(), DeleteState::ConfirmPending(5));
        // Entering ConfirmPending never mutates the collection.
        assert_eq!(dir.records().len(), 1);

        dir.cancel_delete();
        assert_eq!(dir.delete_state(), DeleteState::Idle);
        assert_eq!(dir.records().len(), 1);
    }

    #[test]
    fn test_request_delete_unknown_target_rejected() {
        let mut dir = directory_with(vec![user(5, "Mark")]);
        assert!(!dir.request_delete(99));
        assert_eq!(dir.delete_state(), DeleteState::Idle);
    }

    #[tokio::test]
    async fn test_confirmed_delete_removes_record() {
        let api = StubApi::new(vec![]);
        let mut dir = directory_with(vec![user(5, "Mark"), user(6, "Zoe")]);

        assert!(dir.request_delete(5));
        assert!(dir.confirm_delete(&api).await.unwrap());

        assert!(!dir.records().iter().any(|u| u.id == 5));
        assert_eq!(dir.records().len(), 1);
        assert_eq!(dir.delete_state(), DeleteState::Idle);
        assert_eq!(api.delete_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_failed_delete_retains_record() {
        let mut api = StubApi::new(vec![]);
        api.fail_delete = true;
        let mut dir = directory_with(vec![user(5, "Mark")]);

        dir.request_delete(5);
        let err = dir.confirm_delete(&api).await.unwrap_err();
        assert_eq!(err.kind, ErrorKind::Fetch);

        // The collection is untouched and the workflow returns to Idle.
        assert!(dir.records().iter().any(|u| u.id == 5));
        assert_eq!(dir.delete_state(), DeleteState::Idle);
    }

    #[tokio::test]
    async fn test_confirm_without_pending_is_ignored() {
        let api = StubApi::new(vec![]);
        let mut dir = directory_with(vec![user(5, "Mark")]);

        assert!(!dir.confirm_delete(&api).await.unwrap());
        assert_eq!(api.delete_calls.load(Ordering::SeqCst), 0);
        assert_eq!(dir.records().len(), 1);
    }

    #[tokio::test]
    async fn test_create_appends_locally() {
        let api = StubApi::new(vec![]);
        let mut dir = directory_with(vec![user(1, "John")]);

        let payload = UserPayload {
            name: "Maria".to_string(),
            email: "maria@mail.com".to_string(),
            password: Some("s3cret".to_string()),
            avatar_url: String::new(),
            role: Role::Customer,
        };

        let created = dir.create(&api, &payload).await.unwrap();
        assert_eq!(created.name, "Maria");
        assert_eq!(dir.records().len(), 2);
    }

    #[tokio::test]
    async fn test_update_replaces_local_copy() {
        let api = StubApi::new(vec![]);
        let mut dir = directory_with(vec![user(1, "John")]);

        let mut payload = UserPayload::from_record(&dir.records()[0]);
        payload.name = "Johnny".to_string();

        dir.update(&api, 1, &payload).await.unwrap();
        assert_eq!(dir.records()[0].name, "Johnny");
        assert_eq!(dir.records().len(), 1);
    }

    #[test]
    fn test_view_tracks_query_changes() {
        let mut dir = directory_with(vec![
            user(1, "John"),
            user(2, "Joanna"),
            user(3, "Mark"),
        ]);

        dir.query_mut().set_search("jo");
        let view = dir.view();
        assert_eq!(view.total_matched, 2);
    }
}
