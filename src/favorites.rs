//! Per-user favorites ledger with optimistic remote toggles.
//!
//! Favorites are an ordered, duplicate-free list of card ids scoped to the
//! current user and persisted under a per-user storage key. The remote
//! toggle is optimistic: the flip is applied immediately, then confirmed or
//! reverted once the server answers. The transition is modeled explicitly
//! (`begin_toggle` / `confirm` / `revert`) so the intermediate state is
//! observable.

use crate::api::ApiError;
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use futures::future::LocalBoxFuture;
use log::{debug, warn};
use std::cell::RefCell;
use std::fmt;
use std::rc::Rc;

/// Namespace used when no user is signed in.
const ANONYMOUS: &str = "anonymous";

#[derive(Debug)]
pub enum FavoritesError {
    /// A user-scoped operation was attempted with no session.
    NotAuthenticated,
    /// The remote toggle failed; the optimistic flip was reverted.
    Remote(ApiError),
}

impl fmt::Display for FavoritesError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FavoritesError::NotAuthenticated => write!(f, "Sign in to manage favorites"),
            FavoritesError::Remote(err) => write!(f, "Could not update favorite: {}", err),
        }
    }
}

impl std::error::Error for FavoritesError {}

/// Seam for the remote favorite-toggle call, injectable for tests.
pub trait FavoritesBackend {
    fn toggle_favorite<'a>(
        &'a self,
        card_id: &str,
    ) -> LocalBoxFuture<'a, Result<bool, ApiError>>;
}

impl FavoritesBackend for crate::api::ApiClient {
    fn toggle_favorite<'a>(
        &'a self,
        card_id: &str,
    ) -> LocalBoxFuture<'a, Result<bool, ApiError>> {
        let card_id = card_id.to_string();
        Box::pin(async move { crate::api::ApiClient::toggle_favorite(self, &card_id).await })
    }
}

/// An optimistic flip that has been applied but not yet confirmed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PendingToggle {
    card_id: String,
    was_favorite: bool,
    /// Membership after the optimistic flip.
    pub is_favorite: bool,
}

/// Single-instance service owning the favorites state for one tab.
pub struct FavoritesLedger {
    store: Rc<dyn KeyValueStore>,
    current_user: RefCell<Option<String>>,
    favorites: RefCell<Vec<String>>,
}

impl FavoritesLedger {
    pub fn new(store: Rc<dyn KeyValueStore>) -> Rc<Self> {
        let ledger = Rc::new(Self {
            store,
            current_user: RefCell::new(None),
            favorites: RefCell::new(Vec::new()),
        });
        ledger.reload();
        ledger
    }

    fn storage_key(&self) -> String {
        let user = self.current_user.borrow();
        format!(
            "{}{}",
            keys::FAVORITES_PREFIX,
            user.as_deref().unwrap_or(ANONYMOUS)
        )
    }

    /// Rescope the ledger to another user and load that user's list.
    pub fn set_current_user(&self, user_id: Option<&str>) {
        *self.current_user.borrow_mut() = user_id.map(str::to_string);
        self.reload();
        debug!(
            "favorites rescoped to '{}' ({} entries)",
            user_id.unwrap_or(ANONYMOUS),
            self.favorites.borrow().len()
        );
    }

    fn reload(&self) {
        let loaded: Vec<String> =
            read_json(self.store.as_ref(), &self.storage_key()).unwrap_or_default();
        *self.favorites.borrow_mut() = loaded;
    }

    fn persist(&self) {
        write_json(self.store.as_ref(), &self.storage_key(), &*self.favorites.borrow());
    }

    pub fn is_favorite(&self, card_id: &str) -> bool {
        self.favorites.borrow().iter().any(|id| id == card_id)
    }

    pub fn favorites_count(&self) -> usize {
        self.favorites.borrow().len()
    }

    pub fn favorite_ids(&self) -> Vec<String> {
        self.favorites.borrow().clone()
    }

    /// Local-only insert; returns whether the id was newly added.
    pub fn add_favorite(&self, card_id: &str) -> bool {
        let added = {
            let mut favorites = self.favorites.borrow_mut();
            if favorites.iter().any(|id| id == card_id) {
                false
            } else {
                favorites.push(card_id.to_string());
                true
            }
        };
        if added {
            self.persist();
        }
        added
    }

    /// Local-only removal; returns whether the id was present.
    pub fn remove_favorite(&self, card_id: &str) -> bool {
        let removed = {
            let mut favorites = self.favorites.borrow_mut();
            if let Some(pos) = favorites.iter().position(|id| id == card_id) {
                favorites.remove(pos);
                true
            } else {
                false
            }
        };
        if removed {
            self.persist();
        }
        removed
    }

    pub fn clear_favorites(&self) {
        self.favorites.borrow_mut().clear();
        self.persist();
    }

    /// Apply the flip optimistically. Fails without a signed-in user.
    pub fn begin_toggle(&self, card_id: &str) -> Result<PendingToggle, FavoritesError> {
        if self.current_user.borrow().is_none() {
            return Err(FavoritesError::NotAuthenticated);
        }
        let was_favorite = self.is_favorite(card_id);
        if was_favorite {
            self.remove_favorite(card_id);
        } else {
            self.add_favorite(card_id);
        }
        Ok(PendingToggle {
            card_id: card_id.to_string(),
            was_favorite,
            is_favorite: !was_favorite,
        })
    }

    /// Keep the optimistic flip after remote confirmation.
    pub fn confirm(&self, _pending: &PendingToggle) {
        // The flip is already applied; confirmation just ends the pending
        // window. Kept as an explicit transition for symmetry with revert.
    }

    /// Restore the pre-toggle membership after a remote failure.
    pub fn revert(&self, pending: &PendingToggle) {
        if pending.was_favorite {
            self.add_favorite(&pending.card_id);
        } else {
            self.remove_favorite(&pending.card_id);
        }
    }

    /// Full optimistic flow: flip, call the backend, confirm or revert.
    /// Returns the resting membership on success.
    pub async fn toggle_favorite(
        &self,
        backend: &dyn FavoritesBackend,
        card_id: &str,
    ) -> Result<bool, FavoritesError> {
        let pending = self.begin_toggle(card_id)?;
        match backend.toggle_favorite(card_id).await {
            Ok(_server_state) => {
                self.confirm(&pending);
                Ok(pending.is_favorite)
            }
            Err(err) => {
                warn!("favorite toggle for '{}' failed, reverting: {}", card_id, err);
                self.revert(&pending);
                Err(FavoritesError::Remote(err))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;
    use futures::executor::block_on;

    struct OkBackend;

    impl FavoritesBackend for OkBackend {
        fn toggle_favorite<'a>(
            &'a self,
            _card_id: &str,
        ) -> LocalBoxFuture<'a, Result<bool, ApiError>> {
            Box::pin(async { Ok(true) })
        }
    }

    struct FailingBackend;

    impl FavoritesBackend for FailingBackend {
        fn toggle_favorite<'a>(
            &'a self,
            _card_id: &str,
        ) -> LocalBoxFuture<'a, Result<bool, ApiError>> {
            Box::pin(async { Err(ApiError::Network("connection reset".into())) })
        }
    }

    fn ledger_for(user: &str) -> (Rc<FavoritesLedger>, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        let ledger = FavoritesLedger::new(store.clone());
        ledger.set_current_user(Some(user));
        (ledger, store)
    }

    #[test]
    fn toggle_requires_a_user() {
        let store = Rc::new(MemoryStore::new());
        let ledger = FavoritesLedger::new(store);
        let result = block_on(ledger.toggle_favorite(&OkBackend, "c1"));
        assert!(matches!(result, Err(FavoritesError::NotAuthenticated)));
        assert!(!ledger.is_favorite("c1"));
    }

    #[test]
    fn repeated_toggles_keep_the_set_duplicate_free() {
        let (ledger, _) = ledger_for("u1");
        for _ in 0..5 {
            block_on(ledger.toggle_favorite(&OkBackend, "c1")).unwrap();
        }
        assert!(ledger.is_favorite("c1"));
        assert_eq!(ledger.favorites_count(), 1);
        assert_eq!(ledger.favorite_ids(), ["c1"]);
    }

    #[test]
    fn failed_remote_toggle_reverts_to_the_prior_set() {
        let (ledger, _) = ledger_for("u1");
        let result = block_on(ledger.toggle_favorite(&FailingBackend, "c1"));
        assert!(matches!(result, Err(FavoritesError::Remote(_))));
        assert!(!ledger.is_favorite("c1"));
        assert_eq!(ledger.favorites_count(), 0);

        // Same for the un-favorite direction.
        ledger.add_favorite("c2");
        let result = block_on(ledger.toggle_favorite(&FailingBackend, "c2"));
        assert!(result.is_err());
        assert!(ledger.is_favorite("c2"));
    }

    #[test]
    fn pending_toggle_exposes_the_intermediate_state() {
        let (ledger, _) = ledger_for("u1");
        let pending = ledger.begin_toggle("c1").unwrap();
        assert!(pending.is_favorite);
        assert!(ledger.is_favorite("c1"));

        ledger.revert(&pending);
        assert!(!ledger.is_favorite("c1"));

        let pending = ledger.begin_toggle("c1").unwrap();
        ledger.confirm(&pending);
        assert!(ledger.is_favorite("c1"));
    }

    #[test]
    fn favorites_are_scoped_per_user() {
        let (ledger, _) = ledger_for("u1");
        ledger.add_favorite("c1");
        ledger.add_favorite("c2");

        ledger.set_current_user(Some("u2"));
        assert_eq!(ledger.favorites_count(), 0);
        ledger.add_favorite("c9");

        ledger.set_current_user(Some("u1"));
        assert_eq!(ledger.favorite_ids(), ["c1", "c2"]);

        ledger.set_current_user(None);
        assert_eq!(ledger.favorites_count(), 0);
    }

    #[test]
    fn persisted_list_survives_a_new_ledger_instance() {
        let (ledger, store) = ledger_for("u1");
        ledger.add_favorite("c1");
        drop(ledger);

        let revived = FavoritesLedger::new(store);
        revived.set_current_user(Some("u1"));
        assert!(revived.is_favorite("c1"));
    }

    #[test]
    fn clear_empties_and_persists() {
        let (ledger, store) = ledger_for("u1");
        ledger.add_favorite("c1");
        ledger.clear_favorites();
        assert_eq!(ledger.favorites_count(), 0);
        assert_eq!(
            store.get_raw(&format!("{}u1", keys::FAVORITES_PREFIX)),
            Some("[]".to_string())
        );
    }
}
