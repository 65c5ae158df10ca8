//! Like-list reconciliation for the like button.
//!
//! The server's like list is authoritative: a successful toggle replaces
//! the local list with the server's answer. When the call fails (network or
//! non-2xx), the widget falls back to a purely local flip of the current
//! user's membership so the UI stays responsive.

use crate::api::ApiError;
use futures::future::LocalBoxFuture;
use log::warn;

/// Seam for the remote like-toggle call, injectable for tests.
pub trait LikeBackend {
    fn toggle_like<'a>(
        &'a self,
        card_id: &str,
    ) -> LocalBoxFuture<'a, Result<Vec<String>, ApiError>>;
}

impl LikeBackend for crate::api::ApiClient {
    fn toggle_like<'a>(
        &'a self,
        card_id: &str,
    ) -> LocalBoxFuture<'a, Result<Vec<String>, ApiError>> {
        let card_id = card_id.to_string();
        Box::pin(async move { crate::api::ApiClient::toggle_like(self, &card_id).await })
    }
}

/// How a toggle was resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LikeUpdate {
    /// The server answered; the local list now mirrors its list.
    Server { liked: bool },
    /// The call failed; the membership was flipped locally only.
    LocalFallback { liked: bool },
}

impl LikeUpdate {
    pub fn liked(&self) -> bool {
        match self {
            LikeUpdate::Server { liked } | LikeUpdate::LocalFallback { liked } => *liked,
        }
    }

    pub fn is_server_confirmed(&self) -> bool {
        matches!(self, LikeUpdate::Server { .. })
    }
}

/// The known likers of one card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LikeList {
    likes: Vec<String>,
}

impl LikeList {
    /// Build from an initial list, dropping duplicate user ids.
    pub fn from_likes(likes: Vec<String>) -> Self {
        let mut deduped: Vec<String> = Vec::with_capacity(likes.len());
        for user in likes {
            if !deduped.contains(&user) {
                deduped.push(user);
            }
        }
        Self { likes: deduped }
    }

    pub fn is_liked(&self, user_id: &str) -> bool {
        self.likes.iter().any(|liker| liker == user_id)
    }

    pub fn count(&self) -> usize {
        self.likes.len()
    }

    pub fn likes(&self) -> &[String] {
        &self.likes
    }

    /// Adopt the server's authoritative list.
    pub fn apply_server(&mut self, likes: Vec<String>) {
        *self = Self::from_likes(likes);
    }

    /// Strict local flip of `user_id`'s membership; returns the new state.
    pub fn apply_local_fallback(&mut self, user_id: &str) -> bool {
        if let Some(pos) = self.likes.iter().position(|liker| liker == user_id) {
            self.likes.remove(pos);
            false
        } else {
            self.likes.push(user_id.to_string());
            true
        }
    }

    /// Toggle the like remotely, reconciling against the server's list on
    /// success and flipping locally on failure. Callers must already have
    /// verified that a user is signed in.
    pub async fn toggle(
        &mut self,
        backend: &dyn LikeBackend,
        card_id: &str,
        user_id: &str,
    ) -> LikeUpdate {
        match backend.toggle_like(card_id).await {
            Ok(likes) => {
                self.apply_server(likes);
                LikeUpdate::Server {
                    liked: self.is_liked(user_id),
                }
            }
            Err(err) => {
                warn!(
                    "like toggle for '{}' failed, applying local fallback: {}",
                    card_id, err
                );
                let liked = self.apply_local_fallback(user_id);
                LikeUpdate::LocalFallback { liked }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::executor::block_on;
    use std::cell::RefCell;

    struct ServerBackend {
        responses: RefCell<Vec<Result<Vec<String>, ApiError>>>,
    }

    impl ServerBackend {
        fn new(responses: Vec<Result<Vec<String>, ApiError>>) -> Self {
            Self {
                responses: RefCell::new(responses),
            }
        }
    }

    impl LikeBackend for ServerBackend {
        fn toggle_like<'a>(
            &'a self,
            _card_id: &str,
        ) -> LocalBoxFuture<'a, Result<Vec<String>, ApiError>> {
            let response = self.responses.borrow_mut().remove(0);
            Box::pin(async move { response })
        }
    }

    #[test]
    fn server_answer_replaces_the_local_list() {
        let backend = ServerBackend::new(vec![Ok(vec!["u1".into(), "u2".into()])]);
        let mut list = LikeList::from_likes(vec!["u9".into()]);
        let update = block_on(list.toggle(&backend, "c1", "u1"));
        assert_eq!(update, LikeUpdate::Server { liked: true });
        assert_eq!(list.count(), 2);
        assert!(!list.is_liked("u9"));
    }

    #[test]
    fn failure_falls_back_to_a_local_flip() {
        let backend = ServerBackend::new(vec![
            Err(ApiError::Status(503, "unavailable".into())),
            Err(ApiError::Network("offline".into())),
        ]);
        let mut list = LikeList::default();

        let update = block_on(list.toggle(&backend, "c1", "u1"));
        assert_eq!(update, LikeUpdate::LocalFallback { liked: true });
        assert!(list.is_liked("u1"));

        let update = block_on(list.toggle(&backend, "c1", "u1"));
        assert_eq!(update, LikeUpdate::LocalFallback { liked: false });
        assert!(!list.is_liked("u1"));
        assert_eq!(list.count(), 0);
    }

    #[test]
    fn local_fallback_is_a_strict_toggle() {
        let mut list = LikeList::from_likes(vec!["u1".into()]);
        assert!(!list.apply_local_fallback("u1"));
        assert!(list.apply_local_fallback("u1"));
        assert_eq!(list.count(), 1);
    }

    #[test]
    fn duplicate_likers_are_dropped_on_ingest() {
        let list = LikeList::from_likes(vec!["u1".into(), "u1".into(), "u2".into()]);
        assert_eq!(list.count(), 2);
    }
}
