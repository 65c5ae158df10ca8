//! Auth session: token and user persisted across page loads.

use crate::api::User;
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use log::info;
use std::cell::RefCell;
use std::rc::Rc;

/// Single-instance service holding the signed-in user, if any. The token is
/// stored raw; the user record is stored as JSON. A corrupt user record
/// reads back as logged out.
pub struct Session {
    store: Rc<dyn KeyValueStore>,
    token: RefCell<Option<String>>,
    user: RefCell<Option<User>>,
}

impl Session {
    /// Restore the persisted session, if both halves are readable.
    pub fn restore(store: Rc<dyn KeyValueStore>) -> Rc<Self> {
        let token = store.get_raw(keys::TOKEN);
        let user: Option<User> = read_json(store.as_ref(), keys::USER);
        let session = Rc::new(Self {
            store,
            token: RefCell::new(None),
            user: RefCell::new(None),
        });
        if let (Some(token), Some(user)) = (token, user) {
            info!("restored session for '{}'", user.id);
            *session.token.borrow_mut() = Some(token);
            *session.user.borrow_mut() = Some(user);
        }
        session
    }

    pub fn is_authenticated(&self) -> bool {
        self.user.borrow().is_some()
    }

    pub fn current_user(&self) -> Option<User> {
        self.user.borrow().clone()
    }

    pub fn user_id(&self) -> Option<String> {
        self.user.borrow().as_ref().map(|user| user.id.clone())
    }

    pub fn token(&self) -> Option<String> {
        self.token.borrow().clone()
    }

    /// Persist a fresh login.
    pub fn login(&self, token: String, user: User) {
        self.store.set_raw(keys::TOKEN, &token);
        write_json(self.store.as_ref(), keys::USER, &user);
        *self.token.borrow_mut() = Some(token);
        *self.user.borrow_mut() = Some(user);
    }

    /// Drop the session and its persisted keys.
    pub fn logout(&self) {
        self.store.remove(keys::TOKEN);
        self.store.remove(keys::USER);
        *self.token.borrow_mut() = None;
        *self.user.borrow_mut() = None;
    }

    /// The 401 policy: any unauthorized response ends the session.
    pub fn handle_unauthorized(&self) {
        info!("server rejected the token; logging out");
        self.logout();
    }
}
