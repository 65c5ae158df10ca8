//! Client core for the FuturistCards digital business-card app.
//!
//! The library half is platform-independent and hosts the state machinery:
//! the likes/views ledger, the per-user favorites ledger, the like-list
//! reconciliation used by the like button, the cross-tab broadcast channel,
//! the storage adapter they all persist through, and the session and
//! theme/locale bootstrap. The binary half (`main.rs`) renders it as a Yew
//! application.
//!
//! Mutations are optimistic: state flips locally first, the backend is told
//! afterwards, and a failed call either reverts the flip (favorites) or
//! degrades to a local-only toggle (likes). Open sibling tabs converge by
//! replaying broadcast envelopes; a tab never reacts to its own envelope.

pub mod api;
pub mod broadcast;
pub mod favorites;
pub mod like;
pub mod session;
pub mod stats;
pub mod storage;
pub mod theme;

pub use api::{ApiClient, ApiError, Card, CardDraft, User};
pub use broadcast::{BroadcastBus, StatsBroadcast, StorageEventBridge};
pub use favorites::{FavoritesError, FavoritesLedger};
pub use like::{LikeList, LikeUpdate};
pub use session::Session;
pub use stats::{CardStats, GlobalStats, StatsLedger};
pub use storage::{KeyValueStore, MemoryStore};
pub use theme::Theme;

#[cfg(target_arch = "wasm32")]
pub use storage::BrowserStore;
