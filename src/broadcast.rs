//! Cross-tab broadcast channel for stats mutations.
//!
//! Tabs signal each other by writing a small JSON envelope to a well-known
//! storage key; sibling tabs pick it up through the browser's `storage`
//! event. The browser never delivers that event to the writing document, so
//! a tab cannot replay its own mutation. The in-process [`BroadcastBus`]
//! reproduces that self-exclusion explicitly: every subscriber registers
//! under a tab id and `publish` skips the origin tab.

use crate::stats::CardStats;
use log::warn;
use serde::{Deserialize, Serialize};
use std::cell::{Cell, RefCell};

/// Identifies one logical tab on the bus.
pub type TabId = u32;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BroadcastAction {
    #[serde(rename = "toggleLike")]
    ToggleLike,
    #[serde(rename = "incrementViews")]
    IncrementViews,
}

/// Envelope written under the `cardsStats_update` key.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsBroadcast {
    pub card_id: String,
    pub timestamp: f64,
    pub action: BroadcastAction,
    /// Present for like toggles; the receiving tab adopts it wholesale.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_stats: Option<CardStats>,
}

impl StatsBroadcast {
    pub fn new(card_id: &str, action: BroadcastAction, new_stats: Option<CardStats>) -> Self {
        Self {
            card_id: card_id.to_string(),
            timestamp: now_ms(),
            action,
            new_stats,
        }
    }
}

#[cfg(target_arch = "wasm32")]
fn now_ms() -> f64 {
    js_sys::Date::now()
}

#[cfg(not(target_arch = "wasm32"))]
fn now_ms() -> f64 {
    use std::time::{SystemTime, UNIX_EPOCH};
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as f64)
        .unwrap_or(0.0)
}

struct Subscriber {
    tab: TabId,
    handler: Box<dyn Fn(&StatsBroadcast)>,
}

/// In-process publish/subscribe channel with per-tab self-exclusion.
#[derive(Default)]
pub struct BroadcastBus {
    subscribers: RefCell<Vec<Subscriber>>,
    next_tab: Cell<TabId>,
}

impl BroadcastBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hand out a fresh tab id for a new logical tab.
    pub fn allocate_tab(&self) -> TabId {
        let id = self.next_tab.get();
        self.next_tab.set(id + 1);
        id
    }

    pub fn subscribe(&self, tab: TabId, handler: impl Fn(&StatsBroadcast) + 'static) {
        self.subscribers.borrow_mut().push(Subscriber {
            tab,
            handler: Box::new(handler),
        });
    }

    /// Deliver an envelope to every tab except the one that produced it.
    pub fn publish(&self, origin: TabId, envelope: &StatsBroadcast) {
        for subscriber in self.subscribers.borrow().iter() {
            if subscriber.tab != origin {
                (subscriber.handler)(envelope);
            }
        }
    }
}

/// Keeps a `storage`-event listener alive that feeds sibling-tab envelopes
/// into the stats ledger. Dropping the bridge detaches the listener.
pub struct StorageEventBridge {
    #[cfg(target_arch = "wasm32")]
    _listener: gloo_events::EventListener,
}

impl StorageEventBridge {
    #[cfg(target_arch = "wasm32")]
    pub fn attach(ledger: std::rc::Rc<crate::stats::StatsLedger>) -> Self {
        use wasm_bindgen::JsCast;

        let window = gloo_utils::window();
        let listener = gloo_events::EventListener::new(&window, "storage", move |event| {
            let event: &web_sys::StorageEvent = event.unchecked_ref();
            if event.key().as_deref() != Some(crate::storage::keys::STATS_BROADCAST) {
                return;
            }
            let raw = match event.new_value() {
                Some(raw) => raw,
                None => return,
            };
            match serde_json::from_str::<StatsBroadcast>(&raw) {
                Ok(envelope) => ledger.apply_broadcast(&envelope),
                Err(err) => warn!("ignoring malformed broadcast envelope: {}", err),
            }
        });
        Self {
            _listener: listener,
        }
    }

    #[cfg(not(target_arch = "wasm32"))]
    pub fn attach(_ledger: std::rc::Rc<crate::stats::StatsLedger>) -> Self {
        warn!("storage events are browser-only; cross-tab sync is inactive");
        Self {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[test]
    fn publish_skips_the_origin_tab() {
        let bus = BroadcastBus::new();
        let tab_a = bus.allocate_tab();
        let tab_b = bus.allocate_tab();

        let seen_by_a = Rc::new(RefCell::new(Vec::new()));
        let seen_by_b = Rc::new(RefCell::new(Vec::new()));
        {
            let seen = seen_by_a.clone();
            bus.subscribe(tab_a, move |env| seen.borrow_mut().push(env.card_id.clone()));
        }
        {
            let seen = seen_by_b.clone();
            bus.subscribe(tab_b, move |env| seen.borrow_mut().push(env.card_id.clone()));
        }

        let envelope = StatsBroadcast::new("card-1", BroadcastAction::IncrementViews, None);
        bus.publish(tab_a, &envelope);

        assert!(seen_by_a.borrow().is_empty());
        assert_eq!(seen_by_b.borrow().as_slice(), ["card-1"]);
    }

    #[test]
    fn envelope_uses_camel_case_wire_names() {
        let envelope = StatsBroadcast::new(
            "card-1",
            BroadcastAction::ToggleLike,
            Some(CardStats {
                like_count: 1,
                view_count: 0,
                liked_by_current_user: true,
            }),
        );
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["cardId"], "card-1");
        assert_eq!(value["action"], "toggleLike");
        assert_eq!(value["newStats"]["likeCount"], 1);
        assert_eq!(value["newStats"]["likedByCurrentUser"], true);
    }

    #[test]
    fn views_envelope_omits_new_stats() {
        let envelope = StatsBroadcast::new("card-2", BroadcastAction::IncrementViews, None);
        let value = serde_json::to_value(&envelope).unwrap();
        assert_eq!(value["action"], "incrementViews");
        assert!(value.get("newStats").is_none());
    }
}
