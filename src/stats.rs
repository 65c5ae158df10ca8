//! Likes/views ledger with persistence and cross-tab replay.
//!
//! The ledger is an in-memory map of card id to [`CardStats`] plus an
//! incrementally maintained [`GlobalStats`] aggregate. Every mutation
//! persists the full ledger (two storage keys) and emits a broadcast
//! envelope so sibling tabs converge. The aggregate is best-effort: it is
//! adjusted in lockstep with per-card mutations rather than recomputed, so
//! it can drift if a last-write-wins persistence race drops an update.

use crate::broadcast::{BroadcastAction, BroadcastBus, StatsBroadcast, TabId};
use crate::storage::{keys, read_json, write_json, KeyValueStore};
use log::debug;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::HashMap;
use std::rc::Rc;

/// Per-card like/view counters as seen by the current user.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct CardStats {
    pub like_count: u32,
    pub view_count: u32,
    pub liked_by_current_user: bool,
}

/// Site-wide aggregate, maintained incrementally (eventually consistent).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GlobalStats {
    pub total_likes: u32,
    pub total_views: u32,
    pub total_cards: u32,
}

/// Single-instance service owning the stats state for one tab.
pub struct StatsLedger {
    tab: TabId,
    store: Rc<dyn KeyValueStore>,
    bus: Rc<BroadcastBus>,
    cards: RefCell<HashMap<String, CardStats>>,
    global: RefCell<GlobalStats>,
}

impl StatsLedger {
    /// Build a fresh ledger. Any previously persisted stats are cleared:
    /// stats intentionally do not survive a full reload.
    pub fn new(store: Rc<dyn KeyValueStore>, bus: Rc<BroadcastBus>) -> Rc<Self> {
        store.remove(keys::CARDS_STATS);
        store.remove(keys::GLOBAL_STATS);
        store.remove(keys::STATS_BROADCAST);

        Rc::new(Self {
            tab: bus.allocate_tab(),
            store,
            bus,
            cards: RefCell::new(HashMap::new()),
            global: RefCell::new(GlobalStats::default()),
        })
    }

    /// Subscribe a ledger to sibling-tab envelopes on the in-process bus.
    /// Associated function so the subscription holds only a weak handle.
    pub fn attach_to_bus(this: &Rc<Self>) {
        let weak = Rc::downgrade(this);
        this.bus.subscribe(this.tab, move |envelope| {
            if let Some(ledger) = weak.upgrade() {
                ledger.apply_broadcast(envelope);
            }
        });
    }

    pub fn tab(&self) -> TabId {
        self.tab
    }

    /// Insert the default entry for `card_id` if it is not tracked yet.
    pub fn initialize_card(&self, card_id: &str) {
        let inserted = {
            let mut cards = self.cards.borrow_mut();
            if cards.contains_key(card_id) {
                false
            } else {
                cards.insert(card_id.to_string(), CardStats::default());
                true
            }
        };
        if inserted {
            self.global.borrow_mut().total_cards += 1;
            self.persist();
        }
    }

    /// Batch initialization; returns how many ids were newly inserted.
    pub fn initialize_many<'a>(&self, ids: impl IntoIterator<Item = &'a str>) -> usize {
        let mut inserted = 0;
        {
            let mut cards = self.cards.borrow_mut();
            for id in ids {
                if !cards.contains_key(id) {
                    cards.insert(id.to_string(), CardStats::default());
                    inserted += 1;
                }
            }
        }
        if inserted > 0 {
            self.global.borrow_mut().total_cards += inserted as u32;
            self.persist();
        }
        debug!("initialized {} new cards", inserted);
        inserted
    }

    /// Flip the current user's like on `card_id`, clamping counters at zero.
    pub fn toggle_like(&self, card_id: &str) -> CardStats {
        let new_stats = {
            let mut cards = self.cards.borrow_mut();
            let entry = cards.entry(card_id.to_string()).or_default();
            let mut global = self.global.borrow_mut();
            if entry.liked_by_current_user {
                entry.liked_by_current_user = false;
                entry.like_count = entry.like_count.saturating_sub(1);
                global.total_likes = global.total_likes.saturating_sub(1);
            } else {
                entry.liked_by_current_user = true;
                entry.like_count += 1;
                global.total_likes += 1;
            }
            entry.clone()
        };
        self.persist();
        self.publish(card_id, BroadcastAction::ToggleLike, Some(new_stats.clone()));
        new_stats
    }

    /// Record one view of `card_id`.
    pub fn increment_views(&self, card_id: &str) -> CardStats {
        let new_stats = {
            let mut cards = self.cards.borrow_mut();
            let entry = cards.entry(card_id.to_string()).or_default();
            entry.view_count += 1;
            self.global.borrow_mut().total_views += 1;
            entry.clone()
        };
        self.persist();
        self.publish(card_id, BroadcastAction::IncrementViews, None);
        new_stats
    }

    /// Pure read; unknown ids report the default without being inserted.
    pub fn get_stats(&self, card_id: &str) -> CardStats {
        self.cards
            .borrow()
            .get(card_id)
            .cloned()
            .unwrap_or_default()
    }

    pub fn liked_card_ids(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .cards
            .borrow()
            .iter()
            .filter(|(_, stats)| stats.liked_by_current_user)
            .map(|(id, _)| id.clone())
            .collect();
        ids.sort();
        ids
    }

    pub fn global_stats(&self) -> GlobalStats {
        *self.global.borrow()
    }

    pub fn tracked_cards(&self) -> usize {
        self.cards.borrow().len()
    }

    /// Adopt the server's authoritative like list for a card. The ledger is
    /// a derived cache here: counts are overwritten, not merged, and the
    /// aggregate is adjusted by the observed delta.
    pub fn apply_server_likes(&self, card_id: &str, likes: &[String], current_user: Option<&str>) {
        {
            let mut cards = self.cards.borrow_mut();
            let entry = cards.entry(card_id.to_string()).or_default();
            let mut global = self.global.borrow_mut();
            let new_count = likes.len() as u32;
            if new_count >= entry.like_count {
                global.total_likes += new_count - entry.like_count;
            } else {
                global.total_likes = global
                    .total_likes
                    .saturating_sub(entry.like_count - new_count);
            }
            entry.like_count = new_count;
            entry.liked_by_current_user = current_user
                .map(|user| likes.iter().any(|liker| liker == user))
                .unwrap_or(false);
        }
        self.persist();
    }

    /// Replay a mutation observed from another tab. Does not persist or
    /// re-broadcast: the envelope's writer already owns the persisted
    /// snapshot, and republishing would ping-pong between tabs.
    pub fn apply_broadcast(&self, envelope: &StatsBroadcast) {
        debug!(
            "replaying {:?} for '{}' from a sibling tab",
            envelope.action, envelope.card_id
        );
        match envelope.action {
            BroadcastAction::ToggleLike => {
                let new_stats = match &envelope.new_stats {
                    Some(stats) => stats,
                    None => return,
                };
                let mut cards = self.cards.borrow_mut();
                let entry = cards.entry(envelope.card_id.clone()).or_default();
                let mut global = self.global.borrow_mut();
                if new_stats.like_count >= entry.like_count {
                    global.total_likes += new_stats.like_count - entry.like_count;
                } else {
                    global.total_likes = global
                        .total_likes
                        .saturating_sub(entry.like_count - new_stats.like_count);
                }
                *entry = new_stats.clone();
            }
            BroadcastAction::IncrementViews => {
                let mut cards = self.cards.borrow_mut();
                let entry = cards.entry(envelope.card_id.clone()).or_default();
                entry.view_count += 1;
                self.global.borrow_mut().total_views += 1;
            }
        }
    }

    /// Full-ledger write: per-card map plus the global aggregate. Simple and
    /// write-heavy on purpose; diffing is not worth it at this scale.
    fn persist(&self) {
        write_json(self.store.as_ref(), keys::CARDS_STATS, &*self.cards.borrow());
        write_json(self.store.as_ref(), keys::GLOBAL_STATS, &*self.global.borrow());
    }

    fn publish(&self, card_id: &str, action: BroadcastAction, new_stats: Option<CardStats>) {
        let envelope = StatsBroadcast::new(card_id, action, new_stats);
        write_json(self.store.as_ref(), keys::STATS_BROADCAST, &envelope);
        self.bus.publish(self.tab, &envelope);
    }

    /// Rehydrate the persisted snapshot (used after another tab's full
    /// write when no envelope is available).
    pub fn reload_from_store(&self) {
        if let Some(cards) = read_json::<HashMap<String, CardStats>>(
            self.store.as_ref(),
            keys::CARDS_STATS,
        ) {
            *self.cards.borrow_mut() = cards;
        }
        if let Some(global) = read_json::<GlobalStats>(self.store.as_ref(), keys::GLOBAL_STATS) {
            *self.global.borrow_mut() = global;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    fn ledger_with_store() -> (Rc<StatsLedger>, Rc<MemoryStore>) {
        let store = Rc::new(MemoryStore::new());
        let bus = Rc::new(BroadcastBus::new());
        let ledger = StatsLedger::new(store.clone(), bus);
        (ledger, store)
    }

    #[test]
    fn initialize_many_counts_only_new_ids() {
        let (ledger, _) = ledger_with_store();
        assert_eq!(ledger.initialize_many(["a", "b"]), 2);
        assert_eq!(ledger.global_stats().total_cards, 2);
        assert_eq!(ledger.get_stats("a"), CardStats::default());

        assert_eq!(ledger.initialize_many(["b", "c"]), 1);
        assert_eq!(ledger.global_stats().total_cards, 3);
    }

    #[test]
    fn toggle_like_is_an_involution() {
        let (ledger, _) = ledger_with_store();
        ledger.initialize_card("a");

        let liked = ledger.toggle_like("a");
        assert_eq!(liked.like_count, 1);
        assert!(liked.liked_by_current_user);
        assert_eq!(ledger.global_stats().total_likes, 1);

        let unliked = ledger.toggle_like("a");
        assert_eq!(unliked.like_count, 0);
        assert!(!unliked.liked_by_current_user);
        assert_eq!(ledger.global_stats().total_likes, 0);
    }

    #[test]
    fn like_counters_never_go_negative() {
        let (ledger, _) = ledger_with_store();
        // Adopt a server state that says "liked but zero likes", then unlike.
        ledger.apply_broadcast(&StatsBroadcast::new(
            "a",
            BroadcastAction::ToggleLike,
            Some(CardStats {
                like_count: 0,
                view_count: 0,
                liked_by_current_user: true,
            }),
        ));
        let stats = ledger.toggle_like("a");
        assert_eq!(stats.like_count, 0);
        assert_eq!(ledger.global_stats().total_likes, 0);
    }

    #[test]
    fn increment_views_accumulates() {
        let (ledger, _) = ledger_with_store();
        for _ in 0..3 {
            ledger.increment_views("a");
        }
        assert_eq!(ledger.get_stats("a").view_count, 3);
        assert_eq!(ledger.global_stats().total_views, 3);
    }

    #[test]
    fn get_stats_does_not_insert_unknown_ids() {
        let (ledger, _) = ledger_with_store();
        assert_eq!(ledger.get_stats("ghost"), CardStats::default());
        assert_eq!(ledger.tracked_cards(), 0);
        assert_eq!(ledger.global_stats().total_cards, 0);
    }

    #[test]
    fn liked_card_ids_reports_only_liked_cards() {
        let (ledger, _) = ledger_with_store();
        ledger.initialize_many(["a", "b", "c"]);
        ledger.toggle_like("b");
        ledger.toggle_like("c");
        ledger.toggle_like("c");
        assert_eq!(ledger.liked_card_ids(), ["b"]);
    }

    #[test]
    fn new_ledger_clears_persisted_state() {
        let store = Rc::new(MemoryStore::new());
        store.set_raw(keys::CARDS_STATS, r#"{"old":{"likeCount":9}}"#);
        store.set_raw(keys::GLOBAL_STATS, r#"{"totalLikes":9}"#);
        store.set_raw(keys::STATS_BROADCAST, "{}");

        let bus = Rc::new(BroadcastBus::new());
        let ledger = StatsLedger::new(store.clone(), bus);
        assert_eq!(ledger.tracked_cards(), 0);
        assert_eq!(store.get_raw(keys::CARDS_STATS), None);
        assert_eq!(store.get_raw(keys::GLOBAL_STATS), None);
        assert_eq!(store.get_raw(keys::STATS_BROADCAST), None);
    }

    #[test]
    fn mutations_persist_both_snapshot_keys() {
        let (ledger, store) = ledger_with_store();
        ledger.toggle_like("a");
        let cards: HashMap<String, CardStats> =
            serde_json::from_str(&store.get_raw(keys::CARDS_STATS).unwrap()).unwrap();
        assert_eq!(cards["a"].like_count, 1);
        let global: GlobalStats =
            serde_json::from_str(&store.get_raw(keys::GLOBAL_STATS).unwrap()).unwrap();
        assert_eq!(global.total_likes, 1);
        assert!(store.get_raw(keys::STATS_BROADCAST).is_some());
    }

    #[test]
    fn sibling_tab_converges_without_echoing_back() {
        let store = Rc::new(MemoryStore::new());
        let bus = Rc::new(BroadcastBus::new());
        let tab_a = StatsLedger::new(store.clone(), bus.clone());
        let tab_b = StatsLedger::new(store, bus);
        StatsLedger::attach_to_bus(&tab_a);
        StatsLedger::attach_to_bus(&tab_b);

        tab_a.toggle_like("x");

        let expected = CardStats {
            like_count: 1,
            view_count: 0,
            liked_by_current_user: true,
        };
        // A kept its own single flip; B replayed it exactly once.
        assert_eq!(tab_a.get_stats("x"), expected);
        assert_eq!(tab_b.get_stats("x"), expected);
        assert_eq!(tab_b.global_stats().total_likes, 1);

        tab_a.increment_views("x");
        assert_eq!(tab_b.get_stats("x").view_count, 1);
        assert_eq!(tab_b.global_stats().total_views, 1);
    }

    #[test]
    fn server_likes_overwrite_local_counts() {
        let (ledger, _) = ledger_with_store();
        ledger.toggle_like("a");
        assert_eq!(ledger.global_stats().total_likes, 1);

        let likes = vec!["u2".to_string(), "u3".to_string(), "u4".to_string()];
        ledger.apply_server_likes("a", &likes, Some("u1"));
        let stats = ledger.get_stats("a");
        assert_eq!(stats.like_count, 3);
        assert!(!stats.liked_by_current_user);
        assert_eq!(ledger.global_stats().total_likes, 3);

        ledger.apply_server_likes("a", &[], Some("u1"));
        assert_eq!(ledger.get_stats("a").like_count, 0);
        assert_eq!(ledger.global_stats().total_likes, 0);
    }

    #[test]
    fn reload_rehydrates_the_persisted_snapshot() {
        let (ledger, store) = ledger_with_store();
        ledger.initialize_many(["a"]);
        ledger.toggle_like("a");

        let raw = store.get_raw(keys::CARDS_STATS).unwrap();
        let (rehydrated, other_store) = ledger_with_store();
        other_store.set_raw(keys::CARDS_STATS, &raw);
        rehydrated.reload_from_store();
        assert_eq!(rehydrated.get_stats("a").like_count, 1);
    }
}
