//! One-shot theme and locale bootstrap.
//!
//! Preferences are resolved through a fallback chain (primary key, legacy
//! key, environment signal) and written back to both keys so older and
//! newer builds read the same state.

use crate::storage::{keys, read_json, write_json, KeyValueStore};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Theme {
    Dark,
    Light,
}

impl Theme {
    pub fn as_str(&self) -> &'static str {
        match self {
            Theme::Dark => "dark",
            Theme::Light => "light",
        }
    }

    pub fn is_dark(&self) -> bool {
        matches!(self, Theme::Dark)
    }

    pub fn toggled(&self) -> Theme {
        match self {
            Theme::Dark => Theme::Light,
            Theme::Light => Theme::Dark,
        }
    }
}

/// Resolve the theme: `darkMode` (JSON bool) first, then the legacy
/// `futuristcards_theme` string, then the system dark-mode signal. The
/// resolved value is dual-written back to both keys.
pub fn resolve_theme(store: &dyn KeyValueStore, system_prefers_dark: bool) -> Theme {
    let theme = read_json::<bool>(store, keys::DARK_MODE)
        .map(|dark| if dark { Theme::Dark } else { Theme::Light })
        .or_else(|| match store.get_raw(keys::LEGACY_THEME).as_deref() {
            Some("dark") => Some(Theme::Dark),
            Some("light") => Some(Theme::Light),
            _ => None,
        })
        .unwrap_or(if system_prefers_dark {
            Theme::Dark
        } else {
            Theme::Light
        });
    persist_theme(store, theme);
    theme
}

/// Write the theme to both the primary and the legacy key.
pub fn persist_theme(store: &dyn KeyValueStore, theme: Theme) {
    write_json(store, keys::DARK_MODE, &theme.is_dark());
    store.set_raw(keys::LEGACY_THEME, theme.as_str());
}

/// Resolve the locale: persisted `language` key, then the navigator's
/// primary language subtag, then `"en"`. Written back on resolution.
pub fn resolve_locale(store: &dyn KeyValueStore, navigator_language: Option<&str>) -> String {
    let locale = store
        .get_raw(keys::LANGUAGE)
        .filter(|stored| !stored.is_empty())
        .or_else(|| {
            navigator_language.map(|lang| {
                lang.split(['-', '_'])
                    .next()
                    .unwrap_or(lang)
                    .to_ascii_lowercase()
            })
        })
        .unwrap_or_else(|| "en".to_string());
    store.set_raw(keys::LANGUAGE, &locale);
    locale
}

/// Reflect the theme on the document root (`data-theme` attribute).
#[cfg(target_arch = "wasm32")]
pub fn apply_theme(theme: Theme) {
    if let Some(root) = gloo_utils::document().document_element() {
        let _ = root.set_attribute("data-theme", theme.as_str());
    }
}

#[cfg(not(target_arch = "wasm32"))]
pub fn apply_theme(_theme: Theme) {}

/// Resolve and apply theme and locale from the browser environment.
pub fn bootstrap(store: &dyn KeyValueStore) -> (Theme, String) {
    #[cfg(target_arch = "wasm32")]
    {
        let prefers_dark = gloo_utils::window()
            .match_media("(prefers-color-scheme: dark)")
            .ok()
            .flatten()
            .map(|query| query.matches())
            .unwrap_or(false);
        let theme = resolve_theme(store, prefers_dark);
        apply_theme(theme);
        let language = gloo_utils::window().navigator().language();
        let locale = resolve_locale(store, language.as_deref());
        (theme, locale)
    }
    #[cfg(not(target_arch = "wasm32"))]
    {
        let theme = resolve_theme(store, false);
        let locale = resolve_locale(store, None);
        (theme, locale)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStore;

    #[test]
    fn primary_key_wins_over_legacy_and_system() {
        let store = MemoryStore::new();
        store.set_raw(keys::DARK_MODE, "false");
        store.set_raw(keys::LEGACY_THEME, "dark");
        assert_eq!(resolve_theme(&store, true), Theme::Light);
    }

    #[test]
    fn legacy_key_wins_over_system() {
        let store = MemoryStore::new();
        store.set_raw(keys::LEGACY_THEME, "dark");
        assert_eq!(resolve_theme(&store, false), Theme::Dark);
    }

    #[test]
    fn system_signal_is_the_last_resort() {
        let store = MemoryStore::new();
        assert_eq!(resolve_theme(&store, true), Theme::Dark);
        let store = MemoryStore::new();
        assert_eq!(resolve_theme(&store, false), Theme::Light);
    }

    #[test]
    fn corrupt_primary_falls_through_to_legacy() {
        let store = MemoryStore::new();
        store.set_raw(keys::DARK_MODE, "maybe");
        store.set_raw(keys::LEGACY_THEME, "dark");
        assert_eq!(resolve_theme(&store, false), Theme::Dark);
    }

    #[test]
    fn resolution_dual_writes_both_keys() {
        let store = MemoryStore::new();
        resolve_theme(&store, true);
        assert_eq!(store.get_raw(keys::DARK_MODE).as_deref(), Some("true"));
        assert_eq!(store.get_raw(keys::LEGACY_THEME).as_deref(), Some("dark"));
    }

    #[test]
    fn locale_prefers_stored_then_navigator_then_english() {
        let store = MemoryStore::new();
        store.set_raw(keys::LANGUAGE, "he");
        assert_eq!(resolve_locale(&store, Some("fr-FR")), "he");

        let store = MemoryStore::new();
        assert_eq!(resolve_locale(&store, Some("fr-FR")), "fr");
        assert_eq!(store.get_raw(keys::LANGUAGE).as_deref(), Some("fr"));

        let store = MemoryStore::new();
        assert_eq!(resolve_locale(&store, None), "en");
    }
}
