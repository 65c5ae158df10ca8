//! FuturistCards application entry point using Yew.
//! Wires the shared service objects, contexts, and page-level state.

use futurist_cards::{
    broadcast::BroadcastBus, theme, ApiError, Card, FavoritesLedger, KeyValueStore, Session,
    StatsLedger, StorageEventBridge,
};
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use yew::prelude::*;

mod components;
mod config;
mod utils;

use components::{CardDetail, CardItem, LoginForm, SearchBox, Services, StatsSummary};

/// Build the service objects once at startup. All widgets share these
/// instances through the `Services` context.
fn build_services() -> Services {
    let store: Rc<dyn KeyValueStore> = {
        #[cfg(target_arch = "wasm32")]
        {
            Rc::new(futurist_cards::BrowserStore::new())
        }
        #[cfg(not(target_arch = "wasm32"))]
        {
            Rc::new(futurist_cards::MemoryStore::new())
        }
    };

    let bus = Rc::new(BroadcastBus::new());
    let stats = StatsLedger::new(store.clone(), bus);
    StatsLedger::attach_to_bus(&stats);

    let favorites = FavoritesLedger::new(store.clone());
    let session = Session::restore(store.clone());
    favorites.set_current_user(session.user_id().as_deref());

    let api = Rc::new(futurist_cards::ApiClient::new(config::API_BASE_URL));
    api.set_token(session.token());

    Services {
        store,
        api,
        session,
        stats,
        favorites,
    }
}

#[function_component(Main)]
fn main_component() -> Html {
    let services = use_memo((), |_| build_services());
    let services = (*services).clone();

    let cards = use_state(Vec::<Card>::new);
    let selected_card = use_state(|| None::<Card>);
    let error_message = use_state(|| None::<String>);
    let current_user = use_state(|| services.session.current_user());
    // Ledger version bumps force a re-render after service-object mutations.
    let ledger_version = use_state(|| 0usize);
    let theme = use_state({
        let store = services.store.clone();
        move || theme::bootstrap(store.as_ref()).0
    });

    let bump_version = {
        let ledger_version = ledger_version.clone();
        Callback::from(move |_: ()| ledger_version.set(ledger_version.wrapping_add(1)))
    };

    // Keep the storage-event bridge alive so sibling-tab envelopes replay.
    {
        let stats = services.stats.clone();
        use_effect_with((), move |_| {
            let bridge = StorageEventBridge::attach(stats);
            move || drop(bridge)
        });
    }

    // Re-verify a restored session against the backend.
    {
        let services = services.clone();
        let current_user = current_user.clone();
        use_effect_with((), move |_| {
            if services.session.is_authenticated() {
                spawn_local(async move {
                    match services.api.verify().await {
                        Ok(fresh) => {
                            if let Some(token) = services.session.token() {
                                services.session.login(token, fresh.clone());
                            }
                            services.favorites.set_current_user(Some(&fresh.id));
                            current_user.set(Some(fresh));
                        }
                        Err(ApiError::Unauthorized) => {
                            services.session.handle_unauthorized();
                            services.api.set_token(None);
                            services.favorites.set_current_user(None);
                            current_user.set(None);
                        }
                        Err(err) => log::warn!("session verification failed: {}", err),
                    }
                });
            }
            || ()
        });
    }

    // Initial card load: seed the ledger from the server's like lists.
    {
        let services = services.clone();
        let cards = cards.clone();
        let error_message = error_message.clone();
        let bump_version = bump_version.clone();
        use_effect_with((), move |_| {
            spawn_local(async move {
                match services.api.fetch_cards().await {
                    Ok(fetched) => {
                        ingest_cards(&services, &fetched);
                        cards.set(fetched);
                        error_message.set(None);
                        bump_version.emit(());
                    }
                    Err(err) => error_message.set(Some(err.to_string())),
                }
            });
            || ()
        });
    }

    let on_query = {
        let services = services.clone();
        let cards = cards.clone();
        let error_message = error_message.clone();
        let bump_version = bump_version.clone();
        Callback::from(move |query: String| {
            let services = services.clone();
            let cards = cards.clone();
            let error_message = error_message.clone();
            let bump_version = bump_version.clone();
            spawn_local(async move {
                let result = if query.is_empty() {
                    services.api.fetch_cards().await
                } else {
                    services.api.search_cards(&query).await
                };
                match result {
                    Ok(found) => {
                        ingest_cards(&services, &found);
                        cards.set(found);
                        error_message.set(None);
                        bump_version.emit(());
                    }
                    Err(err) => error_message.set(Some(err.to_string())),
                }
            });
        })
    };

    // Opening a card records a view.
    let on_open = {
        let services = services.clone();
        let cards = cards.clone();
        let selected_card = selected_card.clone();
        let bump_version = bump_version.clone();
        Callback::from(move |card_id: String| {
            services.stats.increment_views(&card_id);
            let card = cards.iter().find(|card| card.id == card_id).cloned();
            selected_card.set(card);
            bump_version.emit(());
        })
    };

    let on_close_detail = {
        let selected_card = selected_card.clone();
        Callback::from(move |_: ()| selected_card.set(None))
    };

    let on_session_changed = {
        let services = services.clone();
        let current_user = current_user.clone();
        let bump_version = bump_version.clone();
        Callback::from(move |_: ()| {
            current_user.set(services.session.current_user());
            bump_version.emit(());
        })
    };

    let on_logout = {
        let services = services.clone();
        let current_user = current_user.clone();
        let bump_version = bump_version.clone();
        Callback::from(move |_: MouseEvent| {
            services.session.logout();
            services.api.set_token(None);
            services.favorites.set_current_user(None);
            current_user.set(None);
            bump_version.emit(());
        })
    };

    let on_toggle_theme = {
        let theme = theme.clone();
        let store = services.store.clone();
        Callback::from(move |_: MouseEvent| {
            let next = theme.toggled();
            theme::persist_theme(store.as_ref(), next);
            theme::apply_theme(next);
            theme.set(next);
        })
    };

    // Reading the version ties this render to ledger mutations.
    let _ = *ledger_version;
    let global = services.stats.global_stats();

    html! {
        <ContextProvider<Services> context={services.clone()}>
            <div class="app" data-theme={theme.as_str()}>
                <header class="app-header">
                    <h1>{ "FuturistCards" }</h1>
                    <StatsSummary global={global} />
                    <button class="theme-toggle" onclick={on_toggle_theme}>
                        { if theme.is_dark() { "☀" } else { "☾" } }
                    </button>
                    if let Some(ref user) = *current_user {
                        <span class="signed-in">{ format!("Hi, {}", user.name) }</span>
                        <button class="logout" onclick={on_logout}>{ "Sign out" }</button>
                    }
                </header>

                if current_user.is_none() {
                    <LoginForm on_session_changed={on_session_changed} />
                }

                <SearchBox on_query={on_query} />

                if let Some(ref err) = *error_message {
                    <div class="error-banner">{ err }</div>
                }

                <div class="card-grid">
                    { cards.iter().map(|card| {
                        html! {
                            <CardItem
                                key={card.id.clone()}
                                card={card.clone()}
                                stats={services.stats.get_stats(&card.id)}
                                is_favorite={services.favorites.is_favorite(&card.id)}
                                on_open={on_open.clone()}
                                on_mutated={bump_version.clone()}
                            />
                        }
                    }).collect::<Html>() }
                </div>

                if let Some(ref card) = *selected_card {
                    <CardDetail
                        card={card.clone()}
                        stats={services.stats.get_stats(&card.id)}
                        on_close={on_close_detail}
                    />
                }
            </div>
        </ContextProvider<Services>>
    }
}

/// Register fetched cards with the stats ledger: lazily initialize their
/// entries and adopt the server's authoritative like lists.
fn ingest_cards(services: &Services, cards: &[Card]) {
    services
        .stats
        .initialize_many(cards.iter().map(|card| card.id.as_str()));
    let user_id = services.session.user_id();
    for card in cards {
        services
            .stats
            .apply_server_likes(&card.id, &card.likes, user_id.as_deref());
    }
}

#[function_component(App)]
pub fn app() -> Html {
    html! { <Main /> }
}

/// Entry point: initializes logging and the Yew renderer.
fn main() {
    #[cfg(target_arch = "wasm32")]
    {
        console_error_panic_hook::set_once();
        wasm_logger::init(wasm_logger::Config::default());
    }
    yew::Renderer::<App>::new().render();
}
