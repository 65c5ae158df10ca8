//! Yew components for the FuturistCards UI.
//!
//! Widgets reach the shared service objects (API client, session, ledgers)
//! through the [`Services`] context provided at the application root.

use crate::config::{CELEBRATION_MS, SEARCH_DEBOUNCE_MS, TOAST_MS};
use crate::utils::{validate_email, validate_name, validate_password};
use futurist_cards::api::{Credentials, Registration};
use futurist_cards::{
    ApiClient, ApiError, Card, CardStats, FavoritesError, FavoritesLedger, GlobalStats, LikeList,
    LikeUpdate, Session, StatsLedger,
};
use gloo_timers::callback::Timeout;
use std::rc::Rc;
use wasm_bindgen_futures::spawn_local;
use web_sys::HtmlInputElement;
use yew::prelude::*;

/// Shared service objects, constructed once at startup and injected through
/// context. Equality is pointer identity: the set never changes after boot.
#[derive(Clone)]
pub struct Services {
    pub store: Rc<dyn futurist_cards::KeyValueStore>,
    pub api: Rc<ApiClient>,
    pub session: Rc<Session>,
    pub stats: Rc<StatsLedger>,
    pub favorites: Rc<FavoritesLedger>,
}

impl PartialEq for Services {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.api, &other.api) && Rc::ptr_eq(&self.stats, &other.stats)
    }
}

#[hook]
fn use_services() -> Services {
    use_context::<Services>().expect("Services context is provided at the root")
}

/// Schedule a transient message that clears itself.
fn flash_message(handle: &UseStateHandle<Option<String>>, text: String) {
    handle.set(Some(text));
    let handle = handle.clone();
    Timeout::new(TOAST_MS, move || handle.set(None)).forget();
}

// ──────────────────────────────────────────────────────────────────────────
// Stats summary bar

#[derive(Properties, PartialEq)]
pub struct StatsSummaryProps {
    pub global: GlobalStats,
}

#[function_component(StatsSummary)]
pub fn stats_summary(props: &StatsSummaryProps) -> Html {
    html! {
        <div class="stats-summary">
            <span class="stat">{ format!("{} cards", props.global.total_cards) }</span>
            <span class="stat">{ format!("{} likes", props.global.total_likes) }</span>
            <span class="stat">{ format!("{} views", props.global.total_views) }</span>
        </div>
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Like button

#[derive(Properties, PartialEq)]
pub struct LikeButtonProps {
    pub card_id: String,
    /// Initial known likers, as reported by the server.
    pub likes: Vec<String>,
    /// Notifies the page that ledger state changed and a re-render is due.
    #[prop_or_default]
    pub on_mutated: Callback<()>,
}

/// Click-to-toggle like control. The server's like list is authoritative:
/// a successful toggle adopts it and feeds it into the stats ledger. A
/// failed call falls back to a local-only optimistic flip.
#[function_component(LikeButton)]
pub fn like_button(props: &LikeButtonProps) -> Html {
    let services = use_services();
    let list = use_state(|| LikeList::from_likes(props.likes.clone()));
    let celebrating = use_state(|| false);
    let message = use_state(|| None::<String>);

    // A server refresh of the card resets the local list.
    {
        let list = list.clone();
        use_effect_with(props.likes.clone(), move |likes| {
            list.set(LikeList::from_likes(likes.clone()));
            || ()
        });
    }

    let onclick = {
        let services = services.clone();
        let list = list.clone();
        let celebrating = celebrating.clone();
        let message = message.clone();
        let card_id = props.card_id.clone();
        let on_mutated = props.on_mutated.clone();
        Callback::from(move |_: MouseEvent| {
            let user = match services.session.current_user() {
                Some(user) => user,
                None => {
                    flash_message(&message, "Sign in to like cards".to_string());
                    return;
                }
            };
            let services = services.clone();
            let list = list.clone();
            let celebrating = celebrating.clone();
            let card_id = card_id.clone();
            let on_mutated = on_mutated.clone();
            spawn_local(async move {
                let mut working = (*list).clone();
                let update = working.toggle(services.api.as_ref(), &card_id, &user.id).await;
                match &update {
                    LikeUpdate::Server { .. } => {
                        services
                            .stats
                            .apply_server_likes(&card_id, working.likes(), Some(&user.id));
                    }
                    LikeUpdate::LocalFallback { .. } => {
                        // No server answer; fall back to the ledger's own
                        // optimistic counter.
                        services.stats.toggle_like(&card_id);
                    }
                }
                if update.liked() {
                    celebrating.set(true);
                    let celebrating = celebrating.clone();
                    Timeout::new(CELEBRATION_MS, move || celebrating.set(false)).forget();
                }
                list.set(working);
                on_mutated.emit(());
            });
        })
    };

    let user_id = services.session.user_id();
    let liked = user_id
        .as_deref()
        .map(|id| list.is_liked(id))
        .unwrap_or(false);
    let classes = classes!(
        "like-button",
        liked.then_some("liked"),
        (*celebrating).then_some("celebrating"),
    );

    html! {
        <span class="like-control">
            <button class={classes} {onclick} aria-pressed={liked.to_string()}>
                { if liked { "♥" } else { "♡" } }
                <span class="like-count">{ list.count() }</span>
            </button>
            if *celebrating {
                <span class="confetti" aria-hidden="true"></span>
            }
            if let Some(ref text) = *message {
                <span class="toast">{ text }</span>
            }
        </span>
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Favorite button

#[derive(Properties, PartialEq)]
pub struct FavoriteButtonProps {
    pub card_id: String,
    pub is_favorite: bool,
    #[prop_or_default]
    pub on_mutated: Callback<()>,
}

#[function_component(FavoriteButton)]
pub fn favorite_button(props: &FavoriteButtonProps) -> Html {
    let services = use_services();
    let message = use_state(|| None::<String>);

    let onclick = {
        let services = services.clone();
        let message = message.clone();
        let card_id = props.card_id.clone();
        let on_mutated = props.on_mutated.clone();
        Callback::from(move |_: MouseEvent| {
            let services = services.clone();
            let message = message.clone();
            let card_id = card_id.clone();
            let on_mutated = on_mutated.clone();
            spawn_local(async move {
                let result = services
                    .favorites
                    .toggle_favorite(services.api.as_ref(), &card_id)
                    .await;
                match result {
                    Ok(_) => {}
                    Err(FavoritesError::Remote(ApiError::Unauthorized)) => {
                        services.session.handle_unauthorized();
                        services.api.set_token(None);
                        services.favorites.set_current_user(None);
                        flash_message(&message, "Session expired, please sign in".to_string());
                    }
                    Err(err) => flash_message(&message, err.to_string()),
                }
                on_mutated.emit(());
            });
        })
    };

    html! {
        <span class="favorite-control">
            <button
                class={classes!("favorite-button", props.is_favorite.then_some("favorited"))}
                {onclick}
                aria-pressed={props.is_favorite.to_string()}
            >
                { if props.is_favorite { "★" } else { "☆" } }
            </button>
            if let Some(ref text) = *message {
                <span class="toast">{ text }</span>
            }
        </span>
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Card grid entry and detail view

#[derive(Properties, PartialEq)]
pub struct CardItemProps {
    pub card: Card,
    pub stats: CardStats,
    pub is_favorite: bool,
    pub on_open: Callback<String>,
    #[prop_or_default]
    pub on_mutated: Callback<()>,
}

#[function_component(CardItem)]
pub fn card_item(props: &CardItemProps) -> Html {
    let open = {
        let on_open = props.on_open.clone();
        let card_id = props.card.id.clone();
        Callback::from(move |_: MouseEvent| on_open.emit(card_id.clone()))
    };

    html! {
        <div class="card-item">
            <div class="card-item-body" onclick={open}>
                if let Some(ref image_url) = props.card.image_url {
                    <img src={image_url.clone()} alt={props.card.title.clone()} />
                }
                <h3>{ &props.card.title }</h3>
                if let Some(ref subtitle) = props.card.subtitle {
                    <p class="subtitle">{ subtitle }</p>
                }
                <span class="view-count">{ format!("{} views", props.stats.view_count) }</span>
            </div>
            <div class="card-item-actions">
                <LikeButton
                    card_id={props.card.id.clone()}
                    likes={props.card.likes.clone()}
                    on_mutated={props.on_mutated.clone()}
                />
                <FavoriteButton
                    card_id={props.card.id.clone()}
                    is_favorite={props.is_favorite}
                    on_mutated={props.on_mutated.clone()}
                />
            </div>
        </div>
    }
}

#[derive(Properties, PartialEq)]
pub struct CardDetailProps {
    pub card: Card,
    pub stats: CardStats,
    pub on_close: Callback<()>,
}

#[function_component(CardDetail)]
pub fn card_detail(props: &CardDetailProps) -> Html {
    let close = {
        let on_close = props.on_close.clone();
        Callback::from(move |_: MouseEvent| on_close.emit(()))
    };

    html! {
        <div class="card-detail">
            <button class="close" onclick={close}>{ "×" }</button>
            <h2>{ &props.card.title }</h2>
            if let Some(ref subtitle) = props.card.subtitle {
                <p class="subtitle">{ subtitle }</p>
            }
            if let Some(ref description) = props.card.description {
                <p class="description">{ description }</p>
            }
            <ul class="contact">
                if let Some(ref phone) = props.card.phone {
                    <li>{ format!("Phone: {}", phone) }</li>
                }
                if let Some(ref email) = props.card.email {
                    <li>{ format!("Email: {}", email) }</li>
                }
                if let Some(ref web) = props.card.web {
                    <li>{ format!("Web: {}", web) }</li>
                }
            </ul>
            <div class="detail-stats">
                { format!("{} likes · {} views", props.stats.like_count, props.stats.view_count) }
            </div>
        </div>
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Debounced search box

#[derive(Properties, PartialEq)]
pub struct SearchBoxProps {
    /// Emitted with the trimmed query once typing settles; empty string
    /// means the search was cleared.
    pub on_query: Callback<String>,
}

#[function_component(SearchBox)]
pub fn search_box(props: &SearchBoxProps) -> Html {
    let text = use_state(String::new);
    let debounce_timer = use_state(|| None::<Timeout>);

    let oninput = {
        let text = text.clone();
        let debounce_timer = debounce_timer.clone();
        let on_query = props.on_query.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            let value = input.value();
            text.set(value.clone());

            // Cancel any pending emit by replacing the timer.
            debounce_timer.set(None);
            let on_query = on_query.clone();
            let timer_clear = debounce_timer.clone();
            let handle = Timeout::new(SEARCH_DEBOUNCE_MS, move || {
                on_query.emit(value.trim().to_string());
                timer_clear.set(None);
            });
            debounce_timer.set(Some(handle));
        })
    };

    html! {
        <input
            type="search"
            class="search-box"
            placeholder="Search cards…"
            value={(*text).clone()}
            {oninput}
        />
    }
}

// ──────────────────────────────────────────────────────────────────────────
// Login / register form

#[derive(Properties, PartialEq)]
pub struct LoginFormProps {
    /// Emitted after a successful login or registration.
    #[prop_or_default]
    pub on_session_changed: Callback<()>,
}

#[function_component(LoginForm)]
pub fn login_form(props: &LoginFormProps) -> Html {
    let services = use_services();
    let registering = use_state(|| false);
    let name = use_state(String::new);
    let email = use_state(String::new);
    let password = use_state(String::new);
    let is_business = use_state(|| false);
    let error = use_state(|| None::<String>);
    let busy = use_state(|| false);

    let name_oninput = {
        let name = name.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            name.set(input.value());
        })
    };
    let email_oninput = {
        let email = email.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            email.set(input.value());
        })
    };
    let password_oninput = {
        let password = password.clone();
        Callback::from(move |e: InputEvent| {
            let input: HtmlInputElement = e.target_unchecked_into();
            password.set(input.value());
        })
    };
    let business_onchange = {
        let is_business = is_business.clone();
        Callback::from(move |e: Event| {
            let input: HtmlInputElement = e.target_unchecked_into();
            is_business.set(input.checked());
        })
    };
    let toggle_mode = {
        let registering = registering.clone();
        let error = error.clone();
        Callback::from(move |_: MouseEvent| {
            registering.set(!*registering);
            error.set(None);
        })
    };

    let submit = {
        let services = services.clone();
        let registering = registering.clone();
        let name = name.clone();
        let email = email.clone();
        let password = password.clone();
        let is_business = is_business.clone();
        let error = error.clone();
        let busy = busy.clone();
        let on_session_changed = props.on_session_changed.clone();
        Callback::from(move |_: MouseEvent| {
            if *busy {
                return;
            }
            let email_value = match validate_email(&email) {
                Ok(value) => value,
                Err(err) => {
                    error.set(Some(err));
                    return;
                }
            };
            let password_value = match validate_password(&password) {
                Ok(value) => value,
                Err(err) => {
                    error.set(Some(err));
                    return;
                }
            };
            let registration = if *registering {
                match validate_name(&name) {
                    Ok(name_value) => Some(Registration {
                        name: name_value,
                        email: email_value.clone(),
                        password: password_value.clone(),
                        is_business: *is_business,
                    }),
                    Err(err) => {
                        error.set(Some(err));
                        return;
                    }
                }
            } else {
                None
            };

            busy.set(true);
            error.set(None);
            let services = services.clone();
            let error = error.clone();
            let busy = busy.clone();
            let on_session_changed = on_session_changed.clone();
            spawn_local(async move {
                let result = match registration {
                    Some(registration) => services.api.register(&registration).await,
                    None => {
                        services
                            .api
                            .login(&Credentials {
                                email: email_value,
                                password: password_value,
                            })
                            .await
                    }
                };
                match result {
                    Ok(auth) => {
                        services.api.set_token(Some(auth.token.clone()));
                        services.session.login(auth.token, auth.user.clone());
                        services.favorites.set_current_user(Some(&auth.user.id));
                        on_session_changed.emit(());
                    }
                    Err(err) => error.set(Some(err.to_string())),
                }
                busy.set(false);
            });
        })
    };

    html! {
        <div class="login-form">
            if *registering {
                <input type="text" placeholder="Name" value={(*name).clone()} oninput={name_oninput} />
            }
            <input type="email" placeholder="Email" value={(*email).clone()} oninput={email_oninput} />
            <input type="password" placeholder="Password" value={(*password).clone()} oninput={password_oninput} />
            if *registering {
                <label class="business-toggle">
                    <input type="checkbox" checked={*is_business} onchange={business_onchange} />
                    { "Business account" }
                </label>
            }
            <button class="primary" onclick={submit} disabled={*busy}>
                { if *registering { "Create account" } else { "Sign in" } }
            </button>
            <button class="link" onclick={toggle_mode}>
                { if *registering { "Have an account? Sign in" } else { "New here? Register" } }
            </button>
            if let Some(ref err) = *error {
                <div class="form-error">{ err }</div>
            }
        </div>
    }
}
