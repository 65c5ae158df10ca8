//! REST client for the FuturistCards backend.
//!
//! Thin pass-through over `reqwest` (fetch-backed on wasm): no retries, no
//! backoff, no request timeouts. Authenticated calls attach the bearer
//! token; a 401 maps to [`ApiError::Unauthorized`], which the session layer
//! turns into a client-side logout.

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::fmt;

#[derive(Debug)]
pub enum ApiError {
    /// 401 from any endpoint; triggers logout at the session boundary.
    Unauthorized,
    /// Any other non-2xx status, with the response body for context.
    Status(u16, String),
    /// Transport-level failure (offline, DNS, aborted fetch).
    Network(String),
    /// 2xx response whose body did not decode as expected.
    Decode(String),
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::Unauthorized => write!(f, "Not authenticated"),
            ApiError::Status(status, body) => {
                write!(f, "Server rejected the request ({}): {}", status, body)
            }
            ApiError::Network(err) => write!(f, "Network failure: {}", err),
            ApiError::Decode(err) => write!(f, "Unexpected response body: {}", err),
        }
    }
}

impl std::error::Error for ApiError {}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    #[serde(default)]
    pub is_business: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Card {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
    #[serde(default)]
    pub owner_id: Option<String>,
    /// User ids that currently like this card.
    #[serde(default)]
    pub likes: Vec<String>,
}

/// Payload for card creation and update.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CardDraft {
    pub title: String,
    #[serde(default)]
    pub subtitle: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub phone: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub web: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub name: String,
    pub email: String,
    pub password: String,
    pub is_business: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

#[derive(Debug, Deserialize)]
struct LikesResponse {
    likes: Vec<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteCheckResponse {
    is_favorite: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct FavoriteToggleRequest<'a> {
    card_id: &'a str,
}

pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    token: RefCell<Option<String>>,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into(),
            token: RefCell::new(None),
        }
    }

    pub fn set_token(&self, token: Option<String>) {
        *self.token.borrow_mut() = token;
    }

    fn request(&self, method: reqwest::Method, path: &str) -> reqwest::RequestBuilder {
        let mut builder = self
            .http
            .request(method, format!("{}{}", self.base_url, path));
        if let Some(token) = self.token.borrow().as_ref() {
            builder = builder.bearer_auth(token);
        }
        builder
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        builder: reqwest::RequestBuilder,
    ) -> Result<T, ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), body));
        }
        response
            .json()
            .await
            .map_err(|err| ApiError::Decode(err.to_string()))
    }

    async fn send_no_body(&self, builder: reqwest::RequestBuilder) -> Result<(), ApiError> {
        let response = builder
            .send()
            .await
            .map_err(|err| ApiError::Network(err.to_string()))?;
        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ApiError::Unauthorized);
        }
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ApiError::Status(status.as_u16(), body));
        }
        Ok(())
    }

    // --- auth ---

    pub async fn login(&self, credentials: &Credentials) -> Result<AuthResponse, ApiError> {
        self.send_json(
            self.request(reqwest::Method::POST, "/auth/login")
                .json(credentials),
        )
        .await
    }

    pub async fn register(&self, registration: &Registration) -> Result<AuthResponse, ApiError> {
        self.send_json(
            self.request(reqwest::Method::POST, "/auth/register")
                .json(registration),
        )
        .await
    }

    pub async fn verify(&self) -> Result<User, ApiError> {
        self.send_json(self.request(reqwest::Method::GET, "/auth/verify"))
            .await
    }

    // --- cards ---

    pub async fn fetch_cards(&self) -> Result<Vec<Card>, ApiError> {
        self.send_json(self.request(reqwest::Method::GET, "/cards"))
            .await
    }

    pub async fn fetch_card(&self, card_id: &str) -> Result<Card, ApiError> {
        self.send_json(self.request(reqwest::Method::GET, &format!("/cards/{}", card_id)))
            .await
    }

    pub async fn create_card(&self, draft: &CardDraft) -> Result<Card, ApiError> {
        self.send_json(self.request(reqwest::Method::POST, "/cards").json(draft))
            .await
    }

    pub async fn update_card(&self, card_id: &str, draft: &CardDraft) -> Result<Card, ApiError> {
        self.send_json(
            self.request(reqwest::Method::PUT, &format!("/cards/{}", card_id))
                .json(draft),
        )
        .await
    }

    pub async fn delete_card(&self, card_id: &str) -> Result<(), ApiError> {
        self.send_no_body(self.request(reqwest::Method::DELETE, &format!("/cards/{}", card_id)))
            .await
    }

    pub async fn search_cards(&self, query: &str) -> Result<Vec<Card>, ApiError> {
        self.send_json(
            self.request(reqwest::Method::GET, "/cards/search")
                .query(&[("q", query)]),
        )
        .await
    }

    /// Strict toggle: every call flips the current user's membership in the
    /// like list and returns the server's authoritative list.
    pub async fn toggle_like(&self, card_id: &str) -> Result<Vec<String>, ApiError> {
        let response: LikesResponse = self
            .send_json(self.request(reqwest::Method::POST, &format!("/cards/{}/like", card_id)))
            .await?;
        Ok(response.likes)
    }

    // --- favorites ---

    pub async fn fetch_favorites(&self) -> Result<Vec<Card>, ApiError> {
        self.send_json(self.request(reqwest::Method::GET, "/favorites"))
            .await
    }

    pub async fn toggle_favorite(&self, card_id: &str) -> Result<bool, ApiError> {
        let response: FavoriteCheckResponse = self
            .send_json(
                self.request(reqwest::Method::POST, "/favorites/toggle")
                    .json(&FavoriteToggleRequest { card_id }),
            )
            .await?;
        Ok(response.is_favorite)
    }

    pub async fn remove_favorite(&self, card_id: &str) -> Result<(), ApiError> {
        self.send_no_body(
            self.request(reqwest::Method::DELETE, &format!("/favorites/{}", card_id)),
        )
        .await
    }

    pub async fn check_favorite(&self, card_id: &str) -> Result<bool, ApiError> {
        let response: FavoriteCheckResponse = self
            .send_json(
                self.request(reqwest::Method::GET, &format!("/favorites/check/{}", card_id)),
            )
            .await?;
        Ok(response.is_favorite)
    }
}
