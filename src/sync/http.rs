//! HTTP remote store (browser `fetch`)
//!
//! Routes: `GET /api/leaderboard`, `POST /api/player {name}`,
//! `POST /api/submit-score {name, score, time, attempts, new}`.

use serde::Deserialize;
use wasm_bindgen::{JsCast, JsValue};
use wasm_bindgen_futures::JsFuture;
use web_sys::{Request, RequestInit, Response};

use super::store::{RemoteStore, StoreError, SubmitScore};
use crate::leaderboard::{PlayerRecord, Progress, rank_records};

/// Record as the server serializes it (`updated_at` is a date string)
#[derive(Debug, Deserialize)]
struct WireRecord {
    name: String,
    score: u32,
    time: u32,
    #[serde(default = "one")]
    attempts: u32,
    #[serde(default)]
    updated_at: Option<String>,
}

fn one() -> u32 {
    1
}

impl From<WireRecord> for PlayerRecord {
    fn from(wire: WireRecord) -> Self {
        let updated_at = wire
            .updated_at
            .as_deref()
            .map(js_sys::Date::parse)
            .filter(|ms| ms.is_finite())
            .unwrap_or(0.0);
        PlayerRecord::new(
            wire.name,
            Progress {
                score: wire.score,
                time: wire.time,
                attempts: wire.attempts,
            },
            updated_at,
        )
    }
}

#[derive(Debug, Deserialize)]
struct SubmitResponse {
    score: WireRecord,
}

fn unavailable(err: JsValue) -> StoreError {
    StoreError::Unavailable(format!("{err:?}"))
}

fn decode(err: impl std::fmt::Display) -> StoreError {
    StoreError::Decode(err.to_string())
}

/// Remote store reached over `fetch`
#[derive(Debug, Clone)]
pub struct HttpStore {
    base_url: String,
}

impl HttpStore {
    /// `base_url` is prefixed to every route; empty means same origin
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
        }
    }

    async fn send(&self, method: &str, path: &str, body: Option<String>) -> Result<String, StoreError> {
        let window =
            web_sys::window().ok_or_else(|| StoreError::Unavailable("no window".to_string()))?;

        let init = RequestInit::new();
        init.set_method(method);
        if let Some(body) = &body {
            init.set_body(&JsValue::from_str(body));
        }

        let url = format!("{}{}", self.base_url, path);
        let request = Request::new_with_str_and_init(&url, &init).map_err(unavailable)?;
        if body.is_some() {
            request
                .headers()
                .set("Content-Type", "application/json")
                .map_err(unavailable)?;
        }

        let response = JsFuture::from(window.fetch_with_request(&request))
            .await
            .map_err(unavailable)?;
        let response: Response = response.dyn_into().map_err(unavailable)?;
        if !(200..300).contains(&response.status()) {
            return Err(StoreError::Status(response.status()));
        }

        let text = JsFuture::from(response.text().map_err(unavailable)?)
            .await
            .map_err(unavailable)?;
        text.as_string()
            .ok_or_else(|| StoreError::Decode("response body is not text".to_string()))
    }
}

impl RemoteStore for HttpStore {
    async fn leaderboard(&self, limit: usize) -> Result<Vec<PlayerRecord>, StoreError> {
        let body = self.send("GET", "/api/leaderboard", None).await?;
        let rows: Vec<WireRecord> = serde_json::from_str(&body).map_err(decode)?;
        Ok(rank_records(rows.into_iter().map(PlayerRecord::from), limit))
    }

    async fn player(&self, name: &str) -> Result<Option<Progress>, StoreError> {
        let request = serde_json::json!({ "name": name }).to_string();
        let body = self.send("POST", "/api/player", Some(request)).await?;
        serde_json::from_str::<Option<Progress>>(&body).map_err(decode)
    }

    async fn submit_score(&self, request: &SubmitScore) -> Result<PlayerRecord, StoreError> {
        let request = serde_json::to_string(request).map_err(decode)?;
        let body = self.send("POST", "/api/submit-score", Some(request)).await?;
        let response: SubmitResponse = serde_json::from_str(&body).map_err(decode)?;
        Ok(response.score.into())
    }
}
