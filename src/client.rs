//! Talks to the challenge server: fetches a new challenge and submits the
//! resulting ledger.

use crate::domain::{ActionKind, Area, LedgerEntry, Order};
use crate::error::ClientError;
use anyhow::Result;
use reqwest::blocking::Client as ReqwestClient;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::Serialize;
use serde_json::json;
use std::time::Duration;
use tracing::info;

pub const DEFAULT_BASE_URL: &str = "https://api.cloudkitchens.com";
pub const HTTP_TIMEOUT_SECS: u64 = 5;
pub const MAX_SEED: u64 = 1 << 63;

/// One action as serialized on the wire, microsecond timestamps.
#[derive(Debug, Clone, Serialize)]
struct WireAction {
    timestamp: u64,
    id: String,
    action: &'static str,
    target: &'static str,
}

impl From<&LedgerEntry> for WireAction {
    fn from(entry: &LedgerEntry) -> Self {
        Self {
            timestamp: entry.timestamp,
            id: entry.id.clone(),
            action: action_str(entry.action),
            target: area_str(entry.target),
        }
    }
}

fn action_str(action: ActionKind) -> &'static str {
    match action {
        ActionKind::Place => "place",
        ActionKind::Move => "move",
        ActionKind::Pickup => "pickup",
        ActionKind::Discard => "discard",
    }
}

fn area_str(area: Area) -> &'static str {
    match area {
        Area::Heater => "heater",
        Area::Cooler => "cooler",
        Area::Shelf => "shelf",
    }
}

pub struct Client {
    http: ReqwestClient,
    base_url: String,
    auth: String,
}

/// Result of fetching a new challenge: the orders and the server-assigned
/// test id (carried in the `x-test-id` response header).
pub struct Challenge {
    pub orders: Vec<Order>,
    pub test_id: String,
}

impl Client {
    pub fn new(auth: &str) -> Self {
        let base_url = std::env::var("KITCHEN_CHALLENGE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        Self {
            http: ReqwestClient::new(),
            base_url,
            auth: auth.to_string(),
        }
    }

    /// `GET /new?auth=...[&seed=...][&name=...]`.
    pub fn fetch_challenge(&self, seed: Option<u64>, name: Option<&str>) -> Result<Challenge> {
        let mut query = vec![("auth", self.auth.clone())];
        if let Some(seed) = seed {
            query.push(("seed", seed.to_string()));
        }
        if let Some(name) = name {
            query.push(("name", name.to_string()));
        }

        let url = reqwest::Url::parse_with_params(&format!("{}/new", self.base_url), query)?;
        let response = self
            .http
            .get(url)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()?;

        let status = response.status();
        if status.as_u16() == 401 {
            return Err(ClientError::Authentication.into());
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Protocol {
                status: status.as_u16(),
                body_excerpt: body.chars().take(200).collect(),
            }
            .into());
        }

        let test_id = response
            .headers()
            .get("x-test-id")
            .and_then(|v| v.to_str().ok())
            .unwrap_or_default()
            .to_string();

        let orders: Vec<Order> = response.json()?;
        info!(test_id = %test_id, order_count = orders.len(), "fetched challenge");
        Ok(Challenge { orders, test_id })
    }

    /// `POST /solve?auth=...`, with `x-test-id` carried as a header.
    pub fn submit_solution(
        &self,
        test_id: &str,
        rate_micros: u64,
        min_pickup_micros: u64,
        max_pickup_micros: u64,
        ledger: &[LedgerEntry],
    ) -> Result<String> {
        let mut headers = HeaderMap::new();
        headers.insert("x-test-id", HeaderValue::from_str(test_id)?);
        headers.insert(CONTENT_TYPE, HeaderValue::from_str("application/json")?);

        let actions: Vec<WireAction> = ledger.iter().map(WireAction::from).collect();
        let body = json!({
            "options": {
                "rate": rate_micros,
                "min": min_pickup_micros,
                "max": max_pickup_micros,
            },
            "actions": actions,
        });

        let response = self
            .http
            .post(format!("{}/solve", self.base_url))
            .headers(headers)
            .query(&[("auth", &self.auth)])
            .json(&body)
            .timeout(Duration::from_secs(HTTP_TIMEOUT_SECS))
            .send()?;

        let status = response.status();
        if status.as_u16() == 409 {
            return Err(ClientError::DoubleSubmission(test_id.to_string()).into());
        }
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ClientError::Protocol {
                status: status.as_u16(),
                body_excerpt: body.chars().take(200).collect(),
            }
            .into());
        }

        Ok(response.text()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Temp;

    #[test]
    fn wire_action_round_trips_enum_strings() {
        let entry = LedgerEntry::new(1, "o1", ActionKind::Move, Area::Cooler);
        let wire = WireAction::from(&entry);
        assert_eq!(wire.action, "move");
        assert_eq!(wire.target, "cooler");
    }

    #[test]
    fn order_deserializes_from_wire_json() {
        let raw = r#"{"id":"o1","name":"Burger","temp":"hot","price":5.5,"freshness":120}"#;
        let order: Order = serde_json::from_str(raw).unwrap();
        assert_eq!(order.temp, Temp::Hot);
        assert_eq!(order.freshness, 120);
    }
}
