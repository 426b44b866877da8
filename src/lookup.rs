//! Client for the external nutrition database used to seed new foods.

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::NutritionApiConfig;

/// One food as described by the nutrition service, per 100g.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionItem {
    #[serde(default = "unknown_name")]
    pub name: String,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub calories: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub carbohydrates_total_g: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub protein_g: Decimal,
    #[serde(default, with = "rust_decimal::serde::float")]
    pub fat_total_g: Decimal,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub serving_size_g: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub fat_saturated_g: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub sodium_mg: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub potassium_mg: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub cholesterol_mg: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub fiber_g: Option<Decimal>,
    #[serde(default, with = "rust_decimal::serde::float_option")]
    pub sugar_g: Option<Decimal>,
}

fn unknown_name() -> String {
    "Unknown".into()
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    items: Vec<NutritionItem>,
}

/// The service could not be reached or answered with an error. An empty
/// result is not an error.
#[derive(Debug, thiserror::Error)]
pub enum LookupError {
    #[error("nutrition query is empty")]
    EmptyQuery,
    #[error("nutrition service request failed: {0}")]
    Request(#[from] reqwest::Error),
    #[error("nutrition service answered {0}")]
    Status(reqwest::StatusCode),
}

#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// Every item matching `query`; empty when nothing matched.
    async fn search(&self, query: &str) -> Result<Vec<NutritionItem>, LookupError>;
}

#[derive(Clone)]
pub struct CalorieNinjasClient {
    http: reqwest::Client,
    base_url: String,
    api_key: String,
}

impl CalorieNinjasClient {
    pub fn new(config: &NutritionApiConfig) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(10))
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.clone(),
        })
    }
}

#[async_trait]
impl NutritionLookup for CalorieNinjasClient {
    async fn search(&self, query: &str) -> Result<Vec<NutritionItem>, LookupError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(LookupError::EmptyQuery);
        }

        let res = self
            .http
            .get(format!("{}/v1/nutrition", self.base_url))
            .query(&[("query", query)])
            .header("X-Api-Key", &self.api_key)
            .send()
            .await?;

        let status = res.status();
        if !status.is_success() {
            warn!(%status, query, "nutrition lookup rejected");
            return Err(LookupError::Status(status));
        }

        let body: SearchResponse = res.json().await?;
        if body.items.is_empty() {
            warn!(query, "no nutrition data found");
        } else {
            debug!(query, items = body.items.len(), "nutrition lookup ok");
        }
        Ok(body.items)
    }
}
