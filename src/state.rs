use std::sync::Arc;

use sqlx::PgPool;

use crate::auth::revocation::{PgDenylist, TokenDenylist};
use crate::clock::{Clock, SystemClock};
use crate::config::AppConfig;
use crate::lookup::{CalorieNinjasClient, NutritionLookup};
use crate::storage::{ObjectStore, S3Store};

#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub config: Arc<AppConfig>,
    pub storage: Arc<dyn ObjectStore>,
    pub clock: Arc<dyn Clock>,
    pub nutrition: Arc<dyn NutritionLookup>,
    pub revoked: Arc<dyn TokenDenylist>,
}

impl AppState {
    pub async fn init() -> anyhow::Result<Self> {
        let config = Arc::new(AppConfig::from_env()?);

        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(10)
            .connect(&config.database_url)
            .await?;

        let storage = Arc::new(S3Store::new(&config.storage).await?) as Arc<dyn ObjectStore>;
        let nutrition =
            Arc::new(CalorieNinjasClient::new(&config.nutrition_api)?) as Arc<dyn NutritionLookup>;

        let revoked = Arc::new(PgDenylist::new(db.clone())) as Arc<dyn TokenDenylist>;

        Ok(Self {
            db,
            config,
            storage,
            clock: Arc::new(SystemClock),
            nutrition,
            revoked,
        })
    }

    /// State whose pool never connects: good for anything that fails or
    /// answers before reaching the database.
    #[cfg(test)]
    pub fn fake() -> Self {
        use crate::auth::revocation::tests::MemoryDenylist;
        use crate::clock::FixedClock;
        use crate::lookup::{LookupError, NutritionItem};
        use crate::storage::tests::MemoryStore;
        use axum::async_trait;
        use rust_decimal_macros::dec;
        use time::macros::date;

        struct StubLookup;

        #[async_trait]
        impl NutritionLookup for StubLookup {
            async fn search(&self, query: &str) -> Result<Vec<NutritionItem>, LookupError> {
                if query.eq_ignore_ascii_case("banana") {
                    Ok(vec![NutritionItem {
                        name: "banana".into(),
                        calories: dec!(89.4),
                        carbohydrates_total_g: dec!(23.2),
                        protein_g: dec!(1.1),
                        fat_total_g: dec!(0.3),
                        serving_size_g: Some(dec!(100.0)),
                        fat_saturated_g: None,
                        sodium_mg: Some(dec!(1)),
                        potassium_mg: Some(dec!(22)),
                        cholesterol_mg: None,
                        fiber_g: Some(dec!(2.6)),
                        sugar_g: Some(dec!(12.3)),
                    }])
                } else if query.eq_ignore_ascii_case("offline") {
                    Err(LookupError::Status(reqwest::StatusCode::SERVICE_UNAVAILABLE))
                } else {
                    Ok(Vec::new())
                }
            }
        }

        let config = Arc::new(AppConfig::test_default());
        let db = sqlx::postgres::PgPoolOptions::new()
            .connect_lazy(&config.database_url)
            .expect("lazy pool ok");

        Self {
            db,
            config,
            storage: Arc::new(MemoryStore::default()),
            clock: Arc::new(FixedClock(date!(2024 - 06 - 15))),
            nutrition: Arc::new(StubLookup),
            revoked: Arc::new(MemoryDenylist::default()),
        }
    }
}
