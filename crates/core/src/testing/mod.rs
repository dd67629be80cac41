//! Testing utilities and mock implementations of the backend traits.
//!
//! Lets the orchestrator and ingestion worker run end to end without a real
//! catalog database or ledger.
//!
//! # Example
//!
//! ```rust,ignore
//! use bidpipe_core::testing::{fixtures, MockCampaignCatalog, MockDecisionLedger};
//!
//! let catalog = MockCampaignCatalog::new();
//! catalog.set_campaigns(vec![fixtures::campaign("c1", "google", 5.0)]).await;
//!
//! let ledger = MockDecisionLedger::new();
//! ledger.fail_for("c1").await;
//! ```

mod clock;
mod failing_store;
mod mock_catalog;
mod mock_ledger;

pub use clock::ManualClock;
pub use failing_store::FailingBidStore;
pub use mock_catalog::MockCampaignCatalog;
pub use mock_ledger::MockDecisionLedger;

/// Test fixtures and helper functions.
pub mod fixtures {
    use chrono::{DateTime, TimeDelta, Utc};

    use crate::model::{BidEvent, Campaign};
    use crate::pricing::{PricingModel, DEFAULT_COEFFICIENT_KEY};

    /// 2024-01-01T00:00:00Z
    const BASE_EPOCH_SECS: i64 = 1_704_067_200;

    /// A fixed instant `offset` minutes after 2024-01-01T00:00:00Z.
    pub fn minute(offset: i64) -> DateTime<Utc> {
        DateTime::<Utc>::UNIX_EPOCH + TimeDelta::seconds(BASE_EPOCH_SECS + offset * 60)
    }

    /// A bid observed at [`minute`]`(at_minute)`.
    pub fn bid_at(
        campaign_id: &str,
        platform: &str,
        cpc: f64,
        cvr: f64,
        at_minute: i64,
    ) -> BidEvent {
        BidEvent {
            campaign_id: campaign_id.to_string(),
            platform: platform.to_string(),
            current_cpc: cpc,
            current_cvr: cvr,
            observed_at: minute(at_minute),
        }
    }

    /// An active campaign with reasonable defaults.
    pub fn campaign(id: &str, preferred_platform: &str, max_cpc: f64) -> Campaign {
        Campaign {
            id: id.to_string(),
            budget: 1_000.0,
            target_reach: 10_000,
            preferred_platform: preferred_platform.to_string(),
            max_cpc,
            active: true,
        }
    }

    /// A pricing model with the given platform coefficients plus `default`.
    pub fn pricing_model(platforms: &[(&str, f64)], default: f64) -> PricingModel {
        let mut coefficients: std::collections::HashMap<String, f64> = platforms
            .iter()
            .map(|(platform, value)| (platform.to_string(), *value))
            .collect();
        coefficients.insert(DEFAULT_COEFFICIENT_KEY.to_string(), default);

        PricingModel {
            coefficients,
            intercept: 0.0,
        }
    }
}
