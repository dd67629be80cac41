use chrono::{DateTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

use super::DecodeError;

/// A single bid observation produced by the upstream exchange.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidEvent {
    pub campaign_id: String,
    /// Ad platform the bid was observed on (e.g. "google", "meta").
    pub platform: String,
    pub current_cpc: f64,
    pub current_cvr: f64,
    /// When the exchange observed the bid. Travels as `timestamp` on the wire.
    #[serde(rename = "timestamp")]
    pub observed_at: DateTime<Utc>,
}

impl BidEvent {
    /// Decode a stream payload and validate the result.
    pub fn decode(payload: &[u8]) -> Result<Self, DecodeError> {
        let event: BidEvent =
            serde_json::from_slice(payload).map_err(|e| DecodeError::Malformed(e.to_string()))?;
        event.validate()?;
        Ok(event)
    }

    /// Reject events that decode structurally but carry impossible values.
    pub fn validate(&self) -> Result<(), DecodeError> {
        if self.campaign_id.trim().is_empty() {
            return Err(DecodeError::Invalid("campaign_id is empty".to_string()));
        }
        if self.platform.trim().is_empty() {
            return Err(DecodeError::Invalid("platform is empty".to_string()));
        }
        if !self.current_cpc.is_finite() || self.current_cpc < 0.0 {
            return Err(DecodeError::Invalid(format!(
                "current_cpc must be a finite number >= 0, got {}",
                self.current_cpc
            )));
        }
        if !self.current_cvr.is_finite() || !(0.0..=1.0).contains(&self.current_cvr) {
            return Err(DecodeError::Invalid(format!(
                "current_cvr must be within [0, 1], got {}",
                self.current_cvr
            )));
        }
        Ok(())
    }

    /// Composite key `bid:{campaign}:{platform}:{observed_at}`.
    ///
    /// Re-inserting an event with the same key overwrites the previous entry.
    pub fn store_key(&self) -> String {
        format!(
            "{}{}:{}",
            campaign_key_prefix(&self.campaign_id),
            self.platform,
            self.observed_at.to_rfc3339_opts(SecondsFormat::AutoSi, true)
        )
    }
}

/// Key prefix under which all bids of a campaign are stored.
pub fn campaign_key_prefix(campaign_id: &str) -> String {
    format!("bid:{}:", campaign_id)
}

/// Smallest key sorting after every key under [`campaign_key_prefix`].
pub fn campaign_key_upper_bound(campaign_id: &str) -> String {
    format!("bid:{};", campaign_id)
}

/// An advertising campaign as read from the catalog.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Campaign {
    pub id: String,
    pub budget: f64,
    pub target_reach: i64,
    pub preferred_platform: String,
    /// Highest cost-per-click the campaign accepts.
    pub max_cpc: f64,
    #[serde(default = "default_active")]
    pub active: bool,
}

fn default_active() -> bool {
    true
}

/// Outcome of scoring one campaign in one tick.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BidDecision {
    pub campaign_id: String,
    pub platform: String,
    pub bid_amount: f64,
    pub should_bid: bool,
    pub decided_at: DateTime<Utc>,
}
