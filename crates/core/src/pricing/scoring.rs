//! Bid scoring.
//!
//! Pure and deterministic: the same campaign, window, model and decision
//! time always produce the same decision.

use chrono::{DateTime, Utc};

use super::PricingModel;
use crate::model::{BidDecision, BidEvent, Campaign};

/// Premium applied to the baseline CPC.
pub const MARKUP_FACTOR: f64 = 1.20;

/// Discount applied when recent bids rarely convert well.
pub const MARKDOWN_FACTOR: f64 = 0.80;

/// How many of the newest matching bids are checked for conversion quality.
/// The check only runs when strictly more matching bids than this exist.
pub const RECENT_SAMPLE_SIZE: usize = 10;

/// A bid "converts well" when its CVR is strictly above this.
pub const CVR_TARGET: f64 = 0.03;

/// Minimum share of well-converting bids in the sample to keep the premium.
pub const GOOD_CONVERSION_FLOOR: f64 = 0.20;

/// Score one campaign against its recent-bid window.
///
/// `window` must be newest first, as returned by the bid store.
pub fn evaluate_bid(
    campaign: &Campaign,
    window: &[BidEvent],
    model: &PricingModel,
    decided_at: DateTime<Utc>,
) -> BidDecision {
    let matching: Vec<&BidEvent> = window
        .iter()
        .filter(|bid| bid.platform == campaign.preferred_platform)
        .collect();

    let bid_amount = if matching.is_empty() {
        model.baseline_cpc(&campaign.preferred_platform) * MARKUP_FACTOR
    } else {
        let mean_cpc =
            matching.iter().map(|bid| bid.current_cpc).sum::<f64>() / matching.len() as f64;

        if matching.len() > RECENT_SAMPLE_SIZE
            && good_conversion_fraction(&matching[..RECENT_SAMPLE_SIZE]) < GOOD_CONVERSION_FLOOR
        {
            mean_cpc * MARKDOWN_FACTOR
        } else {
            mean_cpc * MARKUP_FACTOR
        }
    };

    BidDecision {
        campaign_id: campaign.id.clone(),
        platform: campaign.preferred_platform.clone(),
        bid_amount,
        should_bid: bid_amount <= campaign.max_cpc,
        decided_at,
    }
}

fn good_conversion_fraction(sample: &[&BidEvent]) -> f64 {
    if sample.is_empty() {
        return 0.0;
    }
    let good = sample
        .iter()
        .filter(|bid| bid.current_cvr > CVR_TARGET)
        .count();
    good as f64 / sample.len() as f64
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::fixtures;

    fn model(default: f64) -> PricingModel {
        fixtures::pricing_model(&[("meta", 0.9)], default)
    }

    /// Newest-first window of `cpcs.len()` bids; `good[i]` sets CVR above target.
    fn window(platform: &str, cpcs: &[f64], good: &[bool]) -> Vec<BidEvent> {
        let n = cpcs.len() as i64;
        cpcs.iter()
            .zip(good)
            .enumerate()
            .map(|(i, (&cpc, &is_good))| {
                let cvr = if is_good { 0.05 } else { 0.01 };
                fixtures::bid_at("c1", platform, cpc, cvr, n - i as i64)
            })
            .collect()
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_small_window_gets_markup() {
        let campaign = fixtures::campaign("c1", "google", 5.0);
        let bids = window("google", &[2.0, 3.0, 4.0], &[false; 3]);

        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert!(close(decision.bid_amount, 3.6));
        assert!(decision.should_bid);
        assert_eq!(decision.platform, "google");
        assert_eq!(decision.campaign_id, "c1");
    }

    #[test]
    fn test_sparse_conversions_mark_down() {
        let campaign = fixtures::campaign("c1", "google", 5.0);
        let cpcs: Vec<f64> = (1..=12).map(|i| i as f64 * 0.5).collect();
        let mut good = vec![false; 12];
        good[3] = true;
        // Older bids outside the 10-bid sample do not count.
        good[10] = true;
        good[11] = true;
        let bids = window("google", &cpcs, &good);

        let mean = cpcs.iter().sum::<f64>() / cpcs.len() as f64;
        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert_eq!(decision.bid_amount, mean * MARKDOWN_FACTOR);
    }

    #[test]
    fn test_enough_conversions_keep_markup() {
        let campaign = fixtures::campaign("c1", "google", 50.0);
        let cpcs = vec![2.0; 12];
        let mut good = vec![false; 12];
        good[0] = true;
        good[5] = true;
        let bids = window("google", &cpcs, &good);

        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert_eq!(decision.bid_amount, 2.0 * MARKUP_FACTOR);
    }

    #[test]
    fn test_exactly_ten_matching_skips_conversion_check() {
        let campaign = fixtures::campaign("c1", "google", 50.0);
        let bids = window("google", &[3.0; 10], &[false; 10]);

        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert_eq!(decision.bid_amount, 3.0 * MARKUP_FACTOR);
    }

    #[test]
    fn test_sample_only_uses_matching_platform() {
        let campaign = fixtures::campaign("c1", "google", 50.0);
        // Newest ten are on another platform and all convert well.
        let mut bids = window("meta", &[9.0; 10], &[true; 10]);
        bids.extend(window("google", &[2.0; 11], &[false; 11]));
        for (i, bid) in bids.iter_mut().enumerate() {
            bid.observed_at = fixtures::minute(100 - i as i64);
        }

        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert_eq!(decision.bid_amount, 2.0 * MARKDOWN_FACTOR);
    }

    #[test]
    fn test_no_matching_bids_uses_default_coefficient() {
        let campaign = fixtures::campaign("c1", "google", 5.0);
        let bids = window("tiktok", &[8.0, 9.0], &[true, true]);

        let decision = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(0));
        assert!(close(decision.bid_amount, 2.10));
        assert!(decision.bid_amount.is_finite());
        assert!(decision.should_bid);
    }

    #[test]
    fn test_no_matching_bids_prefers_platform_coefficient() {
        let campaign = fixtures::campaign("c1", "meta", 5.0);
        let decision = evaluate_bid(&campaign, &[], &model(1.75), fixtures::minute(0));
        assert_eq!(decision.bid_amount, 0.9 * MARKUP_FACTOR);
    }

    #[test]
    fn test_intercept_not_applied() {
        let campaign = fixtures::campaign("c1", "google", 5.0);
        let mut m = model(1.0);
        m.intercept = 100.0;
        let decision = evaluate_bid(&campaign, &[], &m, fixtures::minute(0));
        assert_eq!(decision.bid_amount, 1.0 * MARKUP_FACTOR);
    }

    #[test]
    fn test_should_bid_boundary_is_inclusive() {
        let bids = window("google", &[2.5], &[true]);
        let exact = 2.5 * MARKUP_FACTOR;

        let at_limit = fixtures::campaign("c1", "google", exact);
        assert!(evaluate_bid(&at_limit, &bids, &model(1.0), fixtures::minute(0)).should_bid);

        let below_limit = fixtures::campaign("c1", "google", exact - 1e-9);
        assert!(!evaluate_bid(&below_limit, &bids, &model(1.0), fixtures::minute(0)).should_bid);
    }

    #[test]
    fn test_decision_is_deterministic() {
        let campaign = fixtures::campaign("c1", "google", 5.0);
        let bids = window("google", &[1.0, 2.0, 3.0], &[true, false, true]);
        let a = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(7));
        let b = evaluate_bid(&campaign, &bids, &model(1.75), fixtures::minute(7));
        assert_eq!(a, b);
        assert_eq!(a.decided_at, fixtures::minute(7));
    }
}
