//! Static pricing model and the bid scoring function.

mod model;
mod scoring;

pub use model::{load_pricing_model, PricingError, PricingModel, DEFAULT_COEFFICIENT_KEY};
pub use scoring::{
    evaluate_bid, CVR_TARGET, GOOD_CONVERSION_FLOOR, MARKDOWN_FACTOR, MARKUP_FACTOR,
    RECENT_SAMPLE_SIZE,
};
