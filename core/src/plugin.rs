//! Product plugin contract.
//!
//! RULE: Every product family implements ProductPlugin.
//! The engine looks a plugin up by product type and calls rate_product();
//! nothing else in the engine may depend on which product is being rated.

use crate::{error::RatingResult, input::RateInput, output::RateOutput};

pub trait ProductPlugin: Send + Sync {
    /// Unique stable name for this plugin.
    fn name(&self) -> &'static str;

    /// Product-type keys this plugin answers for. Read once, at registration.
    fn product_types(&self) -> &'static [&'static str];

    /// Price one input.
    ///
    /// Business ineligibility is `Ok` with `eligible == false` and a reason.
    /// `Err` is reserved for conditions the plugin cannot recover from,
    /// such as a rate table row that should exist and does not.
    fn rate_product(&self, input: &RateInput) -> RatingResult<RateOutput>;
}
