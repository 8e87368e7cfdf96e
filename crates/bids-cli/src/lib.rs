//! CLI library components for bids-curate.

pub mod logging;
pub mod pipeline;
pub mod types;
