//! Composite operational KPIs
//!
//! Pure functions over aggregated features: OEE, process stability and
//! financial impact. Nothing here touches the store or holds state; the
//! scoring cycle feeds in features and the previous stability index.

mod financial;
mod oee;
mod stability;

pub use financial::{daily_loss, throughput_loss, FinancialConfig};
pub use oee::{compute_oee, OeeConfig, OeeInputs};
pub use stability::{compute_stability, StabilityConfig};
