//! Cost models for the strategy search.

mod expected_cost;
mod on_time;
mod route_aware;
mod time_budget;

pub use expected_cost::ExpectedCost;
pub use on_time::OnTimeProbability;
pub use route_aware::RouteAware;
pub use time_budget::{Moments, TimeBudget};
