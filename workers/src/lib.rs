//! The recurring jobs around the bridging core: the fuzzy queue drain, the
//! daily-aggregate flush and the graph prune. Each one is an [`AsyncService`]
//! ticking on the shared [`TickService`], and none of them ever terminates
//! over a per-item failure.
//!
//! [`AsyncService`]: householdiq_core::task::service::AsyncService
//! [`TickService`]: householdiq_core::task::tick::TickService

pub mod daily_agg;
pub mod fuzzy;
pub mod prune;

pub use daily_agg::{DailyAggFlushService, DAILY_FLUSH_INTERVAL};
pub use fuzzy::{FuzzyBridgeService, FUZZY_DRAIN_INTERVAL};
pub use prune::GraphPruneService;
