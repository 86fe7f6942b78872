//! The operations behind the public surfaces (`/v1/ingest`, `/v1/lookup`,
//! `/v1/capping/*`, `/v1/reporting/daily`) and their wire contracts. The
//! HTTP binding itself belongs to the hosting process; these methods carry
//! the semantics, including the error-propagation policy: the ingest hot
//! path surfaces only input and relational-insert failures, everything else
//! is logged and absorbed.

mod errors;
mod messages;
mod ops;
mod sampling;

pub use errors::{ApiError, ApiResult};
pub use messages::*;
pub use ops::{AggregatorApi, ApiOptions};
pub use sampling::{default_sampling_rates, should_sample_event, SamplingRates};
