//! The identity-bridging engine: weighted time-decayed scoring over partial
//! keys, a deterministic short-circuit on shared hashed emails, graph merges
//! with monotone confidence, and household-reference publication into the
//! low-latency cache.

pub mod engine;
pub mod errors;
pub mod linker;
pub mod observer;
pub mod params;
pub mod scorer;
pub mod tokens;

pub use engine::{BridgeOutcome, BridgeStatus, BridgingEngine, BridgingOptions, BridgingSkipReason};
pub use errors::{BridgingError, BridgingResult};
pub use linker::{GraphLinker, LinkOutcome};
pub use observer::{BridgingObserver, BridgingUpdate, ChannelObserver, DynBridgingObserver};
pub use params::{resolve_bridging_params, BridgingParams};
pub use scorer::compute_confidence;
pub use tokens::{BridgingClaims, TokenSigner, TOKEN_EXPIRY_HOURS};
