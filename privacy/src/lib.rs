pub mod dp;
pub mod gate;
pub mod tcf;
pub mod usp;

pub use dp::apply_differential_privacy;
pub use gate::bridging_allowed;
pub use tcf::{parse_tcf_string, TcfConsent, AGGREGATOR_VENDOR_ID};
pub use usp::{parse_us_privacy_string, UsPrivacy};
