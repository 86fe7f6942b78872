//! The per-event consent gate deciding whether identity bridging may run.

use crate::tcf::parse_tcf_string;
use crate::usp::parse_us_privacy_string;
use log::debug;

/// Computes the bridging decision from the partner consent flag and the
/// optional framework signals. No error ever propagates from here: malformed
/// strings degrade to absent signals.
///
/// `bridging_allowed = cross_device_bridging
///     AND (TCF not valid OR TCF permits)
///     AND (US privacy permits)`
pub fn bridging_allowed(cross_device_bridging: bool, tcf_string: Option<&str>, us_privacy_string: Option<&str>) -> bool {
    if !cross_device_bridging {
        return false;
    }

    if let Some(tcf) = tcf_string {
        let consent = parse_tcf_string(tcf);
        // An unparsable TCF string means the check is not enforced
        if consent.valid && !consent.permits_bridging() {
            debug!("bridging denied by TCF signal");
            return false;
        }
    }

    if let Some(usp) = us_privacy_string {
        if let Some(parsed) = parse_us_privacy_string(usp) {
            if !parsed.permits_bridging() {
                debug!("bridging denied by US privacy signal");
                return false;
            }
        }
    }

    true
}
