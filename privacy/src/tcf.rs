//! Aggregator-relevant subset of the IAB TCF v2 core string.
//!
//! Only the fields the consent gate inspects are decoded: the purposes
//! consent bits and the vendor consent section. Anything that fails to decode
//! degrades to `valid = false`, which the gate treats as an absent signal.

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use std::collections::HashSet;

/// Our id in the global vendor list
pub const AGGREGATOR_VENDOR_ID: u16 = 333;

/// Purposes required for identity bridging (storage/access + basic ads)
pub const REQUIRED_PURPOSES: [u8; 2] = [1, 2];

/// Vendor ids are gathered up to this bound; the aggregator id lies below it
const VENDOR_GATHER_LIMIT: u16 = 500;

const TCF_PURPOSE_COUNT: u8 = 24;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TcfConsent {
    pub valid: bool,
    pub gdpr_applies: bool,
    pub purposes_allowed: HashSet<u8>,
    pub vendors_allowed: HashSet<u16>,
    pub vendor_consented: bool,
}

impl TcfConsent {
    /// The aggregator vendor is consented and purposes {1, 2} are allowed
    pub fn permits_bridging(&self) -> bool {
        self.vendor_consented && REQUIRED_PURPOSES.iter().all(|p| self.purposes_allowed.contains(p))
    }
}

/// Decodes the core segment of a TCF v2 string. Never fails: malformed or
/// non-v2 input yields `valid = false`.
pub fn parse_tcf_string(tcf: &str) -> TcfConsent {
    let mut consent = TcfConsent::default();
    if tcf.len() < 10 {
        return consent;
    }
    let core = tcf.split('.').next().unwrap_or_default();
    let Ok(bytes) = URL_SAFE_NO_PAD.decode(core) else {
        return consent;
    };
    if let Some((purposes, vendors)) = decode_core(&mut BitReader::new(&bytes)) {
        consent.valid = true;
        consent.gdpr_applies = true;
        consent.vendor_consented = vendors.contains(&AGGREGATOR_VENDOR_ID);
        consent.purposes_allowed = purposes;
        consent.vendors_allowed = vendors;
    }
    consent
}

// Core-segment layout preceding the purposes consent bits:
// version(6) created(36) lastUpdated(36) cmpId(12) cmpVersion(12)
// consentScreen(6) consentLanguage(12) vendorListVersion(12)
// tcfPolicyVersion(6) isServiceSpecific(1) useNonStandardStacks(1)
// specialFeatureOptIns(12)
const PRE_PURPOSES_BITS: usize = 36 + 36 + 12 + 12 + 6 + 12 + 12 + 6 + 1 + 1 + 12;
// Between the purposes consent bits and the vendor consent section:
// purposesLITransparency(24) purposeOneTreatment(1) publisherCC(12)
const PRE_VENDORS_BITS: usize = 24 + 1 + 12;

fn decode_core(r: &mut BitReader<'_>) -> Option<(HashSet<u8>, HashSet<u16>)> {
    let version = r.read(6)?;
    if version != 2 {
        return None;
    }
    r.skip(PRE_PURPOSES_BITS)?;

    let mut purposes = HashSet::new();
    for purpose in 1..=TCF_PURPOSE_COUNT {
        if r.read_bool()? {
            purposes.insert(purpose);
        }
    }
    r.skip(PRE_VENDORS_BITS)?;

    let max_vendor_id = r.read(16)? as u16;
    let mut vendors = HashSet::new();
    if r.read_bool()? {
        // range encoding
        let entries = r.read(12)?;
        for _ in 0..entries {
            let is_range = r.read_bool()?;
            let start = r.read(16)? as u16;
            let end = if is_range { r.read(16)? as u16 } else { start };
            if start == 0 || end < start {
                return None;
            }
            for vendor in start..=end.min(VENDOR_GATHER_LIMIT) {
                vendors.insert(vendor);
            }
        }
    } else {
        // bitfield encoding; ids past the gather bound are irrelevant to the gate
        for vendor in 1..=max_vendor_id.min(VENDOR_GATHER_LIMIT) {
            if r.read_bool()? {
                vendors.insert(vendor);
            }
        }
    }
    Some((purposes, vendors))
}

struct BitReader<'a> {
    bytes: &'a [u8],
    pos: usize,
}

impl<'a> BitReader<'a> {
    fn new(bytes: &'a [u8]) -> Self {
        Self { bytes, pos: 0 }
    }

    fn read(&mut self, bits: usize) -> Option<u64> {
        let mut out = 0u64;
        for _ in 0..bits {
            let byte = self.bytes.get(self.pos / 8)?;
            let bit = (byte >> (7 - (self.pos % 8))) & 1;
            out = (out << 1) | bit as u64;
            self.pos += 1;
        }
        Some(out)
    }

    fn read_bool(&mut self) -> Option<bool> {
        Some(self.read(1)? == 1)
    }

    fn skip(&mut self, bits: usize) -> Option<()> {
        if self.pos + bits <= self.bytes.len() * 8 {
            self.pos += bits;
            Some(())
        } else {
            None
        }
    }
}
