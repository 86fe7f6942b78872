use sha2::{Digest, Sha256};

/// SHA-256 over the global salt and an identity preimage.
///
/// All derived identifiers (device, user, household) are produced by hashing
/// `salt "-" input`, so raw partial keys never leave the process.
#[derive(Clone)]
pub struct IdentityHash(Sha256);

impl IdentityHash {
    #[inline]
    pub fn with_salt(salt: &str) -> Self {
        let mut state = Sha256::new();
        state.update(salt.as_bytes());
        state.update(b"-");
        Self(state)
    }

    pub fn write<A: AsRef<[u8]>>(&mut self, data: A) -> &mut Self {
        self.0.update(data.as_ref());
        self
    }

    #[inline(always)]
    pub fn finalize(self) -> crate::Hash {
        let mut out = [0u8; crate::HASH_SIZE];
        out.copy_from_slice(Digest::finalize(self.0).as_slice());
        crate::Hash::from_bytes(out)
    }
}

/// One-shot salted hash of a single preimage
pub fn salted_identity_hash(salt: &str, value: &str) -> crate::Hash {
    let mut hasher = IdentityHash::with_salt(salt);
    hasher.write(value.as_bytes());
    hasher.finalize()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_salted_preimage() {
        // The digest must equal a plain SHA-256 over `salt "-" value`
        let hash = salted_identity_hash("SUPER_SECURE_SALT", "abc");
        let mut digest = Sha256::new();
        digest.update(b"SUPER_SECURE_SALT-abc");
        assert_eq!(hash.as_bytes()[..], Digest::finalize(digest)[..]);
    }

    #[test]
    fn test_incremental_matches_one_shot() {
        let mut hasher = IdentityHash::with_salt("salt");
        hasher.write("ab").write("c");
        assert_eq!(hasher.finalize(), salted_identity_hash("salt", "abc"));
    }

    #[test]
    fn test_salt_separates_domains() {
        assert_ne!(salted_identity_hash("salt-a", "value"), salted_identity_hash("salt-b", "value"));
        // The separator is part of the preimage, not a concatenation ambiguity
        assert_ne!(salted_identity_hash("salt", "ab"), salted_identity_hash("salt-a", "b"));
    }
}
