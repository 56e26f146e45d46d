use std::fmt::{self, Display};

use sha2::{Digest, Sha256};

///
/// SHA-256 digest of a sequence's exact bytes (case-sensitive, line breaks
/// excluded). Two records are duplicates iff their digests are equal.
///
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct SequenceHash([u8; 32]);

impl SequenceHash {
    pub fn of(sequence: &str) -> Self {
        SequenceHash::from_parts([sequence])
    }

    ///
    /// Digest the concatenation of `parts` without building it, e.g. the
    /// wrapped lines of a record.
    ///
    pub fn from_parts<I, S>(parts: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<[u8]>,
    {
        let mut hasher = Sha256::new();
        for part in parts {
            hasher.update(part.as_ref());
        }
        SequenceHash(hasher.finalize().into())
    }

    pub fn as_bytes(&self) -> &[u8; 32] {
        &self.0
    }
}

impl Display for SequenceHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for byte in &self.0 {
            write!(f, "{:02x}", byte)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use rstest::*;

    #[rstest]
    fn test_known_digest() {
        assert_eq!(
            SequenceHash::of("abc").to_string(),
            "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
        );
    }

    #[rstest]
    fn test_line_wrapping_does_not_change_digest() {
        assert_eq!(SequenceHash::from_parts(["MKV", "LLA"]), SequenceHash::of("MKVLLA"));
    }

    #[rstest]
    fn test_digest_is_case_sensitive() {
        assert_ne!(SequenceHash::of("acgt"), SequenceHash::of("ACGT"));
    }
}
