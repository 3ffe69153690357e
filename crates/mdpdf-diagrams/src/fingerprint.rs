//! Content fingerprints used as render cache keys.

use std::fmt;

use sha2::{Digest, Sha256};

use crate::{DiagramFormat, DiagramKind};

/// Hex-encoded SHA-256 digest identifying one rendered diagram.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Fingerprint(String);

impl Fingerprint {
    /// The digest as a hex string.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Fingerprint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Everything that affects a rendered diagram.
///
/// Any change to these fields yields a different [`Fingerprint`], so a
/// new renderer command or version never reuses stale artifacts.
#[derive(Debug, Clone, Copy)]
pub struct FingerprintKey<'a> {
    /// Diagram dialect.
    pub kind: DiagramKind,
    /// Renderer identity: command line plus configured version.
    pub renderer: &'a str,
    /// Output format.
    pub format: DiagramFormat,
    /// Diagram source text.
    pub source: &'a str,
}

impl FingerprintKey<'_> {
    /// Compute the fingerprint.
    ///
    /// SHA-256 over the fields in order, each followed by a NUL byte so that
    /// field boundaries cannot be shifted to produce a collision.
    #[must_use]
    pub fn compute(&self) -> Fingerprint {
        let mut hasher = Sha256::new();
        for part in [
            self.kind.as_str(),
            self.renderer,
            self.format.as_str(),
            self.source,
        ] {
            hasher.update(part.as_bytes());
            hasher.update([0u8]);
        }
        Fingerprint(hex::encode(hasher.finalize()))
    }
}
