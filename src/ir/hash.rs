//! Content addressing for lowered computations.
//!
//! A lowered producer gets a BLAKE3 identity over its canonical serialized
//! form (parameters, arena, entry, loop slots). The producer's name is left
//! out, so renaming a declaration does not change its hash, while any change
//! to the control-flow shape or an embedded expression does.

use super::Lowered;

// Version byte for hash stability
const HASH_VERSION: u8 = 1;

/// A 256-bit BLAKE3 content hash.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentHash(pub [u8; 32]);

impl ContentHash {
    /// Display as full hex.
    pub fn to_hex(&self) -> String {
        self.0.iter().map(|b| format!("{:02x}", b)).collect()
    }

    /// Display as short base-32 (8 characters, 40 bits).
    pub fn to_short(&self) -> String {
        const ALPHABET: &[u8] = b"0123456789abcdefghjkmnpqrstuvwxyz";
        let val = u64::from_be_bytes([
            0, 0, 0, self.0[0], self.0[1], self.0[2], self.0[3], self.0[4],
        ]);
        let mut result = String::with_capacity(8);
        for i in (0..8).rev() {
            let idx = ((val >> (i * 5)) & 0x1F) as usize;
            result.push(ALPHABET[idx] as char);
        }
        result
    }
}

impl std::fmt::Debug for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

impl std::fmt::Display for ContentHash {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.to_short())
    }
}

pub(crate) fn hash_lowered(lowered: &Lowered) -> ContentHash {
    let mut hasher = blake3::Hasher::new();
    hasher.update(&[HASH_VERSION]);
    let kind: u8 = match lowered.kind {
        super::LoweredKind::Producer => 0,
        super::LoweredKind::Script => 1,
    };
    hasher.update(&[kind]);
    hasher.update(&(lowered.params.len() as u32).to_le_bytes());
    for param in &lowered.params {
        hasher.update(&(param.len() as u32).to_le_bytes());
        hasher.update(param.as_bytes());
    }
    hasher.update(&lowered.entry.0.to_le_bytes());
    hasher.update(&lowered.loop_count.to_le_bytes());
    // Code nodes hold only strings, integers and ids; serialization is total.
    let body = serde_json::to_vec(&lowered.code).unwrap_or_default();
    hasher.update(&body);
    ContentHash(*hasher.finalize().as_bytes())
}
