//! Session identifier generation.

use rand::RngCore;

/// Symbols a session identifier is drawn from, in index order.
pub const ALPHABET: &[u8; 62] = b"0123456789ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz";

/// Default identifier length.
pub const DEFAULT_SID_LENGTH: usize = 40;

/// Map one random byte onto the alphabet.
///
/// Uses `floor(byte * 62 / 256)`, so every byte value lands on a symbol
/// without rejection sampling.
pub fn symbol_for(byte: u8) -> char {
    let index = usize::from(byte) * ALPHABET.len() / 256;
    char::from(ALPHABET[index])
}

/// Produces fixed-length alphanumeric session identifiers.
///
/// The generator only produces candidates; uniqueness against the store is
/// checked by [`SessionManager::create_sid`](super::SessionManager::create_sid).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SidGenerator {
    length: usize,
}

impl SidGenerator {
    pub fn new(length: usize) -> Self {
        Self { length }
    }

    pub fn length(&self) -> usize {
        self.length
    }

    /// Generate a candidate from the thread-local CSPRNG.
    pub fn generate(&self) -> String {
        self.generate_with(&mut rand::rng())
    }

    /// Generate a candidate from the given random source.
    pub fn generate_with<R: RngCore + ?Sized>(&self, rng: &mut R) -> String {
        let mut bytes = vec![0u8; self.length];
        rng.fill_bytes(&mut bytes);
        bytes.into_iter().map(symbol_for).collect()
    }

    /// Whether `candidate` could have come from this generator.
    pub fn is_well_formed(&self, candidate: &str) -> bool {
        candidate.len() == self.length && candidate.bytes().all(|b| b.is_ascii_alphanumeric())
    }
}

impl Default for SidGenerator {
    fn default() -> Self {
        Self::new(DEFAULT_SID_LENGTH)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use std::collections::HashSet;

    #[test]
    fn test_symbol_mapping_bounds() {
        assert_eq!(symbol_for(0), '0');
        assert_eq!(symbol_for(4), '0');
        assert_eq!(symbol_for(5), '1');
        assert_eq!(symbol_for(255), 'z');
    }

    #[test]
    fn test_every_byte_maps_into_alphabet() {
        let symbols: HashSet<char> = (0..=255u8).map(symbol_for).collect();
        assert_eq!(symbols.len(), ALPHABET.len());
    }

    #[test]
    fn test_length_and_alphabet() {
        let generator = SidGenerator::default();
        let sid = generator.generate();
        assert_eq!(sid.len(), DEFAULT_SID_LENGTH);
        assert!(sid.chars().all(|c| c.is_ascii_alphanumeric()));
        assert!(generator.is_well_formed(&sid));
    }

    #[test]
    fn test_custom_length() {
        let generator = SidGenerator::new(12);
        assert_eq!(generator.generate().len(), 12);
    }

    #[test]
    fn test_deterministic_with_seeded_rng() {
        let generator = SidGenerator::new(24);
        let a = generator.generate_with(&mut StdRng::seed_from_u64(7));
        let b = generator.generate_with(&mut StdRng::seed_from_u64(7));
        let c = generator.generate_with(&mut StdRng::seed_from_u64(8));
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn test_uniqueness() {
        let generator = SidGenerator::default();
        let mut seen = HashSet::new();
        for _ in 0..10_000 {
            let sid = generator.generate();
            assert!(seen.insert(sid.clone()), "Duplicate sid generated: {}", sid);
        }
    }

    #[test]
    fn test_well_formed() {
        let generator = SidGenerator::new(8);
        assert!(generator.is_well_formed("abcDEF12"));
        assert!(!generator.is_well_formed("abcDEF1"));
        assert!(!generator.is_well_formed("abcDEF123"));
        assert!(!generator.is_well_formed("abc-EF12"));
        assert!(!generator.is_well_formed(""));
    }
}
