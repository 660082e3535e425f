//! Per-call user-agent randomization
//!
//! Some backends throttle by user agent, so every request sends the seed with
//! a few random hex characters sprinkled in.

use rand::Rng;

const HEX_CHARS: &[u8; 16] = b"0123456789abcdef";
const INSERT_PROBABILITY: f64 = 0.2;

/// Randomize a user-agent seed
///
/// The seed's characters are kept in order; random lowercase hex characters
/// are inserted after some of them.
#[must_use]
pub fn randomize(seed: &str) -> String {
    let mut rng = rand::rng();
    let mut randomized = String::with_capacity(seed.len() + seed.len() / 4 + 1);
    for ch in seed.chars() {
        randomized.push(ch);
        if rng.random_bool(INSERT_PROBABILITY) {
            randomized.push(char::from(HEX_CHARS[rng.random_range(0..HEX_CHARS.len())]));
        }
    }
    randomized
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_subsequence(needle: &str, haystack: &str) -> bool {
        let mut rest = haystack.chars();
        needle.chars().all(|c| rest.any(|h| h == c))
    }

    #[test]
    fn test_keeps_seed_characters_in_order() {
        let seed = "hafas-client/6.0 (+https://example.org)";
        for _ in 0..20 {
            let ua = randomize(seed);
            assert!(ua.len() >= seed.len());
            assert!(is_subsequence(seed, &ua));
            assert!(ua.starts_with('h'));
        }
    }

    #[test]
    fn test_inserted_characters_are_hex() {
        let seed = "_".repeat(200);
        let ua = randomize(&seed);
        assert!(ua.chars().filter(|c| *c != '_').all(|c| c.is_ascii_hexdigit()));
        assert!(ua.len() > seed.len());
    }

    #[test]
    fn test_empty_seed() {
        assert_eq!(randomize(""), "");
    }
}
