//! Random alphanumeric strings for keys, members and values.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

const ALPHABET: &[u8; 52] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ";

/// Bumped by every call so that two threads seeding within the same clock tick still diverge.
static CALLS: AtomicU64 = AtomicU64::new(0);

/// A fresh generator seeded from the wall clock.
pub(crate) fn time_seeded_rng() -> SmallRng {
    let nanos = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(0);
    let call = CALLS.fetch_add(1, Ordering::Relaxed);
    // golden-ratio increment spreads consecutive call numbers over the seed space
    SmallRng::seed_from_u64(nanos ^ call.wrapping_mul(0x9E37_79B9_7F4A_7C15))
}

/// Returns a string of exactly `len` letters drawn uniformly from `a-zA-Z`.
pub fn random_string(len: usize) -> String {
    let mut rng = time_seeded_rng();
    (0..len)
        .map(|_| ALPHABET[rng.random_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn exact_length() {
        for len in [0, 1, 6, 64, 1000] {
            assert_eq!(random_string(len).len(), len);
        }
    }

    #[test]
    fn letters_only() {
        let s = random_string(10000);
        assert!(s.bytes().all(|b| b.is_ascii_alphabetic()));
    }

    #[test]
    fn uses_whole_alphabet() {
        let s = random_string(100000);
        let seen: HashSet<u8> = s.bytes().collect();
        assert_eq!(seen.len(), 52);
    }

    #[test]
    fn rapid_calls_do_not_repeat() {
        let all: HashSet<String> = (0..1000).map(|_| random_string(16)).collect();
        assert_eq!(all.len(), 1000);
    }

    #[test]
    fn concurrent_calls_do_not_repeat() {
        let handles: Vec<_> = (0..8)
            .map(|_| std::thread::spawn(|| (0..200).map(|_| random_string(16)).collect::<Vec<_>>()))
            .collect();
        let mut all = HashSet::new();
        for h in handles {
            for s in h.join().unwrap() {
                assert!(all.insert(s));
            }
        }
    }
}
