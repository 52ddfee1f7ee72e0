//! Deterministic enumeration of candidate passwords.
//!
//! Lengths are visited from `min_len` to `max_len`. Within one length the
//! candidates form the Cartesian product of the alphabet in odometer order:
//! the rightmost position varies fastest, so `"ab"` over lengths 1..=2
//! yields `a, b, aa, ab, ba, bb`.

use tracing::warn;

use crate::charset::Alphabet;

/// Lazy iterator over every candidate of a length range.
#[derive(Debug, Clone)]
pub struct Candidates {
    chars: Vec<char>,
    max_len: usize,
    /// Alphabet indices of the next candidate to yield.
    digits: Vec<usize>,
    done: bool,
}

impl Candidates {
    /// Starts at the first candidate of length `min_len`.
    pub fn new(alphabet: &Alphabet, min_len: usize, max_len: usize) -> Self {
        Self {
            chars: alphabet.chars().to_vec(),
            max_len,
            digits: vec![0; min_len],
            done: alphabet.is_empty() || min_len > max_len,
        }
    }

    /// Starts strictly after `resume_from`.
    ///
    /// A resume point outside the search space (wrong length or a character
    /// missing from the alphabet) yields an empty sequence.
    pub fn after(alphabet: &Alphabet, min_len: usize, max_len: usize, resume_from: &str) -> Self {
        let mut candidates = Self::new(alphabet, min_len, max_len);
        match digits_of(alphabet, min_len, max_len, resume_from) {
            Some(digits) => {
                candidates.digits = digits;
                candidates.advance();
            }
            None => {
                warn!(
                    "Resume point '{}' is not part of the configured search space; nothing to enumerate",
                    resume_from
                );
                candidates.done = true;
            }
        }
        candidates
    }

    /// Moves `digits` to the next candidate, rolling over into the next length.
    fn advance(&mut self) {
        let base = self.chars.len();
        let mut pos = self.digits.len();
        loop {
            if pos == 0 {
                let len = self.digits.len();
                if len >= self.max_len {
                    self.done = true;
                } else {
                    self.digits = vec![0; len + 1];
                }
                return;
            }
            pos -= 1;
            self.digits[pos] += 1;
            if self.digits[pos] < base {
                return;
            }
            self.digits[pos] = 0;
        }
    }
}

impl Iterator for Candidates {
    type Item = String;

    fn next(&mut self) -> Option<String> {
        if self.done {
            return None;
        }
        let candidate: String = self.digits.iter().map(|&i| self.chars[i]).collect();
        self.advance();
        Some(candidate)
    }
}

fn digits_of(alphabet: &Alphabet, min_len: usize, max_len: usize, candidate: &str) -> Option<Vec<usize>> {
    let digits: Vec<usize> = candidate
        .chars()
        .map(|c| alphabet.index_of(c))
        .collect::<Option<_>>()?;
    if digits.len() < min_len || digits.len() > max_len {
        return None;
    }
    Some(digits)
}

/// Zero-based position of `candidate` in the full enumeration, or `None`
/// when it is not part of the search space. Saturates at `u128::MAX`.
pub fn rank(alphabet: &Alphabet, min_len: usize, max_len: usize, candidate: &str) -> Option<u128> {
    let digits = digits_of(alphabet, min_len, max_len, candidate)?;
    let base = alphabet.len() as u128;

    let shorter = (min_len..digits.len()).fold(0u128, |acc, len| {
        acc.saturating_add(base.saturating_pow(len as u32))
    });
    let within = digits.iter().fold(0u128, |acc, &d| {
        acc.saturating_mul(base).saturating_add(d as u128)
    });

    Some(shorter.saturating_add(within))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    fn ab() -> Alphabet {
        Alphabet::from("ab")
    }

    #[test]
    fn short_alphabet_order_is_pinned() {
        let all: Vec<String> = Candidates::new(&ab(), 1, 2).collect();
        assert_eq!(all, ["a", "b", "aa", "ab", "ba", "bb"]);
    }

    #[test]
    fn exhaustive_count_and_uniqueness() {
        let alphabet = Alphabet::from("xyz");
        let all: Vec<String> = Candidates::new(&alphabet, 2, 4).collect();
        assert_eq!(all.len(), 9 + 27 + 81);

        let unique: HashSet<&String> = all.iter().collect();
        assert_eq!(unique.len(), all.len());
    }

    #[test]
    fn digits_rightmost_fastest() {
        let alphabet = Alphabet::default();
        let mut candidates = Candidates::new(&alphabet, 4, 4);
        assert_eq!(candidates.next().as_deref(), Some("0000"));
        assert_eq!(candidates.next().as_deref(), Some("0001"));
        assert_eq!(candidates.nth(7).as_deref(), Some("0009"));
        assert_eq!(candidates.next().as_deref(), Some("0010"));
    }

    #[test]
    fn resume_yields_exact_suffix() {
        let alphabet = Alphabet::from("abc");
        let full: Vec<String> = Candidates::new(&alphabet, 1, 3).collect();

        for (i, point) in full.iter().enumerate() {
            let resumed: Vec<String> = Candidates::after(&alphabet, 1, 3, point).collect();
            assert_eq!(resumed, full[i + 1..], "resuming after {}", point);
        }
    }

    #[test]
    fn resume_crosses_length_boundary() {
        let resumed: Vec<String> = Candidates::after(&ab(), 1, 2, "b").collect();
        assert_eq!(resumed, ["aa", "ab", "ba", "bb"]);
    }

    #[test]
    fn resume_after_last_candidate_is_empty() {
        assert_eq!(Candidates::after(&ab(), 1, 2, "bb").count(), 0);
    }

    #[test]
    fn resume_outside_space_is_empty() {
        assert_eq!(Candidates::after(&ab(), 1, 2, "abc").count(), 0);
        assert_eq!(Candidates::after(&ab(), 1, 2, "az").count(), 0);
        assert_eq!(Candidates::after(&ab(), 2, 2, "a").count(), 0);
    }

    #[test]
    fn rank_matches_enumeration_position() {
        let alphabet = Alphabet::from("abc");
        for (i, candidate) in Candidates::new(&alphabet, 2, 3).enumerate() {
            assert_eq!(rank(&alphabet, 2, 3, &candidate), Some(i as u128));
        }
        assert_eq!(rank(&alphabet, 2, 3, "a"), None);
    }

    #[test]
    fn rank_of_pinned_digit_candidate() {
        let alphabet = Alphabet::default();
        assert_eq!(rank(&alphabet, 4, 4, "5678"), Some(5678));
        assert_eq!(rank(&alphabet, 1, 4, "5678"), Some(10 + 100 + 1000 + 5678));
    }
}
