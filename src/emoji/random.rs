//! Injectable randomness for emoji selection.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::error::MappingError;

/// Source of uniform indices.
///
/// Production uses [`SystemRandom`]; tests can substitute a fixed sequence
/// and assert exact output.
pub trait RandomSource: Send {
    /// Return an index in `0..len`. `len` is never zero.
    fn index(&mut self, len: usize) -> usize;
}

/// Entropy-seeded `StdRng`.
pub struct SystemRandom {
    rng: StdRng,
}

impl SystemRandom {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    /// Deterministic source, handy for reproducing a run.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }
}

impl Default for SystemRandom {
    fn default() -> Self {
        Self::new()
    }
}

impl RandomSource for SystemRandom {
    fn index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed list of indices, cycling when exhausted.
#[derive(Debug, Clone)]
pub struct FixedSequence {
    values: Vec<usize>,
    pos: usize,
}

impl FixedSequence {
    pub fn new(values: Vec<usize>) -> Self {
        Self { values, pos: 0 }
    }
}

impl RandomSource for FixedSequence {
    fn index(&mut self, _len: usize) -> usize {
        if self.values.is_empty() {
            return 0;
        }
        let value = self.values[self.pos % self.values.len()];
        self.pos += 1;
        value
    }
}

/// Draw one index, rejecting anything outside `0..len`.
pub(crate) fn pick(rng: &mut dyn RandomSource, len: usize) -> Result<usize, MappingError> {
    let index = rng.index(len);
    if index >= len {
        return Err(MappingError::RandomOutOfRange { index, len });
    }
    Ok(index)
}

/// Choose one element uniformly.
pub(crate) fn choose<'a, T>(
    rng: &mut dyn RandomSource,
    items: &'a [T],
) -> Result<Option<&'a T>, MappingError> {
    if items.is_empty() {
        return Ok(None);
    }
    let index = pick(rng, items.len())?;
    Ok(items.get(index))
}

/// Sample `amount` distinct elements uniformly without replacement.
///
/// Partial Fisher-Yates: position `i` is swapped with a uniform pick from
/// the untouched tail `i..len`.
pub(crate) fn sample<T: Clone>(
    rng: &mut dyn RandomSource,
    items: &[T],
    amount: usize,
) -> Result<Vec<T>, MappingError> {
    let amount = amount.min(items.len());
    let mut indices: Vec<usize> = (0..items.len()).collect();
    for i in 0..amount {
        let j = i + pick(rng, items.len() - i)?;
        indices.swap(i, j);
    }
    Ok(indices[..amount].iter().map(|&i| items[i].clone()).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn system_random_stays_in_range() {
        let mut rng = SystemRandom::seeded(7);
        for len in 1..50 {
            assert!(rng.index(len) < len);
        }
    }

    #[test]
    fn fixed_sequence_cycles() {
        let mut rng = FixedSequence::new(vec![2, 0]);
        assert_eq!(rng.index(5), 2);
        assert_eq!(rng.index(5), 0);
        assert_eq!(rng.index(5), 2);
    }

    #[test]
    fn pick_rejects_out_of_range() {
        let mut rng = FixedSequence::new(vec![9]);
        assert_eq!(
            pick(&mut rng, 3),
            Err(MappingError::RandomOutOfRange { index: 9, len: 3 })
        );
    }

    #[test]
    fn choose_empty_is_none() {
        let mut rng = FixedSequence::new(vec![0]);
        let items: [&str; 0] = [];
        assert_eq!(choose(&mut rng, &items), Ok(None));
    }

    #[test]
    fn sample_with_fixed_sequence() {
        // i=0 picks 0+2 -> "c", i=1 picks 1+0 -> swapped-in "b"
        let mut rng = FixedSequence::new(vec![2, 0]);
        let picked = sample(&mut rng, &["a", "b", "c", "d"], 2).unwrap();
        assert_eq!(picked, vec!["c", "b"]);
    }

    #[test]
    fn sample_is_distinct_and_bounded() {
        let mut rng = SystemRandom::seeded(42);
        let pool = ["1", "2", "3", "4", "5"];
        for _ in 0..100 {
            let picked = sample(&mut rng, &pool, 3).unwrap();
            assert_eq!(picked.len(), 3);
            let mut dedup = picked.clone();
            dedup.sort();
            dedup.dedup();
            assert_eq!(dedup.len(), 3);
        }
        assert_eq!(sample(&mut rng, &pool, 10).unwrap().len(), 5);
        assert!(sample(&mut rng, &pool, 0).unwrap().is_empty());
    }
}
