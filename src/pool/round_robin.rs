//! Round-robin selection strategy.

use std::sync::atomic::{AtomicU64, Ordering};

/// Round-robin selector.
/// Stores an internal counter to rotate through a snapshot of candidates.
#[derive(Debug, Default)]
pub struct RoundRobin {
    counter: AtomicU64,
}

impl RoundRobin {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pick the next candidate. Only the counter modulo the slice length matters,
    /// so candidates may change between calls.
    pub fn next<'a, T>(&self, candidates: &'a [T]) -> Option<&'a T> {
        match candidates.len() {
            0 => None,
            // nothing to rotate; leave the counter alone
            1 => candidates.first(),
            len => {
                let pos = self.counter.fetch_add(1, Ordering::Relaxed);
                candidates.get((pos % len as u64) as usize)
            }
        }
    }

    /// Number of rotations performed so far.
    pub fn position(&self) -> u64 {
        self.counter.load(Ordering::Relaxed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_round_robin() {
        let lb = RoundRobin::new();
        let backends = ["a", "b"];

        assert_eq!(lb.next(&backends), Some(&"a"));
        assert_eq!(lb.next(&backends), Some(&"b"));
        assert_eq!(lb.next(&backends), Some(&"a"));
    }

    #[test]
    fn test_even_distribution() {
        let lb = RoundRobin::new();
        let backends = ["a", "b", "c"];
        let mut hits: HashMap<&str, usize> = HashMap::new();
        for _ in 0..300 {
            *hits.entry(*lb.next(&backends).unwrap()).or_default() += 1;
        }
        assert_eq!(hits.len(), 3);
        assert!(hits.values().all(|&n| n == 100));
    }

    #[test]
    fn test_single_and_empty() {
        let lb = RoundRobin::new();
        let empty: [&str; 0] = [];
        assert_eq!(lb.next(&empty), None);
        assert_eq!(lb.next(&["only"]), Some(&"only"));
        assert_eq!(lb.position(), 0);
    }
}
