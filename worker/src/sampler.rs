use std::ops::Range;

use rand::{Rng, SeedableRng, rngs::StdRng};

/// Picks contiguous minibatch windows at uniformly random offsets.
///
/// The generator is reseeded with the epoch index at every epoch boundary, so the
/// windows of a given epoch are the same on every run.
#[derive(Debug, Clone)]
pub struct WindowSampler {
    width: usize,
    rng: StdRng,
}

impl WindowSampler {
    /// Creates a new `WindowSampler`.
    ///
    /// # Arguments
    /// * `width` - The amount of examples per window.
    pub fn new(width: usize) -> Self {
        Self {
            width,
            rng: StdRng::seed_from_u64(0),
        }
    }

    /// Restarts the sequence of windows for `epoch`.
    pub fn reseed(&mut self, epoch: usize) {
        self.rng = StdRng::seed_from_u64(epoch as u64);
    }

    /// Draws the next window over a dataset of `size` examples.
    ///
    /// # Returns
    /// A range never reaching past `size`, shorter than the width only when the
    /// dataset itself is.
    pub fn next_window(&mut self, size: usize) -> Range<usize> {
        let start = self.rng.random_range(0..=size.saturating_sub(self.width));
        start..(start + self.width).min(size)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn windows_stay_inside_the_dataset() {
        let mut sampler = WindowSampler::new(8);

        for _ in 0..1000 {
            let window = sampler.next_window(20);
            assert_eq!(window.len(), 8);
            assert!(window.end <= 20);
        }
    }

    #[test]
    fn small_dataset_is_taken_whole() {
        let mut sampler = WindowSampler::new(8);
        assert_eq!(sampler.next_window(5), 0..5);
    }

    #[test]
    fn reseeding_replays_the_epoch() {
        let mut sampler = WindowSampler::new(4);

        sampler.reseed(3);
        let first: Vec<_> = (0..16).map(|_| sampler.next_window(100)).collect();

        sampler.reseed(4);
        let other: Vec<_> = (0..16).map(|_| sampler.next_window(100)).collect();

        sampler.reseed(3);
        let again: Vec<_> = (0..16).map(|_| sampler.next_window(100)).collect();

        assert_eq!(first, again);
        assert_ne!(first, other);
    }

    #[test]
    fn every_offset_is_reachable() {
        let mut sampler = WindowSampler::new(3);
        let mut seen = [false; 3];

        for _ in 0..500 {
            seen[sampler.next_window(5).start] = true;
        }

        assert!(seen.iter().all(|&s| s));
    }
}
