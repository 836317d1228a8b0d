/// Polynomial learning-rate decay per epoch, `base / (1 + epoch)^decay`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DecaySchedule {
    base: f32,
    decay: f32,
}

impl DecaySchedule {
    /// Creates a new `DecaySchedule`.
    ///
    /// # Arguments
    /// * `base` - The learning rate of the first epoch.
    /// * `decay` - The decay exponent, `0` keeps the rate constant.
    pub fn new(base: f32, decay: f32) -> Self {
        Self { base, decay }
    }

    /// The learning rate to use during `epoch`.
    pub fn rate(&self, epoch: usize) -> f32 {
        let denom = (1. + epoch as f64).powf(f64::from(self.decay));
        (f64::from(self.base) / denom) as f32
    }
}
