//! The model message layout: `D` parameters followed by two sentinel flags.
//!
//! ```text
//! [ p_0, p_1, ..., p_{D-1}, epoch_done, training_done ]
//! ```
//!
//! Flags are encoded as exactly `0.0` or `1.0`.

use std::io;

/// Number of trailing flag slots appended to every model message.
pub const FLAG_SLOTS: usize = 2;

/// Control flags piggybacked on every model broadcast.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ControlFlags {
    /// The current epoch's final iteration has closed.
    pub epoch_done: bool,
    /// This is the last epoch of the run.
    pub training_done: bool,
}

impl ControlFlags {
    /// Computes the flags for a broadcast at the given position of the run.
    ///
    /// # Arguments
    /// * `last_iteration` - Whether the round that just closed is the epoch's last.
    /// * `last_epoch` - Whether the current epoch is the run's last.
    ///
    /// # Returns
    /// The flags, `training_done` is never set unless `epoch_done` is.
    pub fn at(last_iteration: bool, last_epoch: bool) -> Self {
        Self {
            epoch_done: last_iteration,
            training_done: last_iteration && last_epoch,
        }
    }
}

fn encode_flag(flag: bool) -> f32 {
    if flag { 1.0 } else { 0.0 }
}

fn decode_flag(value: f32, name: &str) -> io::Result<bool> {
    if value == 0.0 {
        Ok(false)
    } else if value == 1.0 {
        Ok(true)
    } else {
        Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("invalid value {value} for the {name} flag, expected 0 or 1"),
        ))
    }
}

/// A decoded view over a model message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ModelFrame<'a> {
    pub params: &'a [f32],
    pub flags: ControlFlags,
}

impl<'a> ModelFrame<'a> {
    /// Builds a fresh wire buffer holding `params` and `flags`.
    ///
    /// # Arguments
    /// * `params` - The model vector to broadcast.
    /// * `flags` - The control flags for this broadcast.
    ///
    /// # Returns
    /// A new `D + 2` long buffer.
    pub fn encode(params: &[f32], flags: ControlFlags) -> Vec<f32> {
        let mut frame = Vec::with_capacity(params.len() + FLAG_SLOTS);
        frame.extend_from_slice(params);
        frame.push(encode_flag(flags.epoch_done));
        frame.push(encode_flag(flags.training_done));
        frame
    }

    /// Splits a received model message into its parameters and flags.
    ///
    /// # Arguments
    /// * `raw` - The numeric body of a model message.
    /// * `num_params` - The model dimension `D` both ends agreed on.
    ///
    /// # Returns
    /// The decoded frame, or an `InvalidData` error when the length isn't `D + 2`
    /// or a flag slot holds something other than `0.0`/`1.0`.
    pub fn decode(raw: &'a [f32], num_params: usize) -> io::Result<Self> {
        if raw.len() != num_params + FLAG_SLOTS {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "model message length mismatch: got {}, expected {}",
                    raw.len(),
                    num_params + FLAG_SLOTS
                ),
            ));
        }

        let (params, flags) = raw.split_at(num_params);
        let flags = ControlFlags {
            epoch_done: decode_flag(flags[0], "epoch_done")?,
            training_done: decode_flag(flags[1], "training_done")?,
        };

        Ok(Self { params, flags })
    }
}
