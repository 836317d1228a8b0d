use std::num::NonZeroUsize;

use serde::{Deserialize, Serialize};

use super::SpecErr;

/// The regularization penalty applied by the coordinator after every round.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Penalty {
    L1 { lambda: f32 },
    TraceNorm { lambda: f32 },
}

impl Penalty {
    /// The configured strength, to be scaled by the current learning rate.
    pub fn lambda(&self) -> f32 {
        match *self {
            Penalty::L1 { lambda } | Penalty::TraceNorm { lambda } => lambda,
        }
    }
}

fn default_print_interval() -> NonZeroUsize {
    NonZeroUsize::MIN
}

fn default_print_loss() -> bool {
    true
}

/// The training options of a run, every option the protocol recognizes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainingSpec {
    /// Number of epochs of the run.
    pub epochs: NonZeroUsize,
    /// Rounds per epoch, the last one being a full barrier.
    pub iterations: NonZeroUsize,
    /// Number of workers taking part, fixed for the whole run.
    pub workers: NonZeroUsize,
    /// Width of the contiguous minibatch window each worker samples.
    pub mini_batch: NonZeroUsize,
    /// Base learning rate.
    pub learning_rate: f32,
    /// Decay exponent, `lr(e) = learning_rate / (1 + e)^learning_rate_decay`.
    #[serde(default)]
    pub learning_rate_decay: f32,
    /// Minimum contributions needed to close a non final round.
    pub group_size: NonZeroUsize,
    /// How many rounds a worker may lag before the coordinator waits for it.
    pub max_delay: NonZeroUsize,
    #[serde(default)]
    pub l1_lambda: Option<f32>,
    #[serde(default)]
    pub trace_lambda: Option<f32>,
    #[serde(default = "default_print_interval")]
    pub print_interval: NonZeroUsize,
    #[serde(default = "default_print_loss")]
    pub print_loss: bool,
}

impl TrainingSpec {
    /// Checks the constraints serde can't express on its own.
    ///
    /// # Returns
    /// A `SpecErr` naming the first offending field.
    pub fn validate(&self) -> Result<(), SpecErr> {
        let non_negative = |field: &str, value: f32| {
            if value.is_finite() && value >= 0. {
                Ok(())
            } else {
                Err(SpecErr::invalid(
                    field,
                    format!("must be a finite non negative number, got {value}"),
                ))
            }
        };

        non_negative("learning_rate", self.learning_rate)?;
        non_negative("learning_rate_decay", self.learning_rate_decay)?;

        if let Some(lambda) = self.l1_lambda {
            non_negative("l1_lambda", lambda)?;
        }

        if let Some(lambda) = self.trace_lambda {
            non_negative("trace_lambda", lambda)?;
        }

        if self.l1_lambda.is_some() && self.trace_lambda.is_some() {
            return Err(SpecErr::invalid(
                "trace_lambda",
                "l1_lambda and trace_lambda are mutually exclusive",
            ));
        }

        Ok(())
    }

    /// The group size actually enforced, a round can't gather more workers than there are.
    pub fn effective_group_size(&self) -> usize {
        self.group_size.min(self.workers).get()
    }

    /// The penalty to apply after each round, if any.
    ///
    /// A zero lambda counts as no penalty at all.
    pub fn penalty(&self) -> Option<Penalty> {
        match (self.l1_lambda, self.trace_lambda) {
            (Some(lambda), _) if lambda > 0. => Some(Penalty::L1 { lambda }),
            (_, Some(lambda)) if lambda > 0. => Some(Penalty::TraceNorm { lambda }),
            _ => None,
        }
    }

    /// Whether the epoch summary of `epoch` should be reported.
    pub fn should_print(&self, epoch: usize) -> bool {
        self.print_loss && epoch % self.print_interval.get() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec() -> TrainingSpec {
        serde_json::from_str(
            r#"{
                "epochs": 3,
                "iterations": 10,
                "workers": 4,
                "mini_batch": 8,
                "learning_rate": 0.5,
                "group_size": 2,
                "max_delay": 3
            }"#,
        )
        .unwrap()
    }

    #[test]
    fn defaults_are_filled_in() {
        let spec = spec();
        assert_eq!(spec.learning_rate_decay, 0.);
        assert_eq!(spec.print_interval.get(), 1);
        assert!(spec.print_loss);
        assert!(spec.penalty().is_none());
        assert!(spec.validate().is_ok());
    }

    #[test]
    fn zero_max_delay_is_rejected_by_the_parser() {
        let res = serde_json::from_str::<TrainingSpec>(
            r#"{
                "epochs": 1, "iterations": 1, "workers": 1, "mini_batch": 1,
                "learning_rate": 0.1, "group_size": 1, "max_delay": 0
            }"#,
        );

        assert!(res.is_err());
    }

    #[test]
    fn lambdas_are_mutually_exclusive() {
        let mut spec = spec();
        spec.l1_lambda = Some(0.1);
        spec.trace_lambda = Some(0.2);

        let err = spec.validate().unwrap_err();
        assert_eq!(err.field(), "trace_lambda");
    }

    #[test]
    fn penalty_picks_the_configured_source() {
        let mut spec = spec();
        spec.trace_lambda = Some(0.25);
        assert_eq!(spec.penalty(), Some(Penalty::TraceNorm { lambda: 0.25 }));

        spec.trace_lambda = None;
        spec.l1_lambda = Some(0.5);
        assert_eq!(spec.penalty(), Some(Penalty::L1 { lambda: 0.5 }));
    }

    #[test]
    fn group_size_is_clamped_to_workers() {
        let mut spec = spec();
        spec.group_size = NonZeroUsize::new(9).unwrap();
        assert_eq!(spec.effective_group_size(), 4);
    }

    #[test]
    fn negative_learning_rate_is_rejected() {
        let mut spec = spec();
        spec.learning_rate = -1.;
        assert_eq!(spec.validate().unwrap_err().field(), "learning_rate");
    }

    #[test]
    fn print_interval_gates_reports() {
        let mut spec = spec();
        spec.print_interval = NonZeroUsize::new(2).unwrap();
        assert!(spec.should_print(0));
        assert!(!spec.should_print(1));
        assert!(spec.should_print(4));

        spec.print_loss = false;
        assert!(!spec.should_print(0));
    }
}
