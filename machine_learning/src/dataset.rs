use std::{
    fs::File,
    io::{BufRead, BufReader},
    ops::Range,
    path::Path,
};

use ndarray::{Array1, Array2, ArrayView1, ArrayView2, s};
use rand::Rng;
use rand_distr::StandardNormal;

use crate::{MlErr, Result};

/// A borrowed, contiguous window of a `Dataset`.
#[derive(Debug, Clone, Copy)]
pub struct Minibatch<'a> {
    pub features: ArrayView2<'a, f32>,
    pub labels: ArrayView1<'a, f32>,
}

impl Minibatch<'_> {
    #[inline]
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }
}

/// A dense, in memory dataset of binary labelled examples.
///
/// Features are stored one example per row. Labels are `-1` or `+1`.
#[derive(Debug, Clone)]
pub struct Dataset {
    features: Array2<f32>,
    labels: Array1<f32>,
}

impl Dataset {
    /// Creates a new `Dataset`.
    ///
    /// # Arguments
    /// * `features` - One row per example.
    /// * `labels` - One label per example.
    ///
    /// # Returns
    /// A new `Dataset` or an error if it's empty or the row counts disagree.
    pub fn new(features: Array2<f32>, labels: Array1<f32>) -> Result<Self> {
        if features.nrows() != labels.len() {
            return Err(MlErr::SizeMismatch {
                a: "features",
                b: "labels",
                got: features.nrows(),
                expected: labels.len(),
            });
        }

        if labels.is_empty() {
            return Err(MlErr::EmptyDataset);
        }

        Ok(Self { features, labels })
    }

    /// Reads a dataset from a text file, see `Dataset::parse` for the format.
    ///
    /// # Arguments
    /// * `path` - The path of the file to read.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path)?;
        Self::parse(BufReader::new(file))
    }

    /// Parses one example per line, `label f_1 ... f_D`, whitespace separated.
    ///
    /// Blank lines and lines starting with `#` are skipped. A `0` label is read as `-1`.
    ///
    /// # Arguments
    /// * `reader` - The source of the text.
    ///
    /// # Returns
    /// The parsed dataset, or a `MlErr::Parse` pointing at the first bad line.
    pub fn parse<R: BufRead>(reader: R) -> Result<Self> {
        let mut width = None;
        let mut data = Vec::new();
        let mut labels = Vec::new();

        for (i, line) in reader.lines().enumerate() {
            let line = line?;
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }

            let parse = |token: &str| {
                token.parse::<f32>().map_err(|e| MlErr::Parse {
                    line: i + 1,
                    detail: format!("`{token}`: {e}"),
                })
            };

            let mut tokens = line.split_whitespace();
            // SAFETY: The line is not empty after trimming, so there's a first token.
            let label = parse(tokens.next().unwrap())?;
            let before = data.len();
            for token in tokens {
                data.push(parse(token)?);
            }

            let row_width = data.len() - before;
            match width {
                None => width = Some(row_width),
                Some(w) if w != row_width => {
                    return Err(MlErr::Parse {
                        line: i + 1,
                        detail: format!("expected {w} features, found {row_width}"),
                    });
                }
                Some(_) => {}
            }

            labels.push(if label > 0. { 1. } else { -1. });
        }

        let rows = labels.len();
        let features = Array2::from_shape_vec((rows, width.unwrap_or_default()), data)
            .map_err(|e| MlErr::Parse {
                line: rows,
                detail: e.to_string(),
            })?;

        Self::new(features, Array1::from(labels))
    }

    /// Generates a linearly separable (up to `noise`) dataset around a hidden weight vector.
    ///
    /// # Arguments
    /// * `rng` - The source of randomness.
    /// * `len` - The amount of examples.
    /// * `truth` - The weights that define the labels.
    /// * `noise` - Standard deviation of the noise added to the margin before labelling.
    pub fn synthetic<R: Rng>(rng: &mut R, len: usize, truth: &[f32], noise: f32) -> Result<Self> {
        let features = Array2::from_shape_simple_fn((len, truth.len()), || {
            rng.sample::<f32, _>(StandardNormal)
        });

        let truth = ArrayView1::from(truth);
        let labels = features.dot(&truth).mapv(|margin| {
            let jitter: f32 = rng.sample(StandardNormal);
            if margin + noise * jitter > 0. { 1. } else { -1. }
        });

        Self::new(features, labels)
    }

    /// The amount of examples.
    #[inline]
    pub fn size(&self) -> usize {
        self.labels.len()
    }

    /// The amount of features per example.
    #[inline]
    pub fn num_features(&self) -> usize {
        self.features.ncols()
    }

    /// The feature rows `[lo, hi)`.
    pub fn slice_features(&self, lo: usize, hi: usize) -> ArrayView2<'_, f32> {
        self.features.slice(s![lo..hi, ..])
    }

    /// The labels `[lo, hi)`.
    pub fn slice_labels(&self, lo: usize, hi: usize) -> ArrayView1<'_, f32> {
        self.labels.slice(s![lo..hi])
    }

    /// A zero-copy view over the examples in `window`.
    pub fn minibatch(&self, window: Range<usize>) -> Minibatch<'_> {
        Minibatch {
            features: self.slice_features(window.start, window.end),
            labels: self.slice_labels(window.start, window.end),
        }
    }

    /// A view over every example.
    pub fn all(&self) -> Minibatch<'_> {
        self.minibatch(0..self.size())
    }
}
