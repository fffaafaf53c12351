//! Streaming mean and variance with Welford's online algorithm.
//!
//! Batches are folded in with the pairwise form of the update: a batch of `n`
//! values with mean `m_b` and squared-deviation sum `s_b` combines with the
//! running `(count, mean, m2)` as
//!
//! ```text
//! count' = count + n
//! delta  = m_b - mean
//! mean'  = mean + delta * n / count'
//! m2'    = m2 + s_b + delta^2 * n * count / count'
//! ```
//!
//! which is the classic single-observation recurrence when `n == 1`.

use tch::{Kind, Tensor};

use crate::{
    average::{batch_len, checked_count, DEFAULT_ARGNAME},
    error::MetricError,
    metric::{Arg, Metric, Statistics, Updates},
    state::{expect_count, expect_float, StateCell, StateValue},
};

#[derive(Debug, Clone)]
pub struct Welford {
    argname: String,
    count: u32,
    mean: f32,
    m2: f32,
}

impl Default for Welford {
    fn default() -> Self {
        Self::new()
    }
}

impl Welford {
    pub fn new() -> Self {
        Self::with_argname(DEFAULT_ARGNAME)
    }

    pub fn with_argname(argname: &str) -> Self {
        Self {
            argname: argname.to_string(),
            count: 0,
            mean: 0.0,
            m2: 0.0,
        }
    }

    pub fn argname(&self) -> &str {
        &self.argname
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    /// Sum of squared deviations from the running mean.
    pub fn m2(&self) -> f32 {
        self.m2
    }

    fn combine(&mut self, n: u32, batch_mean: f64, batch_m2: f64) -> crate::Result<()> {
        if n == 0 {
            return Ok(());
        }

        let count_before = self.count as f64;
        let count_after = checked_count(self.count, n)?;
        let n = n as f64;

        let delta = batch_mean - self.mean as f64;
        let mean = self.mean as f64 + delta * n / count_after as f64;
        let m2 = self.m2 as f64 + batch_m2 + delta * delta * n * count_before / count_after as f64;

        self.count = count_after;
        self.mean = mean as f32;
        self.m2 = m2 as f32;
        Ok(())
    }
}

/// Element count, mean and population squared-deviation sum of a batch.
fn batch_moments(xs: &Tensor) -> crate::Result<(u32, f64, f64)> {
    let n = batch_len(xs)?;
    if n == 0 {
        return Ok((0, 0.0, 0.0));
    }

    let xs = xs.f_to_kind(Kind::Double)?;
    let mean = xs.f_mean(None)?.f_double_value(&[])?;
    let variance = xs.f_var(false)?.f_double_value(&[])?;
    Ok((n, mean, variance * n as f64))
}

impl Metric for Welford {
    type Output = Statistics;

    fn reset(&mut self) {
        self.count = 0;
        self.mean = 0.0;
        self.m2 = 0.0;
    }

    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()> {
        let (n, batch_mean, batch_m2) = match updates.require(&self.argname)? {
            Arg::Scalar(v) => (1, v, 0.0),
            Arg::Tensor(xs) => batch_moments(xs)?,
        };

        self.combine(n, batch_mean, batch_m2)
    }

    fn compute(&self) -> Statistics {
        let count = self.count as f32;
        let mean = if self.count == 0 { f32::NAN } else { self.mean };
        let variance = self.m2 / count;
        let standard_deviation = variance.sqrt();
        let standard_error_of_mean = standard_deviation / count.sqrt();

        Statistics::new(mean, standard_error_of_mean, standard_deviation)
    }

    fn state(&self) -> Vec<StateCell> {
        vec![
            StateCell::count("count", self.count),
            StateCell::float("mean", self.mean),
            StateCell::float("m2", self.m2),
        ]
    }

    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()> {
        match name {
            "count" => self.count = expect_count(name, value)?,
            "mean" => self.mean = expect_float(name, value)?,
            "m2" => {
                let m2 = expect_float(name, value)?;
                // NaN fails the comparison too.
                if !(m2 >= 0.0) {
                    return Err(MetricError::InvalidStateValue {
                        cell: name.to_string(),
                        value,
                    });
                }
                self.m2 = m2;
            }
            _ => return Err(MetricError::UnknownStateCell(name.to_string())),
        }
        Ok(())
    }
}
