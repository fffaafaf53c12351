use tch::{Kind, Tensor};

use crate::{
    error::MetricError,
    metric::{Arg, Metric, Updates},
    state::{expect_count, expect_float, StateCell, StateValue},
};

pub const DEFAULT_ARGNAME: &str = "values";

/// Running arithmetic mean of a named quantity.
#[derive(Debug, Clone)]
pub struct Average {
    argname: String,
    total: f32,
    count: u32,
}

impl Default for Average {
    fn default() -> Self {
        Self::new()
    }
}

impl Average {
    pub fn new() -> Self {
        Self::with_argname(DEFAULT_ARGNAME)
    }

    /// An average that reads its observations from `argname` instead of `"values"`.
    pub fn with_argname(argname: &str) -> Self {
        Self {
            argname: argname.to_string(),
            total: 0.0,
            count: 0,
        }
    }

    pub fn argname(&self) -> &str {
        &self.argname
    }

    pub fn total(&self) -> f32 {
        self.total
    }

    pub fn count(&self) -> u32 {
        self.count
    }

    pub(crate) fn accumulate(&mut self, values: Arg<'_>) -> crate::Result<()> {
        let (sum, count) = match values {
            Arg::Scalar(v) => (v, 1),
            Arg::Tensor(xs) => (batch_sum(xs)?, batch_len(xs)?),
        };

        let count = checked_count(self.count, count)?;
        self.total += sum as f32;
        self.count = count;
        Ok(())
    }
}

impl Metric for Average {
    type Output = f32;

    fn reset(&mut self) {
        self.total = 0.0;
        self.count = 0;
    }

    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()> {
        let values = updates.require(&self.argname)?;
        self.accumulate(values)
    }

    fn compute(&self) -> f32 {
        self.total / self.count as f32
    }

    fn state(&self) -> Vec<StateCell> {
        vec![
            StateCell::float("total", self.total),
            StateCell::count("count", self.count),
        ]
    }

    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()> {
        match name {
            "total" => self.total = expect_float(name, value)?,
            "count" => self.count = expect_count(name, value)?,
            _ => return Err(MetricError::UnknownStateCell(name.to_string())),
        }
        Ok(())
    }
}

/// Sum of every element, with booleans counted as 0/1.
pub(crate) fn batch_sum(xs: &Tensor) -> crate::Result<f64> {
    Ok(xs.f_sum(Kind::Double)?.f_double_value(&[])?)
}

pub(crate) fn checked_count(count: u32, added: u32) -> crate::Result<u32> {
    count
        .checked_add(added)
        .ok_or(MetricError::CountOverflow { count, added })
}

pub(crate) fn batch_len(xs: &Tensor) -> crate::Result<u32> {
    let n = xs.numel();
    u32::try_from(n)
        .map_err(|_| MetricError::ShapeOrType(format!("batch of {} elements is too large", n)))
}
