use std::fmt::{Display, Formatter};

use tch::Tensor;

use crate::error::MetricError;
use crate::state::{StateCell, StateValue};

/// A stateful accumulator updated once per training step and read back with
/// [`Metric::compute`].
pub trait Metric {
    type Output: Into<Computed>;

    /// Restores the zeroed state the metric was constructed with.
    fn reset(&mut self);

    /// Folds one batch (or one scalar) of observations into the state. On error the
    /// state is left untouched.
    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()>;

    /// Reads the current value without mutating state. With no observations
    /// this is NaN rather than an error.
    fn compute(&self) -> Self::Output;

    /// The metric's state as flat named cells.
    fn state(&self) -> Vec<StateCell>;

    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()>;
}

/// A metric with its output erased to [`Computed`], used by [`crate::multi::MultiMetric`]
/// to hold metrics of different types.
pub type BoxedMetric = Box<dyn Metric<Output = Computed>>;

struct Erased<M>(M);

impl<M: Metric> Metric for Erased<M> {
    type Output = Computed;

    fn reset(&mut self) {
        self.0.reset()
    }

    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()> {
        self.0.update(updates)
    }

    fn compute(&self) -> Computed {
        self.0.compute().into()
    }

    fn state(&self) -> Vec<StateCell> {
        self.0.state()
    }

    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()> {
        self.0.set_state(name, value)
    }
}

pub fn boxed<M>(metric: M) -> BoxedMetric
where
    M: Metric + 'static,
{
    Box::new(Erased(metric))
}

/// A single named argument passed to `update`.
#[derive(Debug, Clone, Copy)]
pub enum Arg<'a> {
    Scalar(f64),
    Tensor(&'a Tensor),
}

impl From<f64> for Arg<'_> {
    fn from(value: f64) -> Self {
        Arg::Scalar(value)
    }
}

impl From<f32> for Arg<'_> {
    fn from(value: f32) -> Self {
        Arg::Scalar(value as f64)
    }
}

impl From<i32> for Arg<'_> {
    fn from(value: i32) -> Self {
        Arg::Scalar(value as f64)
    }
}

impl<'a> From<&'a Tensor> for Arg<'a> {
    fn from(value: &'a Tensor) -> Self {
        Arg::Tensor(value)
    }
}

/// The named arguments for one `update` call.
///
/// Every metric reads the names it needs and ignores the rest, so the same
/// `Updates` can be handed to several metrics at once.
#[derive(Debug, Default, Clone)]
pub struct Updates<'a> {
    args: Vec<(&'a str, Arg<'a>)>,
}

impl<'a> Updates<'a> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, name: &'a str, value: impl Into<Arg<'a>>) -> Self {
        self.insert(name, value);
        self
    }

    /// Sets `name`, replacing any earlier value under the same name.
    pub fn insert(&mut self, name: &'a str, value: impl Into<Arg<'a>>) {
        let value = value.into();
        match self.args.iter_mut().find(|(n, _)| *n == name) {
            Some(slot) => slot.1 = value,
            None => self.args.push((name, value)),
        }
    }

    pub fn get(&self, name: &str) -> Option<Arg<'a>> {
        self.args
            .iter()
            .find(|(n, _)| *n == name)
            .map(|(_, value)| *value)
    }

    pub fn require(&self, name: &str) -> crate::Result<Arg<'a>> {
        self.get(name)
            .ok_or_else(|| MetricError::MissingArgument(name.to_string()))
    }

    pub fn require_tensor(&self, name: &str) -> crate::Result<&'a Tensor> {
        match self.require(name)? {
            Arg::Tensor(t) => Ok(t),
            Arg::Scalar(_) => Err(MetricError::ShapeOrType(format!(
                "expected '{}' to be a tensor, got a scalar",
                name
            ))),
        }
    }

    pub fn names(&self) -> impl Iterator<Item = &str> + '_ {
        self.args.iter().map(|(n, _)| *n)
    }

    pub fn len(&self) -> usize {
        self.args.len()
    }

    pub fn is_empty(&self) -> bool {
        self.args.is_empty()
    }
}

/// Mean and spread of a stream of observations, produced by
/// [`crate::welford::Welford`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct Statistics {
    mean: f32,
    standard_error_of_mean: f32,
    standard_deviation: f32,
}

impl Statistics {
    pub fn new(mean: f32, standard_error_of_mean: f32, standard_deviation: f32) -> Self {
        Self {
            mean,
            standard_error_of_mean,
            standard_deviation,
        }
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn standard_error_of_mean(&self) -> f32 {
        self.standard_error_of_mean
    }

    pub fn standard_deviation(&self) -> f32 {
        self.standard_deviation
    }
}

/// Any value a metric can compute.
#[derive(Debug, Clone, PartialEq)]
pub enum Computed {
    Scalar(f32),
    Statistics(Statistics),
    Metrics(Computations),
}

impl Computed {
    pub fn as_scalar(&self) -> Option<f32> {
        match self {
            Computed::Scalar(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_statistics(&self) -> Option<&Statistics> {
        match self {
            Computed::Statistics(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_metrics(&self) -> Option<&Computations> {
        match self {
            Computed::Metrics(m) => Some(m),
            _ => None,
        }
    }
}

impl From<f32> for Computed {
    fn from(value: f32) -> Self {
        Computed::Scalar(value)
    }
}

impl From<Statistics> for Computed {
    fn from(value: Statistics) -> Self {
        Computed::Statistics(value)
    }
}

impl From<Computations> for Computed {
    fn from(value: Computations) -> Self {
        Computed::Metrics(value)
    }
}

impl Display for Computed {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            Computed::Scalar(v) => write!(f, "{:.4}", v),
            Computed::Statistics(s) => write!(
                f,
                "{:.4} ± {:.4} (sd {:.4})",
                s.mean, s.standard_error_of_mean, s.standard_deviation
            ),
            Computed::Metrics(m) => {
                for (i, (name, value)) in m.iter().enumerate() {
                    if i > 0 {
                        write!(f, ", ")?;
                    }
                    write!(f, "{}: {}", name, value)?;
                }
                Ok(())
            }
        }
    }
}

/// Compute results keyed by metric name, in the order the metrics were added.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Computations {
    entries: Vec<(String, Computed)>,
}

impl Computations {
    pub(crate) fn push(&mut self, name: &str, value: Computed) {
        self.entries.push((name.to_string(), value));
    }

    pub fn get(&self, name: &str) -> Option<&Computed> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, value)| value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Computed)> {
        self.entries.iter().map(|(n, v)| (n.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn later_insert_replaces_earlier_value() {
        let updates = Updates::new().with("values", 1.0).with("values", 2.0);
        assert_eq!(updates.len(), 1);
        match updates.get("values") {
            Some(Arg::Scalar(v)) => assert_eq!(v, 2.0),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn require_reports_the_missing_name() {
        let updates = Updates::new().with("loss", 0.5f32);
        match updates.require("values") {
            Err(MetricError::MissingArgument(name)) => assert_eq!(name, "values"),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn require_tensor_rejects_scalars() {
        let updates = Updates::new().with("logits", 3);
        assert!(updates.require_tensor("logits").unwrap_err().is_shape_or_type());
    }

    #[test]
    fn computations_keep_insertion_order() {
        let mut c = Computations::default();
        c.push("b", Computed::Scalar(1.0));
        c.push("a", Computed::Scalar(2.0));
        let names: Vec<_> = c.iter().map(|(n, _)| n).collect();
        assert_eq!(names, vec!["b", "a"]);
        assert_eq!(c.get("a").and_then(Computed::as_scalar), Some(2.0));
        assert!(c.get("c").is_none());
        assert_eq!(format!("{}", Computed::Metrics(c)), "b: 1.0000, a: 2.0000");
    }
}
