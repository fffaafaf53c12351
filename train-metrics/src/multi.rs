use crate::{
    error::MetricError,
    metric::{boxed, BoxedMetric, Computations, Computed, Metric, Updates},
    state::{StateCell, StateValue},
};

/// A fixed, ordered set of named metrics updated together.
///
/// ```ignore
/// let mut metrics = MultiMetric::new()
///     .with("accuracy", Accuracy::new())?
///     .with("loss", Average::new())?;
///
/// metrics.update(
///     &Updates::new()
///         .with("logits", &logits)
///         .with("labels", &labels)
///         .with("values", &batch_loss),
/// )?;
/// println!("{}", Computed::from(metrics.compute()));
/// ```
///
/// Every metric receives the full set of updates and reads only the names it
/// knows. Names no metric reads are not reported. Calls stop at the first
/// failing metric; metrics before it keep what they already applied.
#[derive(Default)]
pub struct MultiMetric {
    metrics: Vec<(String, BoxedMetric)>,
}

impl MultiMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with<M>(mut self, name: &str, metric: M) -> crate::Result<Self>
    where
        M: Metric + 'static,
    {
        self.push(name, metric)?;
        Ok(self)
    }

    pub fn push<M>(&mut self, name: &str, metric: M) -> crate::Result<()>
    where
        M: Metric + 'static,
    {
        if name.is_empty() || name.contains('.') {
            return Err(MetricError::InvalidMetricName(name.to_string()));
        }

        if self.metrics.iter().any(|(n, _)| n == name) {
            return Err(MetricError::DuplicateMetricName(name.to_string()));
        }

        self.metrics.push((name.to_string(), boxed(metric)));
        Ok(())
    }

    pub fn get(&self, name: &str) -> Option<&dyn Metric<Output = Computed>> {
        self.metrics
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, m)| m.as_ref())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.metrics.iter().map(|(n, _)| n.as_str())
    }

    pub fn len(&self) -> usize {
        self.metrics.len()
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }
}

impl Metric for MultiMetric {
    type Output = Computations;

    fn reset(&mut self) {
        for (_, metric) in self.metrics.iter_mut() {
            metric.reset();
        }
    }

    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()> {
        for (_, metric) in self.metrics.iter_mut() {
            metric.update(updates)?;
        }

        Ok(())
    }

    fn compute(&self) -> Computations {
        let mut output = Computations::default();
        for (name, metric) in self.metrics.iter() {
            output.push(name, metric.compute());
        }

        output
    }

    fn state(&self) -> Vec<StateCell> {
        self.metrics
            .iter()
            .flat_map(|(name, metric)| {
                metric
                    .state()
                    .into_iter()
                    .map(move |cell| cell.scoped(name))
            })
            .collect()
    }

    /// `name` is `<metric>.<cell>`; nested composites split on the first dot only.
    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()> {
        let unknown = || MetricError::UnknownStateCell(name.to_string());
        let (metric_name, cell) = name.split_once('.').ok_or_else(unknown)?;

        let (_, metric) = self
            .metrics
            .iter_mut()
            .find(|(n, _)| n == metric_name)
            .ok_or_else(unknown)?;

        metric.set_state(cell, value).map_err(|e| match e {
            MetricError::UnknownStateCell(_) => unknown(),
            e => e,
        })
    }
}
