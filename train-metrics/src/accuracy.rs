use tch::Kind;

use crate::{
    average::Average,
    error::MetricError,
    metric::{Arg, Metric, Updates},
    state::{StateCell, StateValue},
};

/// Fraction of examples whose highest-scoring class matches the label.
///
/// Reads `logits` (`[.., classes]`) and integer `labels` (`[..]`) and feeds
/// `argmax(logits) == labels` into an [`Average`].
#[derive(Debug, Clone, Default)]
pub struct Accuracy {
    average: Average,
}

impl Accuracy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> u32 {
        self.average.count()
    }
}

impl Metric for Accuracy {
    type Output = f32;

    fn reset(&mut self) {
        self.average.reset()
    }

    fn update(&mut self, updates: &Updates<'_>) -> crate::Result<()> {
        let logits = updates.require_tensor("logits")?;
        let labels = updates.require_tensor("labels")?;

        if !matches!(labels.kind(), Kind::Int | Kind::Int64) {
            return Err(MetricError::ShapeOrType(format!(
                "expected integer labels, got {:?}",
                labels.kind()
            )));
        }

        if logits.dim() != labels.dim() + 1 {
            return Err(MetricError::ShapeOrType(format!(
                "expected logits.dim()={} == labels.dim()+1={}",
                logits.dim(),
                labels.dim() + 1
            )));
        }

        let logits_size = logits.size();
        let labels_size = labels.size();
        if logits_size[..labels_size.len()] != labels_size[..] {
            return Err(MetricError::ShapeOrType(format!(
                "logits shape {:?} does not match labels shape {:?}",
                logits_size, labels_size
            )));
        }

        let correct = logits.f_argmax(-1, false)?.f_eq_tensor(labels)?;
        self.average.accumulate(Arg::Tensor(&correct))
    }

    fn compute(&self) -> f32 {
        self.average.compute()
    }

    fn state(&self) -> Vec<StateCell> {
        self.average.state()
    }

    fn set_state(&mut self, name: &str, value: StateValue) -> crate::Result<()> {
        self.average.set_state(name, value)
    }
}

#[cfg(test)]
mod tests {
    use tch::Tensor;

    use super::*;

    fn logits() -> Tensor {
        Tensor::from_slice(&[2.0f32, 1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0, 1.0]).view([5, 2])
    }

    #[test]
    fn counts_rows_where_argmax_matches_label() {
        let mut acc = Accuracy::new();
        assert!(acc.compute().is_nan());

        let logits = logits();
        let labels = Tensor::from_slice(&[1i32, 1, 0, 1, 0]);
        acc.update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap();

        assert_eq!(acc.count(), 5);
        assert!((acc.compute() - 0.6).abs() < 1e-6);
    }

    #[test]
    fn int64_labels_are_accepted() {
        let mut acc = Accuracy::new();
        let logits = logits();
        let labels = Tensor::from_slice(&[0i64, 1, 0, 1, 0]);
        acc.update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap();
        assert_eq!(acc.compute(), 1.0);
    }

    #[test]
    fn accumulates_across_batches() {
        let mut acc = Accuracy::new();
        let logits = logits();
        let first = Tensor::from_slice(&[1i32, 1, 0, 1, 0]);
        let second = Tensor::from_slice(&[0i32, 1, 0, 1, 0]);

        acc.update(&Updates::new().with("logits", &logits).with("labels", &first))
            .unwrap();
        acc.update(&Updates::new().with("logits", &logits).with("labels", &second))
            .unwrap();

        assert_eq!(acc.count(), 10);
        assert!((acc.compute() - 0.8).abs() < 1e-6);

        acc.reset();
        assert!(acc.compute().is_nan());
    }

    #[test]
    fn sequence_logits_use_the_last_axis() {
        let mut acc = Accuracy::new();
        // [batch=2, steps=2, classes=3]
        let logits = Tensor::from_slice(&[
            0.1f32, 0.7, 0.2, //
            0.9, 0.0, 0.1, //
            0.3, 0.3, 0.4, //
            0.0, 1.0, 0.0,
        ])
        .view([2, 2, 3]);
        let labels = Tensor::from_slice(&[1i32, 0, 2, 2]).view([2, 2]);

        acc.update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap();
        assert_eq!(acc.compute(), 0.75);
    }

    #[test]
    fn float_labels_are_rejected() {
        let mut acc = Accuracy::new();
        let logits = logits();
        let labels = Tensor::from_slice(&[1.0f32, 1.0, 0.0, 1.0, 0.0]);
        let err = acc
            .update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap_err();
        assert!(err.is_shape_or_type());
        assert_eq!(acc.count(), 0);
    }

    #[test]
    fn rank_mismatch_is_rejected() {
        let mut acc = Accuracy::new();
        let logits = Tensor::from_slice(&[2.0f32, 1.0, 1.0, 2.0, 2.0]);
        let labels = Tensor::from_slice(&[1i32, 1, 0, 1, 0]);
        let err = acc
            .update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap_err();
        assert!(err.is_shape_or_type());
    }

    #[test]
    fn batch_size_mismatch_is_rejected() {
        let mut acc = Accuracy::new();
        let logits = logits();
        let labels = Tensor::from_slice(&[1i32, 1, 0]);
        let err = acc
            .update(&Updates::new().with("logits", &logits).with("labels", &labels))
            .unwrap_err();
        assert!(err.is_shape_or_type());
    }

    #[test]
    fn missing_labels_is_an_argument_error() {
        let mut acc = Accuracy::new();
        let logits = logits();
        let err = acc
            .update(&Updates::new().with("logits", &logits))
            .unwrap_err();
        assert!(err.is_missing_argument());
        assert_eq!(acc.count(), 0);
    }
}
