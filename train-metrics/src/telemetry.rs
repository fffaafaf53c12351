use std::sync::OnceLock;

use opentelemetry::{
    metrics::{Counter, Gauge},
    InstrumentationScope, KeyValue,
};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::metrics::Temporality;

use crate::metric::Computed;

fn scope() -> &'static InstrumentationScope {
    static SCOPE: OnceLock<InstrumentationScope> = OnceLock::new();

    SCOPE.get_or_init(|| {
        InstrumentationScope::builder("training")
            .with_version("1.0")
            .build()
    })
}

pub fn init_meter_provider(
) -> Result<opentelemetry_sdk::metrics::SdkMeterProvider, Box<dyn std::error::Error>> {
    let exporter = opentelemetry_otlp::MetricExporter::builder()
        .with_http()
        .with_temporality(Temporality::Cumulative)
        .with_protocol(opentelemetry_otlp::Protocol::HttpBinary)
        .build()?;

    let provider = opentelemetry_sdk::metrics::SdkMeterProvider::builder()
        .with_periodic_exporter(exporter)
        .build();

    opentelemetry::global::set_meter_provider(provider.clone());
    Ok(provider)
}

pub fn record_epoch(epoch: usize) {
    static METRIC: OnceLock<Gauge<u64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .u64_gauge("epoch")
            .with_description("the current training epoch")
            .build()
    });

    metric.record(epoch as u64, &[]);
}

pub fn record_training_start_time() {
    static METRIC: OnceLock<Gauge<f64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .f64_gauge("train_start_time")
            .with_description("training start time")
            .build()
    });

    metric.record(chrono::Utc::now().timestamp() as f64, &[]);
}

pub fn record_training_status(is_training: bool) {
    static METRIC: OnceLock<Gauge<f64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .f64_gauge("is_training")
            .with_description("Is the model currently training")
            .build()
    });

    metric.record(if is_training { 1.0 } else { 0.0 }, &[]);
}

pub fn record_learning_rate(lr: f64) {
    static METRIC: OnceLock<Gauge<f64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .f64_gauge("learning_rate")
            .with_description("the learning rate used during training.")
            .build()
    });

    metric.record(lr, &[]);
}

pub fn increment_training_batches() {
    static METRIC: OnceLock<Counter<u64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .u64_counter("training_batches_total")
            .with_description("a counter for minibatches folded into the training metrics.")
            .build()
    });

    metric.add(1, &[]);
}

/// Publishes a compute result on the `training_metric` gauge, one point per
/// scalar. Statistics add a `statistic` attribute and nested mappings join
/// their names with dots.
pub fn record_computed(prefix: &str, computed: &Computed) {
    static METRIC: OnceLock<Gauge<f64>> = OnceLock::new();

    let metric = METRIC.get_or_init(|| {
        let meter = opentelemetry::global::meter_with_scope(scope().clone());

        meter
            .f64_gauge("training_metric")
            .with_description("the latest computed value of a training metric")
            .build()
    });

    for (name, statistic, value) in flatten(prefix, computed) {
        let mut attributes = vec![KeyValue::new("metric", name)];
        if let Some(statistic) = statistic {
            attributes.push(KeyValue::new("statistic", statistic));
        }

        metric.record(value as f64, &attributes);
    }
}

fn flatten(prefix: &str, computed: &Computed) -> Vec<(String, Option<&'static str>, f32)> {
    match computed {
        Computed::Scalar(v) => vec![(prefix.to_string(), None, *v)],
        Computed::Statistics(s) => vec![
            (prefix.to_string(), Some("mean"), s.mean()),
            (
                prefix.to_string(),
                Some("standard_error_of_mean"),
                s.standard_error_of_mean(),
            ),
            (
                prefix.to_string(),
                Some("standard_deviation"),
                s.standard_deviation(),
            ),
        ],
        Computed::Metrics(metrics) => metrics
            .iter()
            .flat_map(|(name, value)| {
                let name = if prefix.is_empty() {
                    name.to_string()
                } else {
                    format!("{}.{}", prefix, name)
                };
                flatten(&name, value)
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::{Computations, Statistics};

    #[test]
    fn flatten_joins_nested_names() {
        let mut inner = Computations::default();
        inner.push("loss", Computed::Scalar(0.5));
        inner.push("spread", Computed::Statistics(Statistics::new(1.0, 0.25, 2.0)));

        let mut outer = Computations::default();
        outer.push("accuracy", Computed::Scalar(0.75));
        outer.push("train", Computed::Metrics(inner));

        let points = flatten("", &Computed::Metrics(outer));
        assert_eq!(
            points,
            vec![
                ("accuracy".to_string(), None, 0.75),
                ("train.loss".to_string(), None, 0.5),
                ("train.spread".to_string(), Some("mean"), 1.0),
                (
                    "train.spread".to_string(),
                    Some("standard_error_of_mean"),
                    0.25
                ),
                ("train.spread".to_string(), Some("standard_deviation"), 2.0),
            ]
        );
    }
}
