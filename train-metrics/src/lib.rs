pub mod accuracy;
pub mod average;
pub mod dataset;
pub mod error;
pub mod hypers;
pub mod metric;
pub mod model;
pub mod multi;
pub mod state;
pub mod telemetry;
pub mod welford;

pub use accuracy::Accuracy;
pub use average::Average;
pub use error::MetricError;
pub use metric::{Arg, Computations, Computed, Metric, Statistics, Updates};
pub use multi::MultiMetric;
pub use state::{StateCell, StateValue};
pub use welford::Welford;

pub type Result<T> = std::result::Result<T, error::MetricError>;
