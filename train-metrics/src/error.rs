use std::{
    error::Error,
    fmt::{Display, Formatter},
};

use crate::state::StateValue;

#[derive(Debug)]
pub enum MetricError {
    /// A metric's required argument was not supplied to `update`.
    MissingArgument(String),
    /// The arguments were present but had the wrong rank, shape or kind.
    ShapeOrType(String),
    DuplicateMetricName(String),
    /// Metric names are joined with dots in state cell names, so they may not
    /// contain one.
    InvalidMetricName(String),
    /// Folding `added` observations into `count` would not fit the count cell.
    CountOverflow { count: u32, added: u32 },
    UnknownStateCell(String),
    InvalidStateValue { cell: String, value: StateValue },
    Tensor(tch::TchError),
}

impl Display for MetricError {
    fn fmt(&self, f: &mut Formatter) -> std::fmt::Result {
        match self {
            MetricError::MissingArgument(name) => {
                write!(f, "MissingArgument(expected argument '{}')", name)
            }
            MetricError::ShapeOrType(e) => write!(f, "ShapeOrType({})", e),
            MetricError::DuplicateMetricName(name) => write!(f, "DuplicateMetricName({})", name),
            MetricError::InvalidMetricName(name) => write!(f, "InvalidMetricName({})", name),
            MetricError::CountOverflow { count, added } => {
                write!(f, "CountOverflow({} + {})", count, added)
            }
            MetricError::UnknownStateCell(name) => write!(f, "UnknownStateCell({})", name),
            MetricError::InvalidStateValue { cell, value } => {
                write!(f, "InvalidStateValue({} = {:?})", cell, value)
            }
            MetricError::Tensor(e) => write!(f, "Tensor({})", e),
        }
    }
}

impl Error for MetricError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            MetricError::Tensor(e) => Some(e),
            _ => None,
        }
    }
}

impl From<tch::TchError> for MetricError {
    fn from(error: tch::TchError) -> Self {
        MetricError::Tensor(error)
    }
}

impl MetricError {
    pub fn is_missing_argument(&self) -> bool {
        matches!(self, MetricError::MissingArgument(_))
    }

    pub fn is_shape_or_type(&self) -> bool {
        matches!(self, MetricError::ShapeOrType(_))
    }
}
