use crate::error::MetricError;

/// The value held by a single named state cell.
#[derive(Debug, Copy, Clone, PartialEq)]
pub enum StateValue {
    Float(f32),
    Count(u32),
}

/// A named, independently settable piece of accumulator state.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCell {
    pub name: String,
    pub value: StateValue,
}

impl StateCell {
    pub fn float(name: &str, value: f32) -> Self {
        Self {
            name: name.to_string(),
            value: StateValue::Float(value),
        }
    }

    pub fn count(name: &str, value: u32) -> Self {
        Self {
            name: name.to_string(),
            value: StateValue::Count(value),
        }
    }

    /// Prefixes the cell name with the owning metric's name, e.g. `loss.total`.
    pub fn scoped(mut self, scope: &str) -> Self {
        self.name = format!("{}.{}", scope, self.name);
        self
    }
}

pub(crate) fn expect_float(cell: &str, value: StateValue) -> crate::Result<f32> {
    match value {
        StateValue::Float(v) => Ok(v),
        StateValue::Count(_) => Err(MetricError::InvalidStateValue {
            cell: cell.to_string(),
            value,
        }),
    }
}

pub(crate) fn expect_count(cell: &str, value: StateValue) -> crate::Result<u32> {
    match value {
        StateValue::Count(c) => Ok(c),
        StateValue::Float(_) => Err(MetricError::InvalidStateValue {
            cell: cell.to_string(),
            value,
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scoped_cells_are_dotted() {
        let cell = StateCell::count("count", 3).scoped("loss");
        assert_eq!(cell.name, "loss.count");
        assert_eq!(cell.value, StateValue::Count(3));
    }

    #[test]
    fn mismatched_kinds_are_rejected() {
        assert!(expect_float("total", StateValue::Count(1)).is_err());
        assert!(expect_count("count", StateValue::Float(1.0)).is_err());
        assert_eq!(expect_count("count", StateValue::Count(7)).unwrap(), 7);
        assert_eq!(expect_float("total", StateValue::Float(0.5)).unwrap(), 0.5);
    }
}
