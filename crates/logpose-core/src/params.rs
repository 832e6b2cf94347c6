//! Parameters attached to a route: a single `(name, value)` pair or a whole bag.

use serde_json::{Map, Value};

use crate::error::LogposeError;

/// Ordered key-value bag stored per route.
pub type ParameterBag = Map<String, Value>;

#[derive(Debug, Clone, PartialEq)]
pub enum Parameters {
    Pair(String, Value),
    Bag(ParameterBag),
}

impl Parameters {
    pub fn pair(name: impl Into<String>, value: impl Into<Value>) -> Self {
        Parameters::Pair(name.into(), value.into())
    }

    /// Merge into `bag`; later values overwrite earlier ones with the same name.
    pub fn merge_into(self, bag: &mut ParameterBag) {
        match self {
            Parameters::Pair(name, value) => {
                bag.insert(name, value);
            }
            Parameters::Bag(other) => bag.extend(other),
        }
    }

    pub fn len(&self) -> usize {
        match self {
            Parameters::Pair(..) => 1,
            Parameters::Bag(bag) => bag.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<K: Into<String>, V: Into<Value>> From<(K, V)> for Parameters {
    fn from((name, value): (K, V)) -> Self {
        Parameters::pair(name, value)
    }
}

impl From<ParameterBag> for Parameters {
    fn from(bag: ParameterBag) -> Self {
        Parameters::Bag(bag)
    }
}

/// Accepts a JSON object or a `[name, value]` array; anything else is rejected.
impl TryFrom<Value> for Parameters {
    type Error = LogposeError;

    fn try_from(value: Value) -> Result<Self, Self::Error> {
        match value {
            Value::Object(bag) => Ok(Parameters::Bag(bag)),
            Value::Array(items) if items.len() == 2 => {
                let mut items = items.into_iter();
                match (items.next(), items.next()) {
                    (Some(Value::String(name)), Some(value)) => Ok(Parameters::Pair(name, value)),
                    (first, second) => {
                        let rejected: Vec<Value> = first.into_iter().chain(second).collect();
                        Err(LogposeError::InvalidParameterShape(Value::Array(rejected).to_string()))
                    }
                }
            }
            other => Err(LogposeError::InvalidParameterShape(other.to_string())),
        }
    }
}
