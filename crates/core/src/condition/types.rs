use serde::Deserialize;
use serde_json::Value;

use crate::extension::CustomPredicate;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize)]
pub enum Operator {
    #[default]
    #[serde(alias = "and", alias = "AND")]
    And,
    #[serde(alias = "or", alias = "OR")]
    Or,
}

/// A named predicate plus its argument. `value` is `Null` when the kind takes
/// no argument.
#[derive(Clone, Debug, PartialEq)]
pub struct Leaf {
    pub kind: String,
    pub value: Value,
}

#[derive(Clone, Debug, Deserialize)]
#[serde(from = "RawCondition")]
pub enum Condition {
    Leaf(Leaf),
    Composite {
        operator: Operator,
        children: Vec<Condition>,
    },
    Custom(CustomPredicate),
}

impl Condition {
    pub fn leaf(kind: impl Into<String>, value: impl Into<Value>) -> Self {
        Self::Leaf(Leaf {
            kind: kind.into(),
            value: value.into(),
        })
    }

    /// A leaf whose kind takes no argument.
    pub fn kind(kind: impl Into<String>) -> Self {
        Self::leaf(kind, Value::Null)
    }

    pub fn always() -> Self {
        Self::kind("always")
    }

    pub fn never() -> Self {
        Self::kind("never")
    }

    pub fn all(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::Composite {
            operator: Operator::And,
            children: children.into_iter().collect(),
        }
    }

    pub fn any(children: impl IntoIterator<Item = Condition>) -> Self {
        Self::Composite {
            operator: Operator::Or,
            children: children.into_iter().collect(),
        }
    }

    pub fn custom(predicate: CustomPredicate) -> Self {
        Self::Custom(predicate)
    }
}

/// Accepted input shapes. A bare list is an `and` composite, and an object
/// with a child list is a composite even if it also names a kind.
#[derive(Deserialize)]
#[serde(untagged)]
enum RawCondition {
    List(Vec<Condition>),
    Composite {
        #[serde(default)]
        operator: Operator,
        #[serde(alias = "conditions")]
        children: Vec<Condition>,
    },
    Leaf {
        #[serde(alias = "type")]
        kind: String,
        #[serde(default)]
        value: Value,
    },
}

impl From<RawCondition> for Condition {
    fn from(raw: RawCondition) -> Self {
        match raw {
            RawCondition::List(children) => Condition::all(children),
            RawCondition::Composite { operator, children } => {
                Condition::Composite { operator, children }
            }
            RawCondition::Leaf { kind, value } => Condition::Leaf(Leaf { kind, value }),
        }
    }
}
