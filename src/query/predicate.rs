//! Comparison predicates used by select, join and group-by nodes

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::errors::ValidationIssue;

/// Comparison operator
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum Operator {
    #[default]
    Eq,
    Neq,
    Lt,
    Gt,
    Lte,
    Gte,
}

impl Operator {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::Neq => "neq",
            Operator::Lt => "lt",
            Operator::Gt => "gt",
            Operator::Lte => "lte",
            Operator::Gte => "gte",
        }
    }

    /// Symbol shown in node summaries
    pub fn symbol(&self) -> &'static str {
        match self {
            Operator::Eq => "=",
            Operator::Neq => "<>",
            Operator::Lt => "<",
            Operator::Gt => ">",
            Operator::Lte => "<=",
            Operator::Gte => ">=",
        }
    }
}

impl FromStr for Operator {
    type Err = String;

    /// Accepts both the keyword and the symbol form
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "eq" | "=" => Ok(Operator::Eq),
            "neq" | "<>" | "!=" => Ok(Operator::Neq),
            "lt" | "<" => Ok(Operator::Lt),
            "gt" | ">" => Ok(Operator::Gt),
            "lte" | "<=" => Ok(Operator::Lte),
            "gte" | ">=" => Ok(Operator::Gte),
            other => Err(format!("unknown operator '{}'", other)),
        }
    }
}

impl Serialize for Operator {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Operator {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.symbol())
    }
}

/// Link from one where condition to the next
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum Chain {
    And,
    Or,
    Not,
}

impl Chain {
    pub fn as_str(&self) -> &'static str {
        match self {
            Chain::And => "AND",
            Chain::Or => "OR",
            Chain::Not => "NOT",
        }
    }
}

impl FromStr for Chain {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "AND" => Ok(Chain::And),
            "OR" => Ok(Chain::Or),
            "NOT" => Ok(Chain::Not),
            other => Err(format!("unknown chain '{}'", other)),
        }
    }
}

impl fmt::Display for Chain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for Chain {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Chain {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// One link of a select node's where chain. `attribute` is a field id of the
/// node's candidate fields.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct WhereCondition {
    pub attribute: String,
    pub operator: Operator,
    pub rhs: String,
    pub next: Option<Chain>,
}

impl WhereCondition {
    pub fn new(attribute: impl Into<String>, operator: Operator, rhs: impl Into<String>) -> Self {
        Self {
            attribute: attribute.into(),
            operator,
            rhs: rhs.into(),
            next: None,
        }
    }
}

/// Ordered where list with the chaining invariant maintained on edit
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct WhereChain {
    conditions: Vec<WhereCondition>,
}

impl WhereChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from persisted conditions without touching their links
    pub fn from_conditions(conditions: Vec<WhereCondition>) -> Self {
        Self { conditions }
    }

    pub fn conditions(&self) -> &[WhereCondition] {
        &self.conditions
    }

    pub fn len(&self) -> usize {
        self.conditions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.conditions.is_empty()
    }

    /// Append a condition, linking the previous tail with AND
    pub fn push(&mut self, mut condition: WhereCondition) -> usize {
        if let Some(tail) = self.conditions.last_mut() {
            tail.next = Some(Chain::And);
        }
        condition.next = None;
        self.conditions.push(condition);
        self.conditions.len() - 1
    }

    /// Remove a condition; removing the tail unlinks the new tail
    pub fn remove(&mut self, index: usize) -> Option<WhereCondition> {
        if index >= self.conditions.len() {
            return None;
        }
        let was_tail = index + 1 == self.conditions.len();
        let removed = self.conditions.remove(index);
        if was_tail {
            if let Some(tail) = self.conditions.last_mut() {
                tail.next = None;
            }
        }
        Some(removed)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut WhereCondition> {
        self.conditions.get_mut(index)
    }

    /// Change the link after condition `index`. The tail cannot be linked.
    pub fn set_next(&mut self, index: usize, chain: Chain) -> Result<(), ValidationIssue> {
        let last = self.conditions.len().saturating_sub(1);
        match self.conditions.get_mut(index) {
            Some(_) if index == last => Err(ValidationIssue::DanglingChain),
            Some(condition) => {
                condition.next = Some(chain);
                Ok(())
            }
            None => Err(ValidationIssue::BrokenChain),
        }
    }

    pub fn clear(&mut self) {
        self.conditions.clear();
    }
}

/// Join predicate; sides are field names of the left and right inputs
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct JoinCondition {
    pub left_attribute: String,
    pub operator: Operator,
    pub right_attribute: String,
}

/// Group-by HAVING predicate; `attribute` is a field name
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Having {
    pub attribute: String,
    pub operator: Operator,
    pub rhs: String,
}
