use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::Value;

use super::kind::NodeKind;
use super::predicate::{Chain, Operator};

/// Aggregate functions
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Hash)]
pub enum AggregateFunction {
    #[default]
    Sum,
    Avg,
    Count,
    Min,
    Max,
}

impl AggregateFunction {
    pub const ALL: [AggregateFunction; 5] = [
        AggregateFunction::Sum,
        AggregateFunction::Avg,
        AggregateFunction::Count,
        AggregateFunction::Min,
        AggregateFunction::Max,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            AggregateFunction::Sum => "SUM",
            AggregateFunction::Avg => "AVG",
            AggregateFunction::Count => "COUNT",
            AggregateFunction::Min => "MIN",
            AggregateFunction::Max => "MAX",
        }
    }

    /// Everything but COUNT only applies to numeric fields
    pub fn requires_numeric(&self) -> bool {
        !matches!(self, AggregateFunction::Count)
    }
}

impl FromStr for AggregateFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "SUM" => Ok(AggregateFunction::Sum),
            "AVG" => Ok(AggregateFunction::Avg),
            "COUNT" => Ok(AggregateFunction::Count),
            "MIN" => Ok(AggregateFunction::Min),
            "MAX" => Ok(AggregateFunction::Max),
            other => Err(format!("unknown aggregate function '{}'", other)),
        }
    }
}

impl fmt::Display for AggregateFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for AggregateFunction {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for AggregateFunction {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// `["Orders.amount", "gt", "100", "AND"]`
pub type WhereTuple = (String, Operator, String, Option<Chain>);

/// `["L.a", "eq", "R.b"]` / `["X.a", "gt", "3"]`
pub type PredicateTuple = (String, Operator, String);

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct StreamClause {
    pub stream: String,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct SelectClause {
    pub stream: String,
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(default, rename = "where")]
    pub conditions: Vec<WhereTuple>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct ProjectClause {
    #[serde(default)]
    pub fields: Vec<String>,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct JoinClause {
    #[serde(default)]
    pub fields: Vec<String>,
    #[serde(rename = "where")]
    pub condition: PredicateTuple,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct GroupByClause {
    #[serde(default)]
    pub fields: Vec<String>,
    pub having: PredicateTuple,
}

#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
pub struct AggregateClause {
    #[serde(default)]
    pub function: AggregateFunction,
    #[serde(default)]
    pub fields: Vec<String>,
}

/// Declarative output of a finished query node
#[derive(Clone, Debug, Eq, PartialEq)]
pub enum Clause {
    Stream(StreamClause),
    Select(SelectClause),
    Project(ProjectClause),
    Join(JoinClause),
    GroupBy(GroupByClause),
    Aggregate(AggregateClause),
}

impl Clause {
    pub fn kind(&self) -> NodeKind {
        match self {
            Clause::Stream(_) => NodeKind::Stream,
            Clause::Select(_) => NodeKind::Select,
            Clause::Project(_) => NodeKind::Project,
            Clause::Join(_) => NodeKind::Join,
            Clause::GroupBy(_) => NodeKind::GroupBy,
            Clause::Aggregate(_) => NodeKind::Aggregate,
        }
    }

    /// Canonical JSON form stored as the node's `data`
    pub fn to_value(&self) -> serde_json::Result<Value> {
        match self {
            Clause::Stream(c) => serde_json::to_value(c),
            Clause::Select(c) => serde_json::to_value(c),
            Clause::Project(c) => serde_json::to_value(c),
            Clause::Join(c) => serde_json::to_value(c),
            Clause::GroupBy(c) => serde_json::to_value(c),
            Clause::Aggregate(c) => serde_json::to_value(c),
        }
    }

    /// Interpret a node's persisted `data` for the given kind.
    /// Returns `Ok(None)` for kinds that carry no query clause.
    pub fn from_value(kind: NodeKind, value: Value) -> serde_json::Result<Option<Self>> {
        let clause = match kind {
            NodeKind::Stream => Clause::Stream(serde_json::from_value(value)?),
            NodeKind::Select => Clause::Select(serde_json::from_value(value)?),
            NodeKind::Project => Clause::Project(serde_json::from_value(value)?),
            NodeKind::Join => Clause::Join(serde_json::from_value(value)?),
            NodeKind::GroupBy => Clause::GroupBy(serde_json::from_value(value)?),
            NodeKind::Aggregate => Clause::Aggregate(serde_json::from_value(value)?),
            NodeKind::Enum => return Ok(None),
        };
        Ok(Some(clause))
    }

    /// Names of the fields the clause refers to as its field list
    pub fn field_names(&self) -> &[String] {
        match self {
            Clause::Stream(_) => &[],
            Clause::Select(c) => &c.fields,
            Clause::Project(c) => &c.fields,
            Clause::Join(c) => &c.fields,
            Clause::GroupBy(c) => &c.fields,
            Clause::Aggregate(c) => &c.fields,
        }
    }
}
