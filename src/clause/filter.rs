use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value as JsonValue};
use tracing::debug;

use crate::dimension::Dimension;
use crate::error::{QueryError, QueryResult};
use crate::metadata::MetadataProvider;
use super::{FieldRef, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FilterOp {
    Eq,
    Ne,
    Lt,
    Gt,
    Le,
    Ge,
    Between,
    IsNull,
    NotNull,
    IsEmpty,
    NotEmpty,
    Contains,
    DoesNotContain,
    StartsWith,
    EndsWith,
}

/// How many argument values an operator takes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Arity {
    Exactly(usize),
    AtLeast(usize),
}

impl Arity {
    pub fn accepts(&self, n: usize) -> bool {
        match *self {
            Arity::Exactly(k) => n == k,
            Arity::AtLeast(k) => n >= k,
        }
    }
}

impl FilterOp {
    pub fn as_str(&self) -> &'static str {
        match self {
            FilterOp::Eq => "=",
            FilterOp::Ne => "!=",
            FilterOp::Lt => "<",
            FilterOp::Gt => ">",
            FilterOp::Le => "<=",
            FilterOp::Ge => ">=",
            FilterOp::Between => "between",
            FilterOp::IsNull => "is-null",
            FilterOp::NotNull => "not-null",
            FilterOp::IsEmpty => "is-empty",
            FilterOp::NotEmpty => "not-empty",
            FilterOp::Contains => "contains",
            FilterOp::DoesNotContain => "does-not-contain",
            FilterOp::StartsWith => "starts-with",
            FilterOp::EndsWith => "ends-with",
        }
    }

    pub fn arity(&self) -> Arity {
        match self {
            // multi-select categorical filters
            FilterOp::Eq | FilterOp::Ne => Arity::AtLeast(1),
            FilterOp::Lt | FilterOp::Gt | FilterOp::Le | FilterOp::Ge => Arity::Exactly(1),
            FilterOp::Between => Arity::Exactly(2),
            FilterOp::IsNull | FilterOp::NotNull | FilterOp::IsEmpty | FilterOp::NotEmpty => Arity::Exactly(0),
            FilterOp::Contains | FilterOp::DoesNotContain | FilterOp::StartsWith | FilterOp::EndsWith => Arity::Exactly(1),
        }
    }

    /// String operators may end with an options object, e.g. `{"case-sensitive": false}`.
    pub fn takes_options(&self) -> bool {
        matches!(self, FilterOp::Contains | FilterOp::DoesNotContain | FilterOp::StartsWith | FilterOp::EndsWith)
    }
}

impl FromStr for FilterOp {
    type Err = QueryError;

    fn from_str(s: &str) -> QueryResult<Self> {
        Ok(match s {
            "=" => FilterOp::Eq,
            "!=" => FilterOp::Ne,
            "<" => FilterOp::Lt,
            ">" => FilterOp::Gt,
            "<=" => FilterOp::Le,
            ">=" => FilterOp::Ge,
            "between" => FilterOp::Between,
            "is-null" => FilterOp::IsNull,
            "not-null" => FilterOp::NotNull,
            "is-empty" => FilterOp::IsEmpty,
            "not-empty" => FilterOp::NotEmpty,
            "contains" => FilterOp::Contains,
            "does-not-contain" => FilterOp::DoesNotContain,
            "starts-with" => FilterOp::StartsWith,
            "ends-with" => FilterOp::EndsWith,
            other => return Err(QueryError::malformed(format!("unknown filter operator '{}'", other))),
        })
    }
}

/// A single predicate `[op, field-ref, arg...]`.
///
/// Values are immutable: every edit goes through a `with_*` method and yields a new clause.
/// Construction always checks the operator's arity, so a `Filter` in hand is well-shaped;
/// it may still hold `Unset` arguments, see [`Filter::is_complete`].
#[derive(Debug, Clone, PartialEq)]
pub struct Filter {
    op: FilterOp,
    field: FieldRef,
    args: Vec<Value>,
    options: Option<Map<String, JsonValue>>,
}

impl Filter {
    pub fn new(op: FilterOp, field: FieldRef, args: Vec<Value>) -> QueryResult<Filter> {
        check_arity(op, args.len())?;
        Ok(Filter { op, field, args, options: None })
    }

    /// `["=", field, value]`
    pub fn equals(field: FieldRef, value: impl Into<Value>) -> Filter {
        Filter { op: FilterOp::Eq, field, args: vec![value.into()], options: None }
    }

    /// Decode from wire shape and bind to metadata. Unknown fields are a malformed clause here:
    /// a clause that cannot be bound is never handed out.
    pub fn construct<M: MetadataProvider + ?Sized>(raw: &JsonValue, metadata: &M) -> QueryResult<Filter> {
        let filter = Filter::from_json(raw)?;
        if metadata.field(filter.field.field_id()).is_none() {
            return Err(QueryError::malformed(format!("field {} cannot be resolved", filter.field.field_id())));
        }
        Ok(filter)
    }

    pub fn operator(&self) -> FilterOp { self.op }

    pub fn field_ref(&self) -> &FieldRef { &self.field }

    pub fn arguments(&self) -> &[Value] { &self.args }

    pub fn options(&self) -> Option<&Map<String, JsonValue>> { self.options.as_ref() }

    /// Arguments that carry a value; unset slots are skipped.
    pub fn values(&self) -> impl Iterator<Item = &Value> { self.args.iter().filter(|v| !v.is_unset()) }

    pub fn with_arguments(&self, args: Vec<Value>) -> QueryResult<Filter> {
        check_arity(self.op, args.len())?;
        Ok(Filter { op: self.op, field: self.field.clone(), args, options: self.options.clone() })
    }

    pub fn with_operator(&self, op: FilterOp) -> QueryResult<Filter> {
        check_arity(op, self.args.len())?;
        let options = if op.takes_options() { self.options.clone() } else { None };
        Ok(Filter { op, field: self.field.clone(), args: self.args.clone(), options })
    }

    pub fn with_options(&self, options: Map<String, JsonValue>) -> QueryResult<Filter> {
        if !self.op.takes_options() {
            return Err(QueryError::malformed(format!("operator '{}' takes no options", self.op.as_str())));
        }
        Ok(Filter { options: Some(options), ..self.clone() })
    }

    /// Argument count fits the operator.
    pub fn is_valid(&self) -> bool { self.op.arity().accepts(self.args.len()) }

    /// Safe to execute: arity holds and no argument slot is left unset.
    pub fn is_complete(&self) -> bool {
        self.is_valid() && !self.args.iter().any(Value::is_unset)
    }

    pub fn dimension<'m, M: MetadataProvider + ?Sized>(&self, metadata: &'m M) -> QueryResult<Dimension<'m>> {
        Dimension::resolve(&self.field, metadata)
    }

    pub fn from_json(raw: &JsonValue) -> QueryResult<Filter> {
        let Some(parts) = raw.as_array() else {
            return Err(QueryError::malformed(format!("filter must be an array, got {}", raw)));
        };
        if parts.len() < 2 {
            return Err(QueryError::malformed("filter needs an operator and a field reference"));
        }
        let Some(op_str) = parts[0].as_str() else {
            return Err(QueryError::malformed(format!("filter operator must be a string, got {}", parts[0])));
        };
        let op = FilterOp::from_str(op_str)?;
        let field = FieldRef::from_json(&parts[1])?;
        let mut rest = &parts[2..];
        let mut options = None;
        if op.takes_options() {
            if let Some((JsonValue::Object(m), head)) = rest.split_last() {
                options = Some(m.clone());
                rest = head;
            }
        }
        let args = rest
            .iter()
            .map(|v| Value::from_json(v).map_err(QueryError::MalformedClause))
            .collect::<QueryResult<Vec<_>>>()?;
        check_arity(op, args.len())?;
        debug!(target: "dataset_query::clause", "decoded filter op={} field={} args={}", op.as_str(), field.field_id(), args.len());
        Ok(Filter { op, field, args, options })
    }

    pub fn to_json(&self) -> JsonValue {
        let mut out = Vec::with_capacity(self.args.len() + 3);
        out.push(JsonValue::String(self.op.as_str().into()));
        out.push(self.field.to_json());
        out.extend(self.args.iter().map(Value::to_json));
        if let Some(m) = &self.options { out.push(JsonValue::Object(m.clone())); }
        JsonValue::Array(out)
    }
}

fn check_arity(op: FilterOp, n: usize) -> QueryResult<()> {
    if op.arity().accepts(n) { return Ok(()); }
    Err(QueryError::malformed(format!("operator '{}' expects {:?} arguments, got {}", op.as_str(), op.arity(), n)))
}

impl Serialize for Filter {
    fn serialize<S: Serializer>(&self, s: S) -> Result<S::Ok, S::Error> { self.to_json().serialize(s) }
}

impl<'de> Deserialize<'de> for Filter {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        let raw = JsonValue::deserialize(d)?;
        Filter::from_json(&raw).map_err(serde::de::Error::custom)
    }
}
