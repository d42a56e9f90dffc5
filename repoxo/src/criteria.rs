//! Turns loosely typed criteria into a [`FilterExpression`].

use repoxo_traits::{
	is_identifier,
	parse_oid,
	Condition,
	FilterExpression,
	Operator,
	Record,
};
use serde_json::Value;

use crate::error::{
	RepositoryError,
	Result,
};

/// Caller-supplied `(operator, field, value)` triple. Nothing is checked
/// until it is normalized.
#[derive(Debug, Clone, PartialEq)]
pub struct Criterion {
	pub op:    String,
	pub field: String,
	pub value: Option<Value>,
}

impl Criterion {
	pub fn new(
		op: impl Into<String>,
		field: impl Into<String>,
		value: impl Into<Value>,
	) -> Self {
		Self {
			op:    op.into(),
			field: field.into(),
			value: Some(value.into()),
		}
	}

	pub fn eq(field: impl Into<String>, value: impl Into<Value>) -> Self {
		Self::new("=", field, value)
	}

	pub fn validate(self) -> Result<Condition> {
		let op: Operator = self.op.parse().map_err(|e| {
			RepositoryError::invalid_criteria(format!("{e} on `{}`", self.field))
		})?;

		let field = self.field.trim();
		if field.is_empty() {
			return Err(RepositoryError::invalid_criteria(format!(
				"missing field for `{op}`"
			)));
		}
		if !is_identifier(field) {
			return Err(RepositoryError::invalid_criteria(format!(
				"`{field}` is not a valid field name"
			)));
		}

		let value = self.value.ok_or_else(|| {
			RepositoryError::invalid_criteria(format!("missing value for `{field}`"))
		})?;

		let value = check_value(op, field, value)?;

		Ok(Condition::new(op, field, value))
	}
}

fn is_scalar(v: &Value) -> bool {
	match v {
		Value::Array(_) => false,
		Value::Object(_) => parse_oid(v).is_some(),
		_ => true,
	}
}

fn check_value(op: Operator, field: &str, value: Value) -> Result<Value> {
	let invalid = |msg: &str| {
		Err(RepositoryError::invalid_criteria(format!(
			"`{op}` on `{field}`: {msg}"
		)))
	};

	match op {
		Operator::Eq | Operator::Neq => match &value {
			Value::Array(xs) if !xs.iter().all(|x| is_scalar(x) && !x.is_null()) => {
				invalid("list values must be scalars")
			}
			v if !v.is_array() && !is_scalar(v) => invalid("value must be a scalar"),
			_ => Ok(value),
		},
		Operator::Like | Operator::NotLike => match value {
			Value::String(s) if s.is_empty() => invalid("missing pattern"),
			Value::String(s) => Ok(Value::String(s)),
			Value::Number(n) => Ok(Value::String(n.to_string())),
			_ => invalid("pattern must be a string"),
		},
		Operator::In | Operator::NotIn => {
			let values = match value {
				Value::Array(xs) => xs,
				Value::Null => return invalid("missing value list"),
				scalar => vec![scalar],
			};
			if !values.iter().all(|x| is_scalar(x) && !x.is_null()) {
				return invalid("list values must be scalars");
			}
			Ok(Value::Array(values))
		}
		Operator::Gt | Operator::Gte | Operator::Lt | Operator::Lte => {
			if value.is_null() {
				invalid("missing value")
			} else if !is_scalar(&value) {
				invalid("value must be a scalar")
			} else {
				Ok(value)
			}
		}
	}
}

/// Accepted input shapes for [`normalize`].
#[derive(Debug, Clone, PartialEq)]
pub enum Criteria {
	Single(Criterion),
	List(Vec<Criterion>),
	/// `{field: value}` pairs, each an equality.
	Shorthand(Vec<(String, Value)>),
}

impl From<Criterion> for Criteria {
	fn from(c: Criterion) -> Self {
		Criteria::Single(c)
	}
}

impl From<Vec<Criterion>> for Criteria {
	fn from(cs: Vec<Criterion>) -> Self {
		Criteria::List(cs)
	}
}

impl<O, F, V> From<(O, F, V)> for Criteria
where
	O: Into<String>,
	F: Into<String>,
	V: Into<Value>,
{
	fn from((op, field, value): (O, F, V)) -> Self {
		Criteria::Single(Criterion::new(op, field, value))
	}
}

impl<O, F, V> From<Vec<(O, F, V)>> for Criteria
where
	O: Into<String>,
	F: Into<String>,
	V: Into<Value>,
{
	fn from(v: Vec<(O, F, V)>) -> Self {
		Criteria::List(
			v.into_iter()
				.map(|(op, field, value)| Criterion::new(op, field, value))
				.collect(),
		)
	}
}

impl<O, F, V, const N: usize> From<[(O, F, V); N]> for Criteria
where
	O: Into<String>,
	F: Into<String>,
	V: Into<Value>,
{
	fn from(v: [(O, F, V); N]) -> Self {
		Criteria::from(Vec::from(v))
	}
}

impl From<Record> for Criteria {
	fn from(map: Record) -> Self {
		Criteria::Shorthand(map.into_iter().collect())
	}
}

/// Builds the canonical filter: equality triples collapse to `{field:
/// value}`, a single element is returned as is and several are wrapped in
/// one `AND` in input order.
pub fn normalize(criteria: impl Into<Criteria>) -> Result<FilterExpression> {
	let mut parts: Vec<FilterExpression> = match criteria.into() {
		Criteria::Single(c) => vec![c.validate()?.into()],
		Criteria::List(cs) => cs
			.into_iter()
			.map(|c| c.validate().map(FilterExpression::from))
			.collect::<Result<_>>()?,
		Criteria::Shorthand(pairs) => pairs
			.into_iter()
			.map(|(field, value)| {
				Criterion::eq(field, value).validate().map(FilterExpression::from)
			})
			.collect::<Result<_>>()?,
	};

	match parts.len() {
		0 => Err(RepositoryError::invalid_criteria("no criteria given")),
		1 => Ok(parts.remove(0)),
		_ => Ok(FilterExpression::And(parts)),
	}
}
