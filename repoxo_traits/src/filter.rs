use std::fmt;
use std::str::FromStr;

use serde_json::Value;
use thiserror::Error;

#[macro_export]
macro_rules! and {
    ( $( $e:expr ),* $(,)? ) => {
        $crate::FilterExpression::And(vec![
            $( $crate::FilterExpression::from($e) ),*
        ])
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
	Eq,
	Neq,
	Gt,
	Gte,
	Lt,
	Lte,
	Like,
	NotLike,
	In,
	NotIn,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown operator `{0}`")]
pub struct UnknownOperator(pub String);

impl FromStr for Operator {
	type Err = UnknownOperator;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		let normalized = s.trim().to_ascii_lowercase();
		let words: Vec<&str> = normalized.split_whitespace().collect();

		match words.as_slice() {
			["="] | ["=="] => Ok(Self::Eq),
			["!="] | ["<>"] => Ok(Self::Neq),
			[">"] => Ok(Self::Gt),
			[">="] => Ok(Self::Gte),
			["<"] => Ok(Self::Lt),
			["<="] => Ok(Self::Lte),
			["like"] => Ok(Self::Like),
			["not", "like"] => Ok(Self::NotLike),
			["in"] => Ok(Self::In),
			["not", "in"] => Ok(Self::NotIn),
			_ => Err(UnknownOperator(s.to_string())),
		}
	}
}

impl Operator {
	pub fn as_str(self) -> &'static str {
		match self {
			Self::Eq => "=",
			Self::Neq => "!=",
			Self::Gt => ">",
			Self::Gte => ">=",
			Self::Lt => "<",
			Self::Lte => "<=",
			Self::Like => "like",
			Self::NotLike => "not like",
			Self::In => "in",
			Self::NotIn => "not in",
		}
	}

	pub fn takes_list(self) -> bool {
		matches!(self, Self::In | Self::NotIn)
	}
}

impl fmt::Display for Operator {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.write_str(self.as_str())
	}
}

/// A validated `(operator, field, value)` triple.
#[derive(Debug, Clone, PartialEq)]
pub struct Condition {
	pub op:    Operator,
	pub field: String,
	pub value: Value,
}

impl Condition {
	pub fn new(op: Operator, field: impl Into<String>, value: Value) -> Self {
		Self {
			op,
			field: field.into(),
			value,
		}
	}
}

/// Canonical filter handed to drivers.
#[derive(Debug, Clone, PartialEq)]
pub enum FilterExpression {
	/// Shorthand equality `{field: value}`.
	Match {
		field: String,
		value: Value,
	},
	Condition(Condition),
	And(Vec<FilterExpression>),
}

impl From<Condition> for FilterExpression {
	fn from(c: Condition) -> Self {
		if c.op == Operator::Eq {
			FilterExpression::Match {
				field: c.field,
				value: c.value,
			}
		} else {
			FilterExpression::Condition(c)
		}
	}
}

impl FilterExpression {
	pub fn matches(field: impl Into<String>, value: Value) -> Self {
		FilterExpression::Match {
			field: field.into(),
			value,
		}
	}

	pub fn is_in(field: impl Into<String>, values: Vec<Value>) -> Self {
		FilterExpression::Condition(Condition::new(
			Operator::In,
			field,
			Value::Array(values),
		))
	}

	/// Conjoins two expressions, flattening nested `AND`s.
	pub fn and(self, other: FilterExpression) -> FilterExpression {
		let mut children = match self {
			FilterExpression::And(xs) => xs,
			other => vec![other],
		};
		match other {
			FilterExpression::And(xs) => children.extend(xs),
			other => children.push(other),
		}
		FilterExpression::And(children)
	}

	pub fn rename_fields<F>(self, f: &F) -> FilterExpression
	where
		F: Fn(&str) -> String,
	{
		match self {
			FilterExpression::Match { field, value } => FilterExpression::Match {
				field: f(&field),
				value,
			},
			FilterExpression::Condition(c) => {
				FilterExpression::Condition(Condition {
					field: f(&c.field),
					..c
				})
			}
			FilterExpression::And(xs) => FilterExpression::And(
				xs.into_iter().map(|x| x.rename_fields(f)).collect(),
			),
		}
	}

	/// Every field referenced by the expression, in order of appearance.
	pub fn fields(&self) -> Vec<&str> {
		let mut out = Vec::new();
		self.collect_fields(&mut out);
		out
	}

	fn collect_fields<'a>(&'a self, out: &mut Vec<&'a str>) {
		match self {
			FilterExpression::Match { field, .. } => out.push(field),
			FilterExpression::Condition(c) => out.push(&c.field),
			FilterExpression::And(xs) => {
				for x in xs {
					x.collect_fields(out);
				}
			}
		}
	}
}

impl fmt::Display for FilterExpression {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			FilterExpression::Match { field, value } => write!(f, "{field} = {value}"),
			FilterExpression::Condition(c) => {
				write!(f, "{} {} {}", c.field, c.op, c.value)
			}
			FilterExpression::And(xs) => {
				f.write_str("(")?;
				for (i, x) in xs.iter().enumerate() {
					if i > 0 {
						f.write_str(" AND ")?;
					}
					write!(f, "{x}")?;
				}
				f.write_str(")")
			}
		}
	}
}
