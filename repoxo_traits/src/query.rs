use std::fmt;
use std::str::FromStr;

use serde::{
	Deserialize,
	Serialize,
};
use thiserror::Error;

use crate::FilterExpression;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
	Asc,
	Desc,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("sort direction must be ASC or DESC, got `{0}`")]
pub struct UnknownDirection(pub String);

impl FromStr for SortDirection {
	type Err = UnknownDirection;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		match s.trim().to_ascii_uppercase().as_str() {
			"ASC" => Ok(Self::Asc),
			"DESC" => Ok(Self::Desc),
			_ => Err(UnknownDirection(s.to_string())),
		}
	}
}

impl fmt::Display for SortDirection {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Asc => f.write_str("ASC"),
			Self::Desc => f.write_str("DESC"),
		}
	}
}

impl From<SortDirection> for String {
	fn from(d: SortDirection) -> Self {
		d.to_string()
	}
}

/// Ordered list of `field -> direction` pairs; earlier entries take
/// precedence.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SortOrder(pub Vec<(String, SortDirection)>);

impl SortOrder {
	pub fn by(field: impl Into<String>, direction: SortDirection) -> Self {
		Self(vec![(field.into(), direction)])
	}

	pub fn is_empty(&self) -> bool {
		self.0.is_empty()
	}

	pub fn iter(&self) -> impl Iterator<Item = (&str, SortDirection)> {
		self.0.iter().map(|(f, d)| (f.as_str(), *d))
	}
}

impl From<Vec<(String, SortDirection)>> for SortOrder {
	fn from(v: Vec<(String, SortDirection)>) -> Self {
		Self(v)
	}
}

/// Which attributes a find returns.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Projection {
	#[default]
	All,
	Columns(Vec<String>),
}

impl Projection {
	pub fn includes(&self, field: &str) -> bool {
		match self {
			Projection::All => true,
			Projection::Columns(cols) => cols.iter().any(|c| c == field),
		}
	}

	/// Adds `field` to an explicit column list; `All` already covers it.
	pub fn ensure(&mut self, field: &str) {
		if let Projection::Columns(cols) = self {
			if !cols.iter().any(|c| c == field) {
				cols.push(field.to_string());
			}
		}
	}
}

/// Everything a driver needs to run one bounded read.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct FindQuery {
	pub filter:     Option<FilterExpression>,
	pub projection: Projection,
	pub order:      SortOrder,
	pub limit:      Option<u64>,
	pub offset:     u64,
}

impl FindQuery {
	pub fn filtered(filter: Option<FilterExpression>) -> Self {
		Self {
			filter,
			..Default::default()
		}
	}
}
