//! Free-text filter language: `op:field:value` tokens separated by commas.

use repoxo_traits::Operator;
use serde::{
	Deserialize,
	Serialize,
};
use serde_json::{
	Number,
	Value,
};
use utoipa::{
	IntoParams,
	ToSchema,
};

use crate::{
	criteria::Criterion,
	error::{
		RepositoryError,
		Result,
	},
};

/// Search request as it arrives on the query string.
#[derive(
	Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, IntoParams, ToSchema,
)]
#[serde(default, rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct SearchParams {
	/// Comma-separated `op:field:value` tokens, all of which must hold.
	#[param(example = "=:title:hello,like:text:wor")]
	pub search: Option<String>,

	/// Comma-separated column list.
	#[param(example = "id,title")]
	pub fields: Option<String>,

	/// Comma-separated relation names to eager-load.
	pub with: Option<String>,

	#[param(example = 1)]
	pub page: Option<u64>,

	#[serde(alias = "per-page")]
	#[param(example = 10)]
	pub per_page: Option<u64>,
}

impl SearchParams {
	pub fn search(mut self, filter: impl Into<String>) -> Self {
		self.search = Some(filter.into());
		self
	}

	pub fn fields(mut self, fields: impl Into<String>) -> Self {
		self.fields = Some(fields.into());
		self
	}

	pub fn with(mut self, relations: impl Into<String>) -> Self {
		self.with = Some(relations.into());
		self
	}

	pub fn page(mut self, page: u64) -> Self {
		self.page = Some(page);
		self
	}

	pub fn per_page(mut self, per_page: u64) -> Self {
		self.per_page = Some(per_page);
		self
	}

	/// Parsed `search` filter; `None` when absent or blank.
	pub fn criteria(&self) -> Result<Option<Vec<Criterion>>> {
		match self.search.as_deref().map(str::trim) {
			None | Some("") => Ok(None),
			Some(s) => parse_filter(s).map(Some),
		}
	}

	pub fn field_list(&self) -> Option<Vec<String>> {
		self.fields.as_deref().map(split_list).filter(|v| !v.is_empty())
	}

	pub fn relation_list(&self) -> Option<Vec<String>> {
		self.with.as_deref().map(split_list).filter(|v| !v.is_empty())
	}
}

fn split_list(s: &str) -> Vec<String> {
	s.split(',')
		.map(str::trim)
		.filter(|x| !x.is_empty())
		.map(str::to_string)
		.collect()
}

/// Parses `"=:title:hello,like:text:wor"` into criteria. The value part may
/// contain `:`; `in` and `not in` values are split on `|`.
pub fn parse_filter(input: &str) -> Result<Vec<Criterion>> {
	input.split(',').map(parse_token).collect()
}

fn parse_token(token: &str) -> Result<Criterion> {
	let token = token.trim();
	let mut parts = token.splitn(3, ':').map(str::trim);

	let (Some(op), Some(field), Some(value)) = (parts.next(), parts.next(), parts.next())
	else {
		return Err(RepositoryError::invalid_criteria(format!(
			"`{token}` is not of the form op:field:value"
		)));
	};
	if op.is_empty() || field.is_empty() || value.is_empty() {
		return Err(RepositoryError::invalid_criteria(format!(
			"`{token}` has an empty part"
		)));
	}

	let operator: Operator = op
		.parse()
		.map_err(|e| RepositoryError::invalid_criteria(format!("{e} in `{token}`")))?;

	let value = if operator.takes_list() {
		Value::Array(value.split('|').map(|v| literal(v.trim())).collect())
	} else {
		literal(value)
	};

	Ok(Criterion::new(op, field, value))
}

fn literal(s: &str) -> Value {
	match s {
		"true" => return Value::Bool(true),
		"false" => return Value::Bool(false),
		"null" => return Value::Null,
		_ => {}
	}

	if let Ok(i) = s.parse::<i64>() {
		return Value::from(i);
	}
	if s.contains('.') {
		if let Some(n) = s.parse::<f64>().ok().and_then(Number::from_f64) {
			return Value::Number(n);
		}
	}

	Value::String(s.to_string())
}
