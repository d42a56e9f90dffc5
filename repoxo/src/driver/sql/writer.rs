use std::fmt;

use repoxo_traits::{
	is_identifier,
	parse_oid,
	FilterExpression,
	Operator,
	SortOrder,
};
use serde_json::{
	Map,
	Value,
};
use sqlx::{
	types::Json,
	Postgres,
};

use super::{
	head::{
		BuildType,
		SqlHead,
	},
	PgDriverError,
};

pub(crate) fn check_ident(name: &str) -> Result<&str, PgDriverError> {
	if is_identifier(name) {
		Ok(name)
	} else {
		Err(PgDriverError::InvalidIdentifier(name.to_string()))
	}
}

/// Object ids are stored as their hex string.
pub(crate) fn storage_value(v: &Value) -> Value {
	match parse_oid(v) {
		Some(oid) => Value::String(oid.to_hex()),
		None => v.clone(),
	}
}

fn like_pattern(s: &str) -> String {
	let mut out = String::with_capacity(s.len() + 2);
	out.push('%');
	for c in s.chars() {
		if matches!(c, '%' | '_' | '\\') {
			out.push('\\');
		}
		out.push(c);
	}
	out.push('%');
	out
}

/// Builds one parameterized statement against a single table.
///
/// Values are bound as JSON and read back through
/// `jsonb_populate_record(NULL::"table", ..)`, so Postgres coerces them to
/// the column's own type.
pub struct SqlWriter<'a> {
	qb:             sqlx::QueryBuilder<'static, Postgres>,
	table:          &'a str,
	has_where:      bool,
	has_sort:       bool,
	has_pagination: bool,
}

impl fmt::Debug for SqlWriter<'_> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("SqlWriter")
			.field("table", &self.table)
			.field("sql", &self.sql())
			.finish_non_exhaustive()
	}
}

impl<'a> SqlWriter<'a> {
	pub fn new(table: &'a str, build: BuildType<'_>) -> Result<Self, PgDriverError> {
		check_ident(table)?;
		if let BuildType::Select(repoxo_traits::Projection::Columns(cols)) = &build {
			for c in cols {
				check_ident(c)?;
			}
		}

		let qb = sqlx::QueryBuilder::<Postgres>::new(SqlHead::new(table, build).to_string());

		Ok(Self {
			qb,
			table,
			has_where: false,
			has_sort: false,
			has_pagination: false,
		})
	}

	pub fn into_builder(self) -> sqlx::QueryBuilder<'static, Postgres> {
		self.qb
	}

	pub fn sql(&self) -> &str {
		self.qb.sql()
	}

	pub fn push(&mut self, s: &str) {
		self.qb.push(s);
	}

	pub fn push_ident(&mut self, name: &str) -> Result<(), PgDriverError> {
		check_ident(name)?;
		self.qb.push("\"").push(name).push("\"");
		Ok(())
	}

	/// `value` as it would be stored in `field`.
	pub fn push_typed(&mut self, field: &str, value: &Value) -> Result<(), PgDriverError> {
		check_ident(field)?;

		let mut cell = Map::new();
		cell.insert(field.to_string(), storage_value(value));

		self.qb.push("(jsonb_populate_record(NULL::\"");
		self.qb.push(self.table);
		self.qb.push("\", ");
		self.qb.push_bind(Json(Value::Object(cell)));
		self.qb.push("))");
		self.qb.push(".\"").push(field).push("\"");
		Ok(())
	}

	pub fn push_where(&mut self, expr: &FilterExpression) -> Result<(), PgDriverError> {
		if self.has_where {
			return Ok(());
		}

		self.qb.push(" WHERE ");
		self.has_where = true;
		self.write_expr(expr)
	}

	fn write_expr(&mut self, expr: &FilterExpression) -> Result<(), PgDriverError> {
		match expr {
			FilterExpression::Match { field, value } => {
				self.write_condition(field, Operator::Eq, value)
			}
			FilterExpression::Condition(c) => self.write_condition(&c.field, c.op, &c.value),
			FilterExpression::And(xs) if xs.is_empty() => {
				self.push("TRUE");
				Ok(())
			}
			FilterExpression::And(xs) => {
				self.push("(");
				for (i, x) in xs.iter().enumerate() {
					if i > 0 {
						self.push(" AND ");
					}
					self.write_expr(x)?;
				}
				self.push(")");
				Ok(())
			}
		}
	}

	fn write_condition(
		&mut self,
		field: &str,
		op: Operator,
		value: &Value,
	) -> Result<(), PgDriverError> {
		match (op, value) {
			(Operator::Eq, Value::Null) => {
				self.push_ident(field)?;
				self.push(" IS NULL");
			}
			(Operator::Neq, Value::Null) => {
				self.push_ident(field)?;
				self.push(" IS NOT NULL");
			}
			(Operator::Eq | Operator::In, Value::Array(xs)) => self.write_list(field, xs, false)?,
			(Operator::Neq | Operator::NotIn, Value::Array(xs)) => {
				self.write_list(field, xs, true)?
			}
			(Operator::Like | Operator::NotLike, v) => {
				let Some(pattern) = v.as_str() else {
					return Err(PgDriverError::InvalidValue(format!(
						"`{op}` on `{field}` needs a string"
					)));
				};
				self.push_ident(field)?;
				self.push(if op == Operator::Like {
					"::text ILIKE "
				} else {
					"::text NOT ILIKE "
				});
				self.qb.push_bind(like_pattern(pattern));
			}
			(Operator::In | Operator::NotIn, v) => {
				self.write_list(field, std::slice::from_ref(v), op == Operator::NotIn)?
			}
			(op, v) => {
				let sql_op = match op {
					Operator::Eq => " = ",
					Operator::Neq => " <> ",
					Operator::Gt => " > ",
					Operator::Gte => " >= ",
					Operator::Lt => " < ",
					Operator::Lte => " <= ",
					other => {
						return Err(PgDriverError::InvalidValue(format!(
							"`{other}` on `{field}` cannot take {v}"
						)))
					}
				};
				self.push_ident(field)?;
				self.push(sql_op);
				self.push_typed(field, v)?;
			}
		}

		Ok(())
	}

	fn write_list(
		&mut self,
		field: &str,
		values: &[Value],
		negated: bool,
	) -> Result<(), PgDriverError> {
		if values.is_empty() {
			self.push(if negated { "TRUE" } else { "FALSE" });
			return Ok(());
		}

		let rows: Vec<Value> = values
			.iter()
			.map(|v| {
				let mut row = Map::new();
				row.insert(field.to_string(), storage_value(v));
				Value::Object(row)
			})
			.collect();

		self.push_ident(field)?;
		self.push(if negated { " NOT IN " } else { " IN " });
		self.push("(SELECT r.");
		self.push_ident(field)?;
		self.push(" FROM jsonb_populate_recordset(NULL::\"");
		self.qb.push(self.table);
		self.push("\", ");
		self.qb.push_bind(Json(Value::Array(rows)));
		self.push(") AS r)");
		Ok(())
	}

	pub fn push_sort(&mut self, order: &SortOrder) -> Result<(), PgDriverError> {
		if self.has_sort || order.is_empty() {
			return Ok(());
		}

		self.qb.push(" ORDER BY ");
		self.has_sort = true;
		for (i, (field, dir)) in order.iter().enumerate() {
			if i > 0 {
				self.push(", ");
			}
			self.push_ident(field)?;
			self.qb.push(" ").push(dir.to_string());
		}
		Ok(())
	}

	pub fn push_pagination(&mut self, limit: Option<u64>, offset: u64) {
		if self.has_pagination {
			return;
		}

		self.has_pagination = true;
		if let Some(limit) = limit {
			self.qb.push(" LIMIT ");
			self.qb.push_bind(i64::try_from(limit).unwrap_or(i64::MAX));
		}
		if offset > 0 {
			self.qb.push(" OFFSET ");
			self.qb.push_bind(i64::try_from(offset).unwrap_or(i64::MAX));
		}
	}
}
