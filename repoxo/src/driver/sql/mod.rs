//! Postgres driver on a `sqlx` pool.

use repoxo_traits::{
	FilterExpression,
	FindQuery,
	Record,
	Schema,
	StorageDriver,
};
use serde_json::Value;
use sqlx::{
	postgres::PgPoolOptions,
	types::Json,
	PgPool,
};
use thiserror::Error;

mod head;
mod writer;

pub use head::{
	BuildType,
	SqlHead,
};
pub use writer::SqlWriter;

#[derive(Debug, Error)]
pub enum PgDriverError {
	#[error(transparent)]
	Sqlx(#[from] sqlx::Error),

	#[error("`{0}` is not a valid SQL identifier")]
	InvalidIdentifier(String),

	#[error("`{collection}` has no column `{column}`")]
	UnknownColumn {
		collection: &'static str,
		column:     String,
	},

	#[error("{0}")]
	InvalidValue(String),
}

#[derive(Debug, Clone)]
pub struct PgDriver {
	pool: PgPool,
}

impl PgDriver {
	pub fn new(pool: PgPool) -> Self {
		Self { pool }
	}

	pub async fn connect(url: &str) -> Result<Self, PgDriverError> {
		let pool = PgPoolOptions::new().connect(url).await?;
		Ok(Self::new(pool))
	}

	pub fn pool(&self) -> &PgPool {
		&self.pool
	}

	pub(crate) fn find_statement<'a>(
		schema: &'a Schema,
		query: &FindQuery,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let mut w = SqlWriter::new(schema.collection, BuildType::Select(&query.projection))?;
		if let Some(filter) = &query.filter {
			w.push_where(filter)?;
		}
		w.push_sort(&query.order)?;
		w.push_pagination(query.limit, query.offset);
		Ok(w)
	}

	pub(crate) fn count_statement<'a>(
		schema: &'a Schema,
		filter: Option<&FilterExpression>,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let mut w = SqlWriter::new(schema.collection, BuildType::Count)?;
		if let Some(filter) = filter {
			w.push_where(filter)?;
		}
		Ok(w)
	}

	pub(crate) fn insert_one_statement<'a>(
		schema: &'a Schema,
		record: &Record,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let columns: Vec<&str> = record.keys().map(String::as_str).collect();
		check_columns(schema, &columns)?;

		let mut w = SqlWriter::new(schema.collection, BuildType::Insert)?;
		if columns.is_empty() {
			w.push(" DEFAULT VALUES");
		} else {
			push_column_list(&mut w, &columns)?;
			w.push(" VALUES (");
			for (i, c) in columns.iter().enumerate() {
				if i > 0 {
					w.push(", ");
				}
				push_cell(&mut w, c, &record[*c])?;
			}
			w.push(")");
		}
		w.push(" RETURNING to_jsonb(t)");
		Ok(w)
	}

	/// One multi-row `INSERT`; columns a record lacks get `DEFAULT`.
	pub(crate) fn insert_many_statement<'a>(
		schema: &'a Schema,
		records: &[Record],
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let mut columns: Vec<&str> = Vec::new();
		for record in records {
			for key in record.keys() {
				if !columns.contains(&key.as_str()) {
					columns.push(key.as_str());
				}
			}
		}
		check_columns(schema, &columns)?;

		let mut w = SqlWriter::new(schema.collection, BuildType::Insert)?;
		if columns.is_empty() {
			// Postgres has no multi-row DEFAULT VALUES.
			w.push(" (");
			w.push_ident(schema.primary_key)?;
			w.push(") VALUES ");
			for i in 0..records.len() {
				w.push(if i > 0 { ", (DEFAULT)" } else { "(DEFAULT)" });
			}
			return Ok(w);
		}

		push_column_list(&mut w, &columns)?;
		w.push(" VALUES ");
		for (r, record) in records.iter().enumerate() {
			w.push(if r > 0 { ", (" } else { "(" });
			for (i, c) in columns.iter().enumerate() {
				if i > 0 {
					w.push(", ");
				}
				match record.get(*c) {
					Some(v) => push_cell(&mut w, c, v)?,
					None => w.push("DEFAULT"),
				}
			}
			w.push(")");
		}
		Ok(w)
	}

	pub(crate) fn update_statement<'a>(
		schema: &'a Schema,
		filter: Option<&FilterExpression>,
		patch: &Record,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		if patch.is_empty() {
			return Err(PgDriverError::InvalidValue("empty update".into()));
		}
		let columns: Vec<&str> = patch.keys().map(String::as_str).collect();
		check_columns(schema, &columns)?;

		let mut w = SqlWriter::new(schema.collection, BuildType::Update)?;
		w.push(" SET ");
		for (i, c) in columns.iter().enumerate() {
			if i > 0 {
				w.push(", ");
			}
			w.push_ident(c)?;
			w.push(" = ");
			push_cell(&mut w, c, &patch[*c])?;
		}
		if let Some(filter) = filter {
			w.push_where(filter)?;
		}
		Ok(w)
	}

	pub(crate) fn delete_statement<'a>(
		schema: &'a Schema,
		filter: Option<&FilterExpression>,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let mut w = SqlWriter::new(schema.collection, BuildType::Delete)?;
		if let Some(filter) = filter {
			w.push_where(filter)?;
		}
		Ok(w)
	}

	pub(crate) fn increment_statement<'a>(
		schema: &'a Schema,
		id: &Value,
		field: &str,
		delta: i64,
	) -> Result<SqlWriter<'a>, PgDriverError> {
		let mut w = SqlWriter::new(schema.collection, BuildType::Update)?;
		w.push(" SET ");
		w.push_ident(field)?;
		w.push(" = COALESCE(");
		w.push_ident(field)?;
		w.push(", 0) + ");
		w.push_typed(field, &Value::from(delta))?;
		w.push_where(&FilterExpression::matches(schema.primary_key, id.clone()))?;
		Ok(w)
	}
}

fn check_columns(schema: &Schema, columns: &[&str]) -> Result<(), PgDriverError> {
	if schema.attributes.is_empty() {
		return Ok(());
	}

	match columns
		.iter()
		.copied()
		.find(|c| *c != schema.primary_key && !schema.attributes.iter().any(|a| a == c))
	{
		Some(c) => Err(PgDriverError::UnknownColumn {
			collection: schema.collection,
			column:     c.to_string(),
		}),
		None => Ok(()),
	}
}

fn push_column_list(w: &mut SqlWriter<'_>, columns: &[&str]) -> Result<(), PgDriverError> {
	w.push(" (");
	for (i, c) in columns.iter().enumerate() {
		if i > 0 {
			w.push(", ");
		}
		w.push_ident(c)?;
	}
	w.push(")");
	Ok(())
}

fn push_cell(w: &mut SqlWriter<'_>, column: &str, value: &Value) -> Result<(), PgDriverError> {
	if value.is_null() {
		w.push("NULL");
		Ok(())
	} else {
		w.push_typed(column, value)
	}
}

#[async_trait::async_trait]
impl StorageDriver for PgDriver {
	type Error = PgDriverError;

	async fn find(&self, schema: &Schema, query: &FindQuery) -> Result<Vec<Record>, Self::Error> {
		let w = Self::find_statement(schema, query)?;
		tracing::debug!(sql = w.sql(), "find");

		let rows: Vec<Json<Record>> = w
			.into_builder()
			.build_query_scalar::<Json<Record>>()
			.fetch_all(&self.pool)
			.await?;

		Ok(rows.into_iter().map(|Json(r)| r).collect())
	}

	async fn count(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		let w = Self::count_statement(schema, filter)?;
		tracing::debug!(sql = w.sql(), "count");

		let n: i64 = w
			.into_builder()
			.build_query_scalar::<i64>()
			.fetch_one(&self.pool)
			.await?;

		Ok(u64::try_from(n).unwrap_or_default())
	}

	async fn insert_one(&self, schema: &Schema, record: Record) -> Result<Record, Self::Error> {
		let w = Self::insert_one_statement(schema, &record)?;
		tracing::debug!(sql = w.sql(), "insert");

		let Json(stored) = w
			.into_builder()
			.build_query_scalar::<Json<Record>>()
			.fetch_one(&self.pool)
			.await?;

		Ok(stored)
	}

	async fn insert_many(&self, schema: &Schema, records: Vec<Record>) -> Result<u64, Self::Error> {
		if records.is_empty() {
			return Ok(0);
		}

		let w = Self::insert_many_statement(schema, &records)?;
		tracing::debug!(sql = w.sql(), rows = records.len(), "bulk insert");

		let done = w.into_builder().build().execute(&self.pool).await?;
		Ok(done.rows_affected())
	}

	async fn update_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
		patch: &Record,
	) -> Result<u64, Self::Error> {
		let w = Self::update_statement(schema, filter, patch)?;
		tracing::debug!(sql = w.sql(), "update");

		let done = w.into_builder().build().execute(&self.pool).await?;
		Ok(done.rows_affected())
	}

	async fn delete_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		let w = Self::delete_statement(schema, filter)?;
		tracing::debug!(sql = w.sql(), "delete");

		let done = w.into_builder().build().execute(&self.pool).await?;
		Ok(done.rows_affected())
	}

	async fn increment_field(
		&self,
		schema: &Schema,
		id: &Value,
		field: &str,
		delta: i64,
	) -> Result<u64, Self::Error> {
		let w = Self::increment_statement(schema, id, field, delta)?;
		tracing::debug!(sql = w.sql(), delta, "increment");

		let done = w.into_builder().build().execute(&self.pool).await?;
		Ok(done.rows_affected())
	}
}
