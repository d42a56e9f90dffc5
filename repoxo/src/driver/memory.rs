//! In-process document store.
//!
//! Collections are vectors of records behind one `RwLock`; every operation
//! takes the lock once, so a bulk insert is all-or-nothing. Records without
//! a primary key get a fresh [`ObjectId`].

use std::{
	cmp::Ordering,
	collections::{
		HashMap,
		HashSet,
	},
	sync::Arc,
};

use parking_lot::RwLock;
use repoxo_traits::{
	key_string,
	oid_value,
	parse_oid,
	Condition,
	FilterExpression,
	FindQuery,
	ObjectId,
	Operator,
	Projection,
	Record,
	Schema,
	SortDirection,
	StorageDriver,
};
use serde_json::Value;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MemoryStoreError {
	#[error("duplicate `{collection}` key {key}")]
	DuplicateKey {
		collection: &'static str,
		key:        String,
	},

	#[error("`{collection}.{field}` is not numeric")]
	NonNumericField {
		collection: &'static str,
		field:      String,
	},
}

#[derive(Debug, Clone, Default)]
pub struct MemoryStore {
	inner: Arc<RwLock<HashMap<String, Vec<Record>>>>,
}

impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Copy of a collection in insertion order.
	pub fn snapshot(&self, collection: &str) -> Vec<Record> {
		self.inner.read().get(collection).cloned().unwrap_or_default()
	}

	pub fn len(&self, collection: &str) -> usize {
		self.inner.read().get(collection).map_or(0, Vec::len)
	}

	pub fn is_empty(&self, collection: &str) -> bool {
		self.len(collection) == 0
	}

	fn with_key(schema: &Schema, mut record: Record) -> Record {
		if record.get(schema.primary_key).map_or(true, Value::is_null) {
			record.insert(schema.primary_key.to_string(), oid_value(&ObjectId::new()));
		}
		record
	}
}

/// Loose ordering: numbers by value (numeric strings included), object ids
/// by their hex form. `None` for values that do not compare.
fn compare(a: &Value, b: &Value) -> Option<Ordering> {
	let a = parse_oid(a).map(|o| Value::String(o.to_hex())).unwrap_or_else(|| a.clone());
	let b = parse_oid(b).map(|o| Value::String(o.to_hex())).unwrap_or_else(|| b.clone());

	match (&a, &b) {
		(Value::Null, Value::Null) => Some(Ordering::Equal),
		(Value::Bool(x), Value::Bool(y)) => Some(x.cmp(y)),
		(Value::Number(x), Value::Number(y)) => x.as_f64()?.partial_cmp(&y.as_f64()?),
		(Value::String(x), Value::String(y)) => Some(x.cmp(y)),
		(Value::Number(x), Value::String(y)) => x.as_f64()?.partial_cmp(&y.parse::<f64>().ok()?),
		(Value::String(x), Value::Number(y)) => x.parse::<f64>().ok()?.partial_cmp(&y.as_f64()?),
		_ => None,
	}
}

fn loose_eq(a: &Value, b: &Value) -> bool {
	compare(a, b) == Some(Ordering::Equal)
}

fn field<'r>(record: &'r Record, name: &str) -> &'r Value {
	record.get(name).unwrap_or(&Value::Null)
}

fn in_list(v: &Value, list: &Value) -> bool {
	match list {
		Value::Array(xs) => xs.iter().any(|x| loose_eq(v, x)),
		other => loose_eq(v, other),
	}
}

fn contains_ci(v: &Value, pattern: &Value) -> bool {
	let haystack = match v {
		Value::String(s) => s.to_lowercase(),
		Value::Number(n) => n.to_string(),
		_ => return false,
	};
	pattern
		.as_str()
		.is_some_and(|p| haystack.contains(&p.to_lowercase()))
}

fn eval_condition(record: &Record, c: &Condition) -> bool {
	let v = field(record, &c.field);

	match c.op {
		Operator::Eq if c.value.is_null() => v.is_null(),
		Operator::Neq if c.value.is_null() => !v.is_null(),
		Operator::Eq | Operator::In => !v.is_null() && in_list(v, &c.value),
		Operator::Neq | Operator::NotIn => !v.is_null() && !in_list(v, &c.value),
		Operator::Like => contains_ci(v, &c.value),
		Operator::NotLike => !v.is_null() && !contains_ci(v, &c.value),
		Operator::Gt => compare(v, &c.value) == Some(Ordering::Greater),
		Operator::Gte => matches!(compare(v, &c.value), Some(Ordering::Greater | Ordering::Equal)),
		Operator::Lt => compare(v, &c.value) == Some(Ordering::Less),
		Operator::Lte => matches!(compare(v, &c.value), Some(Ordering::Less | Ordering::Equal)),
	}
}

pub(crate) fn eval(record: &Record, expr: &FilterExpression) -> bool {
	match expr {
		FilterExpression::Match { field, value } => eval_condition(
			record,
			&Condition::new(Operator::Eq, field.as_str(), value.clone()),
		),
		FilterExpression::Condition(c) => eval_condition(record, c),
		FilterExpression::And(xs) => xs.iter().all(|x| eval(record, x)),
	}
}

fn matches(record: &Record, filter: Option<&FilterExpression>) -> bool {
	filter.map_or(true, |f| eval(record, f))
}

/// Missing and null values sort after everything else.
fn sort_key_cmp(a: &Value, b: &Value) -> Ordering {
	match (a.is_null(), b.is_null()) {
		(true, true) => Ordering::Equal,
		(true, false) => Ordering::Greater,
		(false, true) => Ordering::Less,
		(false, false) => compare(a, b).unwrap_or(Ordering::Equal),
	}
}

fn project(record: &Record, projection: &Projection) -> Record {
	match projection {
		Projection::All => record.clone(),
		Projection::Columns(cols) => cols
			.iter()
			.filter_map(|c| record.get(c).map(|v| (c.clone(), v.clone())))
			.collect(),
	}
}

#[async_trait::async_trait]
impl StorageDriver for MemoryStore {
	type Error = MemoryStoreError;

	async fn find(&self, schema: &Schema, query: &FindQuery) -> Result<Vec<Record>, Self::Error> {
		let guard = self.inner.read();
		let Some(rows) = guard.get(schema.collection) else {
			return Ok(Vec::new());
		};

		let mut found: Vec<&Record> =
			rows.iter().filter(|r| matches(r, query.filter.as_ref())).collect();

		if !query.order.is_empty() {
			found.sort_by(|a, b| {
				query
					.order
					.iter()
					.map(|(f, dir)| {
						let o = sort_key_cmp(field(a, f), field(b, f));
						match dir {
							SortDirection::Asc => o,
							SortDirection::Desc => o.reverse(),
						}
					})
					.find(|o| o.is_ne())
					.unwrap_or(Ordering::Equal)
			});
		}

		let offset = usize::try_from(query.offset).unwrap_or(usize::MAX);
		let limit = query.limit.map_or(usize::MAX, |l| usize::try_from(l).unwrap_or(usize::MAX));

		let out: Vec<Record> = found
			.into_iter()
			.skip(offset)
			.take(limit)
			.map(|r| project(r, &query.projection))
			.collect();

		tracing::debug!(
			collection = schema.collection,
			filter = ?query.filter.as_ref().map(ToString::to_string),
			fetched = out.len(),
			"memory find"
		);
		Ok(out)
	}

	async fn count(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		let guard = self.inner.read();
		let n = guard
			.get(schema.collection)
			.map_or(0, |rows| rows.iter().filter(|r| matches(r, filter)).count());
		Ok(n as u64)
	}

	async fn insert_one(&self, schema: &Schema, record: Record) -> Result<Record, Self::Error> {
		let record = Self::with_key(schema, record);
		let mut guard = self.inner.write();
		let rows = guard.entry(schema.collection.to_string()).or_default();

		let pk = field(&record, schema.primary_key);
		if rows.iter().any(|r| loose_eq(field(r, schema.primary_key), pk)) {
			return Err(MemoryStoreError::DuplicateKey {
				collection: schema.collection,
				key:        key_string(pk).unwrap_or_default(),
			});
		}

		rows.push(record.clone());
		Ok(record)
	}

	async fn insert_many(&self, schema: &Schema, records: Vec<Record>) -> Result<u64, Self::Error> {
		let records: Vec<Record> = records.into_iter().map(|r| Self::with_key(schema, r)).collect();
		let mut guard = self.inner.write();
		let rows = guard.entry(schema.collection.to_string()).or_default();

		let mut keys: HashSet<String> = rows
			.iter()
			.filter_map(|r| key_string(field(r, schema.primary_key)))
			.collect();
		for record in &records {
			let key = key_string(field(record, schema.primary_key)).unwrap_or_default();
			if !keys.insert(key.clone()) {
				return Err(MemoryStoreError::DuplicateKey {
					collection: schema.collection,
					key,
				});
			}
		}

		let n = records.len() as u64;
		rows.extend(records);
		tracing::debug!(collection = schema.collection, inserted = n, "memory bulk insert");
		Ok(n)
	}

	async fn update_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
		patch: &Record,
	) -> Result<u64, Self::Error> {
		let mut guard = self.inner.write();
		let Some(rows) = guard.get_mut(schema.collection) else {
			return Ok(0);
		};

		let mut n = 0;
		for row in rows.iter_mut().filter(|r| matches(r, filter)) {
			row.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
			n += 1;
		}
		Ok(n)
	}

	async fn delete_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		let mut guard = self.inner.write();
		let Some(rows) = guard.get_mut(schema.collection) else {
			return Ok(0);
		};

		let before = rows.len();
		rows.retain(|r| !matches(r, filter));
		Ok((before - rows.len()) as u64)
	}

	async fn increment_field(
		&self,
		schema: &Schema,
		id: &Value,
		field_name: &str,
		delta: i64,
	) -> Result<u64, Self::Error> {
		let mut guard = self.inner.write();
		let Some(row) = guard
			.get_mut(schema.collection)
			.and_then(|rows| rows.iter_mut().find(|r| loose_eq(field(r, schema.primary_key), id)))
		else {
			return Ok(0);
		};

		let non_numeric = || MemoryStoreError::NonNumericField {
			collection: schema.collection,
			field:      field_name.to_string(),
		};

		let next = match row.get(field_name) {
			None | Some(Value::Null) => Value::from(delta),
			Some(Value::Number(n)) => match n.as_i64() {
				Some(i) => Value::from(i.checked_add(delta).ok_or_else(non_numeric)?),
				None => n
					.as_f64()
					.and_then(|f| serde_json::Number::from_f64(f + delta as f64))
					.map(Value::Number)
					.ok_or_else(non_numeric)?,
			},
			Some(_) => return Err(non_numeric()),
		};

		row.insert(field_name.to_string(), next);
		Ok(1)
	}
}
