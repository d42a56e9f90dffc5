use std::sync::Arc;

use parking_lot::Mutex;
use repoxo::{
	driver::{
		MemoryStore,
		MemoryStoreError,
	},
	FilterExpression,
	FindQuery,
	Model,
	Record,
	Repository,
	Schema,
	StorageDriver,
	ValidationError,
};
use serde_json::{
	json,
	Value,
};
use tracing_subscriber::EnvFilter;

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[repoxo(
	collection = "post",
	primary_key = "_id",
	validate = "validate_post",
	has_many(name = "comments", target = "comment", foreign_key = "post_id")
)]
pub struct Post {
	pub title: String,
	pub text:  String,
	pub views: i64,
}

pub fn validate_post(record: &Record) -> Result<(), ValidationError> {
	match record.get("title") {
		Some(Value::String(t)) if !t.trim().is_empty() => Ok(()),
		_ => Err(ValidationError::field("title", "required")),
	}
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[repoxo(
	primary_key = "_id",
	belongs_to(name = "post", target = "post", foreign_key = "post_id", owner_key = "_id")
)]
pub struct Comment {
	pub post_id: String,
	pub body:    String,
}

pub fn record(v: Value) -> Record {
	match v {
		Value::Object(m) => m,
		other => panic!("not a record: {other}"),
	}
}

/// Routes repository logs to the test writer; `RUST_LOG` picks the level.
pub fn init_tracing() {
	let _ = tracing_subscriber::fmt()
		.with_env_filter(EnvFilter::from_default_env())
		.with_test_writer()
		.try_init();
}

pub fn posts(store: &MemoryStore) -> Repository<Post, MemoryStore> {
	init_tracing();
	Repository::new(store.clone())
}

/// Inserts `n` posts titled `post 0..n` with `views = i`; returns their
/// application ids in insertion order.
pub async fn seed_posts(store: &MemoryStore, n: usize) -> Vec<String> {
	let mut ids = Vec::with_capacity(n);
	let repo = posts(store);
	for i in 0..n {
		let created = repo
			.create(record(json!({
				"title": format!("post {i}"),
				"text": if i % 2 == 0 { "hello world" } else { "goodbye" },
				"views": i,
			})))
			.await
			.unwrap();
		ids.push(created["id"].as_str().unwrap().to_string());
	}
	ids
}

pub fn titles(items: &[Record]) -> Vec<&str> {
	items.iter().map(|r| r["title"].as_str().unwrap()).collect()
}

/// Memory store that remembers every filter it was handed.
#[derive(Clone, Default)]
pub struct RecordingDriver {
	pub inner:   MemoryStore,
	pub filters: Arc<Mutex<Vec<Option<FilterExpression>>>>,
}

impl RecordingDriver {
	pub fn take(&self) -> Vec<Option<FilterExpression>> {
		std::mem::take(&mut *self.filters.lock())
	}

	fn log(&self, filter: Option<&FilterExpression>) {
		self.filters.lock().push(filter.cloned());
	}
}

#[async_trait::async_trait]
impl StorageDriver for RecordingDriver {
	type Error = MemoryStoreError;

	async fn find(&self, schema: &Schema, query: &FindQuery) -> Result<Vec<Record>, Self::Error> {
		self.log(query.filter.as_ref());
		self.inner.find(schema, query).await
	}

	async fn count(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		self.log(filter);
		self.inner.count(schema, filter).await
	}

	async fn insert_one(&self, schema: &Schema, record: Record) -> Result<Record, Self::Error> {
		self.inner.insert_one(schema, record).await
	}

	async fn insert_many(&self, schema: &Schema, records: Vec<Record>) -> Result<u64, Self::Error> {
		self.inner.insert_many(schema, records).await
	}

	async fn update_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
		patch: &Record,
	) -> Result<u64, Self::Error> {
		self.log(filter);
		self.inner.update_many(schema, filter, patch).await
	}

	async fn delete_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error> {
		self.log(filter);
		self.inner.delete_many(schema, filter).await
	}

	async fn increment_field(
		&self,
		schema: &Schema,
		id: &Value,
		field: &str,
		delta: i64,
	) -> Result<u64, Self::Error> {
		self.inner.increment_field(schema, id, field, delta).await
	}
}
