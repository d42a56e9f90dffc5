use std::collections::HashMap;

use serde_json::Value;

use crate::{
	key_string,
	FilterExpression,
	FindQuery,
	Record,
	Relation,
	RelationKind,
	Schema,
};

/// Storage backend a repository delegates to.
///
/// Implementations translate [`FilterExpression`]s into their native query
/// language. They report their own failures through `Error`; the repository
/// never retries or inspects them.
#[async_trait::async_trait]
pub trait StorageDriver: Send + Sync {
	type Error: std::error::Error + Send + Sync + 'static;

	async fn find(
		&self,
		schema: &Schema,
		query: &FindQuery,
	) -> Result<Vec<Record>, Self::Error>;

	async fn count(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error>;

	/// Stores one record and returns it as persisted, including a generated
	/// primary key.
	async fn insert_one(
		&self,
		schema: &Schema,
		record: Record,
	) -> Result<Record, Self::Error>;

	/// Stores all records or none of them.
	async fn insert_many(
		&self,
		schema: &Schema,
		records: Vec<Record>,
	) -> Result<u64, Self::Error>;

	async fn update_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
		patch: &Record,
	) -> Result<u64, Self::Error>;

	async fn delete_many(
		&self,
		schema: &Schema,
		filter: Option<&FilterExpression>,
	) -> Result<u64, Self::Error>;

	/// Atomically adds `delta` to a numeric field of the record whose primary
	/// key is `id`.
	async fn increment_field(
		&self,
		schema: &Schema,
		id: &Value,
		field: &str,
		delta: i64,
	) -> Result<u64, Self::Error>;

	/// Eager-loads `relations` onto `records` with one `IN` query per
	/// relation. Drivers with native joins may override this.
	async fn attach_relations(
		&self,
		records: &mut [Record],
		relations: &[Relation],
	) -> Result<(), Self::Error> {
		for relation in relations {
			let mut seen = std::collections::HashSet::new();
			let keys: Vec<Value> = records
				.iter()
				.filter_map(|r| r.get(relation.local_key))
				.filter(|v| key_string(*v).is_some_and(|k| seen.insert(k)))
				.cloned()
				.collect();

			let related = if keys.is_empty() {
				Vec::new()
			} else {
				let query = FindQuery::filtered(Some(FilterExpression::is_in(
					relation.foreign_key,
					keys,
				)));
				self.find(&Schema::for_relation(relation), &query).await?
			};

			let mut grouped: HashMap<String, Vec<Record>> = HashMap::new();
			for row in related {
				if let Some(key) = row.get(relation.foreign_key).and_then(key_string)
				{
					grouped.entry(key).or_default().push(row);
				}
			}

			tracing::debug!(
				relation = relation.name,
				target = relation.target,
				groups = grouped.len(),
				"attached relation"
			);

			for record in records.iter_mut() {
				let matched = record
					.get(relation.local_key)
					.and_then(key_string)
					.and_then(|k| grouped.get(&k))
					.cloned()
					.unwrap_or_default();

				let value = match relation.kind {
					RelationKind::Many => {
						Value::Array(matched.into_iter().map(Value::Object).collect())
					}
					RelationKind::One => matched
						.into_iter()
						.next()
						.map(Value::Object)
						.unwrap_or(Value::Null),
				};

				record.insert(relation.name.to_string(), value);
			}
		}

		Ok(())
	}
}
