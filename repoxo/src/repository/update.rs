use repoxo_traits::{
	is_identifier,
	FilterExpression,
	Model,
	Projection,
	Record,
	StorageDriver,
};
use serde_json::Value;

use super::Repository;
use crate::{
	criteria::Criteria,
	error::{
		RepositoryError,
		Result,
	},
	format::EntityFormatter,
};

impl<M, D> Repository<M, D>
where
	M: Model,
	D: StorageDriver,
{
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn update_one_by_id(&self, id: impl Into<Value>, data: Record) -> Result<Record> {
		self.update_one(Self::id_filter(id.into()), data).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn update_one_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
		data: Record,
	) -> Result<Record> {
		let filter = Self::filter((op, field, value.into()))?;
		self.update_one(filter, data).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn update_one_by_criteria(
		&self,
		criteria: impl Into<Criteria>,
		data: Record,
	) -> Result<Record> {
		self.update_one(Self::filter(criteria)?, data).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn update_many_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
		data: Record,
	) -> Result<u64> {
		let filter = Self::filter((op, field, value.into()))?;
		self.update_where(&filter, data).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn update_many_by_criteria(
		&self,
		criteria: impl Into<Criteria>,
		data: Record,
	) -> Result<u64> {
		self.update_where(&Self::filter(criteria)?, data).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn update_many_by_ids<I, V>(&self, ids: I, data: Record) -> Result<u64>
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let ids = ids.into_iter().map(Into::into).collect();
		self.update_where(&Self::ids_filter(ids), data).await
	}

	/// Adds `delta` to the numeric `field` of the record with this id.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field, delta = delta))]
	pub async fn increment(&self, id: impl Into<Value>, field: &str, delta: i64) -> Result<bool> {
		let column = Self::storage_name(field);
		if !is_identifier(&column) || column == M::PRIMARY_KEY {
			return Err(RepositoryError::invalid_argument(format!(
				"`{field}` is not a counter field"
			)));
		}

		let target = self.locate(&Self::id_filter(id.into())).await?;
		let pk = Self::primary_key_of(&target)?;

		let changed = self
			.driver
			.increment_field(&Self::schema(), &pk, &column, delta)
			.await
			.map_err(RepositoryError::driver)?;

		Ok(changed > 0)
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field, delta = delta))]
	pub async fn decrement(&self, id: impl Into<Value>, field: &str, delta: i64) -> Result<bool> {
		let delta = delta.checked_neg().ok_or_else(|| {
			RepositoryError::invalid_argument(format!("cannot decrement by {delta}"))
		})?;
		self.increment(id, field, delta).await
	}

	async fn update_one(&self, filter: FilterExpression, data: Record) -> Result<Record> {
		let patch = Self::patch(data)?;
		let target = self.locate(&filter).await?;
		let pk = Self::primary_key_of(&target)?;

		let mut merged = target;
		merged.extend(patch.iter().map(|(k, v)| (k.clone(), v.clone())));
		Self::check(&merged, None)?;

		let by_pk = Self::id_filter(pk);
		self.driver
			.update_many(&Self::schema(), Some(&by_pk), &patch)
			.await
			.map_err(RepositoryError::driver)?;

		let updated = self.locate(&by_pk).await?;
		Ok(EntityFormatter::for_model::<M>(&Projection::All).format(updated))
	}

	async fn update_where(&self, filter: &FilterExpression, data: Record) -> Result<u64> {
		let patch = Self::patch(data)?;
		let updated = self
			.driver
			.update_many(&Self::schema(), Some(filter), &patch)
			.await
			.map_err(RepositoryError::driver)?;

		tracing::debug!(updated, "records updated");
		Ok(updated)
	}

	/// Storage-named attribute changes. Keys are never rewritten.
	fn patch(data: Record) -> Result<Record> {
		let mut patch = Record::new();
		for (field, value) in data {
			let column = Self::storage_name(&field);
			if column == M::PRIMARY_KEY {
				continue;
			}
			if !is_identifier(&column) {
				return Err(RepositoryError::invalid_argument(format!(
					"`{field}` is not a valid field name"
				)));
			}
			patch.insert(column, value);
		}

		if patch.is_empty() {
			return Err(RepositoryError::invalid_argument("nothing to update"));
		}
		Ok(patch)
	}
}
