use repoxo_traits::{
	FilterExpression,
	Model,
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
};

impl<M, D> Repository<M, D>
where
	M: Model,
	D: StorageDriver,
{
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn delete_one_by_id(&self, id: impl Into<Value>) -> Result<bool> {
		self.delete_one(&Self::id_filter(id.into())).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn delete_one_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
	) -> Result<bool> {
		let filter = Self::filter((op, field, value.into()))?;
		self.delete_one(&filter).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn delete_one_by_criteria(&self, criteria: impl Into<Criteria>) -> Result<bool> {
		self.delete_one(&Self::filter(criteria)?).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn delete_many_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
	) -> Result<u64> {
		let filter = Self::filter((op, field, value.into()))?;
		self.delete_where(&filter).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn delete_many_by_criteria(&self, criteria: impl Into<Criteria>) -> Result<u64> {
		self.delete_where(&Self::filter(criteria)?).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn delete_many_by_ids<I, V>(&self, ids: I) -> Result<u64>
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let ids = ids.into_iter().map(Into::into).collect();
		self.delete_where(&Self::ids_filter(ids)).await
	}

	async fn delete_one(&self, filter: &FilterExpression) -> Result<bool> {
		let target = self.locate(filter).await?;
		let pk = Self::primary_key_of(&target)?;
		Ok(self.delete_where(&Self::id_filter(pk)).await? > 0)
	}

	async fn delete_where(&self, filter: &FilterExpression) -> Result<u64> {
		let deleted = self
			.driver
			.delete_many(&Self::schema(), Some(filter))
			.await
			.map_err(RepositoryError::driver)?;

		tracing::debug!(deleted, "records deleted");
		Ok(deleted)
	}
}
