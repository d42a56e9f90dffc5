use std::collections::HashSet;

use repoxo_traits::{
	key_string,
	FilterExpression,
	Model,
	Record,
	StorageDriver,
};
use serde_json::Value;

use super::{
	Listing,
	QueryConfig,
	Repository,
};
use crate::{
	criteria::Criteria,
	error::{
		RepositoryError,
		Result,
	},
	pagination::{
		paginate,
		LinkTemplate,
		Page,
	},
};

impl<M, D> Repository<M, D>
where
	M: Model,
	D: StorageDriver,
{
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn find_one_by_id(&self, id: impl Into<Value>) -> Result<Option<Record>> {
		self.first(Some(Self::id_filter(id.into()))).await
	}

	/// First record where `field <op> value`, in the configured order.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn find_one_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
	) -> Result<Option<Record>> {
		let filter = Self::filter((op, field, value.into()))?;
		self.first(Some(filter)).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn find_many_by(
		&self,
		field: &str,
		value: impl Into<Value>,
		op: &str,
	) -> Result<Listing> {
		let filter = Self::filter((op, field, value.into()))?;
		self.list(&self.query, Some(filter)).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn find_many_by_ids<I, V>(&self, ids: I) -> Result<Listing>
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let ids = ids.into_iter().map(Into::into).collect();
		self.list(&self.query, Some(Self::ids_filter(ids))).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn find_many_by_criteria(
		&self,
		criteria: impl Into<Criteria>,
	) -> Result<Listing> {
		let filter = Self::filter(criteria)?;
		self.list(&self.query, Some(filter)).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, field = %field))]
	pub async fn find_many_where_in<I, V>(&self, field: &str, values: I) -> Result<Listing>
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let values: Vec<Value> = values.into_iter().map(Into::into).collect();
		let filter = Self::filter(("in", field, Value::Array(values)))?;
		self.list(&self.query, Some(filter)).await
	}

	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn find_all(&self) -> Result<Listing> {
		self.list(&self.query, None).await
	}

	/// Whether every distinct id in `ids` names a stored record.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn all_exist<I, V>(&self, ids: I) -> Result<bool>
	where
		I: IntoIterator<Item = V>,
		V: Into<Value>,
	{
		let mut seen = HashSet::new();
		let mut distinct = Vec::new();
		for id in ids {
			let id = id.into();
			let key = key_string(&id).ok_or_else(|| {
				RepositoryError::invalid_argument(format!("`{id}` is not a valid id"))
			})?;
			if seen.insert(key) {
				distinct.push(id);
			}
		}

		if distinct.is_empty() {
			return Ok(true);
		}

		let expected = distinct.len() as u64;
		let found = self
			.driver
			.count(&Self::schema(), Some(&Self::ids_filter(distinct)))
			.await
			.map_err(RepositoryError::driver)?;

		Ok(found == expected)
	}

	pub(super) async fn first(
		&self,
		filter: Option<FilterExpression>,
	) -> Result<Option<Record>> {
		let mut query = self.find_query(&self.query, filter);
		query.limit = Some(1);

		let found = self
			.driver
			.find(&Self::schema(), &query)
			.await
			.map_err(RepositoryError::driver)?;

		Ok(self.finish(&self.query, found).await?.into_iter().next())
	}

	/// Runs a multi-record find under `q`: paged by `page`/`limit`, or
	/// capped by `limit` from `offset`.
	pub(super) async fn list(
		&self,
		q: &QueryConfig,
		filter: Option<FilterExpression>,
	) -> Result<Listing> {
		let schema = Self::schema();
		let mut query = self.find_query(q, filter);

		if q.paginate {
			let page = paginate(
				&self.driver,
				&schema,
				query,
				q.limit,
				q.page,
				&LinkTemplate::from(&self.config),
			)
			.await?;

			let Page { items, meta, links } = page;
			let items = self.finish(q, items).await?;
			return Ok(Listing::Paged(Page { items, meta, links }));
		}

		query.offset = q.offset;
		let found = self
			.driver
			.find(&schema, &query)
			.await
			.map_err(RepositoryError::driver)?;

		tracing::debug!(fetched = found.len(), "listed");
		Ok(Listing::All(self.finish(q, found).await?))
	}
}
