use repoxo_traits::{
	Model,
	Projection,
	Record,
	StorageDriver,
};
use serde_json::Value;

use super::Repository;
use crate::{
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
	/// Validates and stores one record, returning it as persisted.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION))]
	pub async fn create(&self, attributes: Record) -> Result<Record> {
		let attributes = Self::stored_form(attributes);
		Self::check(&attributes, None)?;

		let stored = self
			.driver
			.insert_one(&Self::schema(), attributes)
			.await
			.map_err(RepositoryError::driver)?;

		Ok(EntityFormatter::for_model::<M>(&Projection::All).format(stored))
	}

	/// Stores every record or none. All records are validated before the
	/// single bulk insert is issued.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, batch = records.len()))]
	pub async fn create_many(&self, records: Vec<Value>) -> Result<u64> {
		if records.is_empty() {
			return Err(RepositoryError::invalid_argument("empty batch"));
		}

		let records = records
			.into_iter()
			.enumerate()
			.map(|(i, v)| match v {
				Value::Object(record) => Ok(Self::stored_form(record)),
				other => Err(RepositoryError::invalid_argument(format!(
					"batch element {i} is not a record: {other}"
				))),
			})
			.collect::<Result<Vec<Record>>>()?;

		for (i, record) in records.iter().enumerate() {
			Self::check(record, Some(i))?;
		}

		let inserted = self
			.driver
			.insert_many(&Self::schema(), records)
			.await
			.map_err(RepositoryError::driver)?;

		tracing::debug!(inserted, "batch stored");
		Ok(inserted)
	}

	/// Attributes keyed by storage name, so a caller-chosen application key
	/// lands on the primary key.
	fn stored_form(attributes: Record) -> Record {
		attributes
			.into_iter()
			.map(|(field, value)| (Self::storage_name(&field), value))
			.collect()
	}

	pub(super) fn check(record: &Record, index: Option<usize>) -> Result<()> {
		M::validate(record).map_err(|source| {
			tracing::warn!(
				collection = M::COLLECTION,
				index,
				error = %source,
				"record rejected"
			);
			RepositoryError::Validation {
				collection: M::COLLECTION,
				index,
				source,
			}
		})
	}
}
