use repoxo_traits::{
	parse_oid,
	Model,
	Projection,
	Record,
};
use serde_json::Value;

/// Rewrites stored records into their caller-facing shape.
#[derive(Debug, Clone, Copy)]
pub struct EntityFormatter<'a> {
	primary_key:     &'a str,
	application_key: &'a str,
	projection:      &'a Projection,
}

impl<'a> EntityFormatter<'a> {
	pub fn new(
		primary_key: &'a str,
		application_key: &'a str,
		projection: &'a Projection,
	) -> Self {
		Self {
			primary_key,
			application_key,
			projection,
		}
	}

	pub fn for_model<M: Model>(projection: &'a Projection) -> Self {
		Self::new(M::PRIMARY_KEY, M::APPLICATION_KEY, projection)
	}

	/// Moves the primary key to the application key, or drops it when the
	/// application key was not requested.
	pub fn format(&self, mut record: Record) -> Record {
		if self.primary_key == self.application_key {
			return record;
		}

		let Some(pk) = record.remove(self.primary_key) else {
			return record;
		};

		if self.projection.includes(self.application_key) {
			let id = match parse_oid(&pk) {
				Some(oid) => Value::String(oid.to_hex()),
				None => pk,
			};
			record.insert(self.application_key.to_string(), id);
		}

		record
	}

	pub fn format_many(&self, records: Vec<Record>) -> Vec<Record> {
		records.into_iter().map(|r| self.format(r)).collect()
	}
}
