use serde_json::{
	Map,
	Value,
};
use thiserror::Error;

/// A stored entity as the drivers see it: attribute name to JSON value.
pub type Record = Map<String, Value>;

pub const DEFAULT_APPLICATION_KEY: &str = "id";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationKind {
	One,
	Many,
}

/// Eager-loadable association: related records in `target` whose
/// `foreign_key` equals this record's `local_key`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Relation {
	pub name:        &'static str,
	pub target:      &'static str,
	pub local_key:   &'static str,
	pub foreign_key: &'static str,
	pub kind:        RelationKind,
}

impl Relation {
	pub const fn has_many(
		name: &'static str,
		target: &'static str,
		local_key: &'static str,
		foreign_key: &'static str,
	) -> Self {
		Self {
			name,
			target,
			local_key,
			foreign_key,
			kind: RelationKind::Many,
		}
	}

	pub const fn has_one(
		name: &'static str,
		target: &'static str,
		local_key: &'static str,
		foreign_key: &'static str,
	) -> Self {
		Self {
			name,
			target,
			local_key,
			foreign_key,
			kind: RelationKind::One,
		}
	}
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}{message}", field_prefix(.field))]
pub struct ValidationError {
	pub field:   Option<String>,
	pub message: String,
}

fn field_prefix(field: &Option<String>) -> String {
	match field {
		Some(f) => format!("invalid `{f}`: "),
		None => String::new(),
	}
}

impl ValidationError {
	pub fn new(message: impl Into<String>) -> Self {
		Self {
			field:   None,
			message: message.into(),
		}
	}

	pub fn field(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field:   Some(field.into()),
			message: message.into(),
		}
	}
}

/// Storage-level description of an entity type.
///
/// Usually derived with `#[derive(Model)]`.
pub trait Model: Send + Sync + 'static {
	const COLLECTION: &'static str;

	/// Key the store uses (`_id` for document stores).
	const PRIMARY_KEY: &'static str;

	/// Key exposed to callers after formatting.
	const APPLICATION_KEY: &'static str = DEFAULT_APPLICATION_KEY;

	/// Column list used for bulk inserts; empty means "whatever the records
	/// carry".
	const ATTRIBUTES: &'static [&'static str] = &[];

	const RELATIONS: &'static [Relation] = &[];

	fn validate(_record: &Record) -> Result<(), ValidationError> {
		Ok(())
	}

	fn relation(name: &str) -> Option<&'static Relation> {
		Self::RELATIONS.iter().find(|r| r.name == name)
	}

	/// Maps the application key onto the primary key, everything else is
	/// returned as is.
	fn storage_field(field: &str) -> &str {
		if field == Self::APPLICATION_KEY {
			Self::PRIMARY_KEY
		} else {
			field
		}
	}
}

/// The subset of [`Model`] a driver needs, in object-safe form.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Schema {
	pub collection:  &'static str,
	pub primary_key: &'static str,
	pub attributes:  &'static [&'static str],
}

impl Schema {
	pub fn of<M: Model>() -> Self {
		Self {
			collection:  M::COLLECTION,
			primary_key: M::PRIMARY_KEY,
			attributes:  M::ATTRIBUTES,
		}
	}

	/// Schema of a relation target, keyed by the relation's foreign key.
	pub fn for_relation(relation: &Relation) -> Self {
		Self {
			collection:  relation.target,
			primary_key: relation.foreign_key,
			attributes:  &[],
		}
	}
}

/// Field names must be plain identifiers: they end up quoted in SQL and as
/// document keys.
pub fn is_identifier(name: &str) -> bool {
	let mut chars = name.chars();
	match chars.next() {
		Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
		_ => return false,
	}
	chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
