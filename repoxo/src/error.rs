use repoxo_traits::ValidationError;
use thiserror::Error;

pub type Result<T, E = RepositoryError> = std::result::Result<T, E>;

#[derive(Debug, Error)]
pub enum RepositoryError {
	/// Malformed query configuration; raised before the driver is called.
	#[error("invalid argument: {0}")]
	InvalidArgument(String),

	/// Malformed criterion or search token.
	#[error("invalid criteria: {0}")]
	InvalidCriteria(String),

	/// The target of an update, delete or counter change does not exist.
	#[error("no `{collection}` record matches {key}")]
	NotFound {
		collection: &'static str,
		key:        String,
	},

	/// A record was rejected by the model's validation hook. `index` is the
	/// position within a batch insert.
	#[error("{collection} record rejected{}: {source}", index_suffix(.index))]
	Validation {
		collection: &'static str,
		index:      Option<usize>,
		#[source]
		source:     ValidationError,
	},

	#[error("configuration could not be loaded")]
	Config(#[source] Box<figment::Error>),

	#[error("storage driver failed")]
	Driver(#[source] Box<dyn std::error::Error + Send + Sync + 'static>),
}

fn index_suffix(index: &Option<usize>) -> String {
	match index {
		Some(i) => format!(" at index {i}"),
		None => String::new(),
	}
}

impl RepositoryError {
	pub fn invalid_argument(msg: impl Into<String>) -> Self {
		Self::InvalidArgument(msg.into())
	}

	pub fn invalid_criteria(msg: impl Into<String>) -> Self {
		Self::InvalidCriteria(msg.into())
	}

	pub fn driver<E>(err: E) -> Self
	where
		E: std::error::Error + Send + Sync + 'static,
	{
		Self::Driver(Box::new(err))
	}

	/// The driver's own error, if this is a driver failure of type `E`.
	pub fn driver_error<E>(&self) -> Option<&E>
	where
		E: std::error::Error + 'static,
	{
		match self {
			Self::Driver(inner) => inner.downcast_ref::<E>(),
			_ => None,
		}
	}
}
