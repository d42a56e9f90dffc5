#![forbid(unsafe_code)]
extern crate self as repoxo;

pub use repoxo_macros::*;
pub use repoxo_traits::*;

pub mod prelude {
	pub use super::{
		criteria::Criterion,
		driver::{
			MemoryStore,
			PgDriver,
		},
		error::{
			RepositoryError,
			Result,
		},
		repository::{
			Listing,
			Repository,
		},
		search::SearchParams,
		Model,
		Record,
		StorageDriver,
	};
}

pub mod config;
pub mod criteria;
pub mod driver;
pub mod error;
pub mod format;
pub mod pagination;
pub mod repository;
pub mod search;

pub use config::RepositoryConfig;
pub use criteria::{
	normalize,
	Criteria,
	Criterion,
};
pub use error::{
	RepositoryError,
	Result,
};
pub use format::EntityFormatter;
pub use pagination::{
	paginate,
	Page,
	PageLinks,
	PageMeta,
};
pub use repository::{
	Listing,
	OrderSpec,
	QueryConfig,
	Repository,
};
pub use search::SearchParams;
