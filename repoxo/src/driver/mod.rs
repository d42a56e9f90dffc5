mod memory;
pub mod sql;

pub use memory::{
	MemoryStore,
	MemoryStoreError,
};
pub use sql::{
	PgDriver,
	PgDriverError,
};
