#![forbid(unsafe_code)]

mod driver;
mod filter;
mod model;
mod object_id;
mod query;

pub use driver::*;
pub use filter::*;
pub use model::*;
pub use object_id::*;
pub use query::*;
