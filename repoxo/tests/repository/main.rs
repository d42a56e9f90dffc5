#[cfg(feature = "db-tests")]
mod db;

mod derive;
mod helpers;
mod paging;
mod relations;
mod search;
