use core::fmt;
use std::fmt::{
	Display,
	Formatter,
};

use repoxo_traits::Projection;

/// Leading clause of a statement; everything after the table name is
/// appended by the writer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BuildType<'a> {
	/// Rows as `jsonb` objects under the `record` column.
	Select(&'a Projection),
	Count,
	Insert,
	Update,
	Delete,
}

pub struct SqlHead<'a> {
	build: BuildType<'a>,
	table: &'a str,
}

impl<'a> SqlHead<'a> {
	/// `table` must already be a checked identifier.
	pub fn new(table: &'a str, build: BuildType<'a>) -> Self {
		Self { build, table }
	}
}

impl Display for SqlHead<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match &self.build {
			BuildType::Select(Projection::All) => {
				write!(f, "SELECT to_jsonb(t) AS record FROM \"{}\" AS t", self.table)
			}
			BuildType::Select(Projection::Columns(cols)) => {
				f.write_str("SELECT jsonb_build_object(")?;
				for (i, c) in cols.iter().enumerate() {
					if i > 0 {
						f.write_str(", ")?;
					}
					write!(f, "'{c}', t.\"{c}\"")?;
				}
				write!(f, ") AS record FROM \"{}\" AS t", self.table)
			}
			BuildType::Count => {
				write!(f, "SELECT COUNT(*) FROM \"{}\" AS t", self.table)
			}
			BuildType::Insert => write!(f, "INSERT INTO \"{}\" AS t", self.table),
			BuildType::Update => write!(f, "UPDATE \"{}\" AS t", self.table),
			BuildType::Delete => write!(f, "DELETE FROM \"{}\" AS t", self.table),
		}
	}
}
