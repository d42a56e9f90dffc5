use repoxo_traits::{
	Model,
	StorageDriver,
};

use super::{
	Listing,
	Repository,
};
use crate::{
	error::Result,
	search::SearchParams,
};

impl<M, D> Repository<M, D>
where
	M: Model,
	D: StorageDriver,
{
	/// Runs a free-text search. `fields`, `with`, `page` and `perPage`
	/// override the repository settings for this call only.
	#[tracing::instrument(skip_all, fields(collection = M::COLLECTION, search = ?params.search))]
	pub async fn search_by_criteria(&self, params: &SearchParams) -> Result<Listing> {
		let criteria = params.criteria()?;

		let mut q = self.query.clone();
		if let Some(fields) = params.field_list() {
			q.set_columns(fields)?;
		}
		if let Some(relations) = params.relation_list() {
			q.set_relations::<M, _, _>(relations)?;
		}
		if let Some(page) = params.page {
			q.set_page(to_signed(page))?;
		}
		if let Some(per_page) = params.per_page {
			q.set_limit(to_signed(per_page))?;
		}

		let filter = criteria.map(Self::filter).transpose()?;
		self.list(&q, filter).await
	}
}

fn to_signed(n: u64) -> i64 {
	i64::try_from(n).unwrap_or(i64::MAX)
}
