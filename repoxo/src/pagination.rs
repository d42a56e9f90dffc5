use repoxo_traits::{
	FindQuery,
	Record,
	Schema,
	StorageDriver,
};
use serde::{
	Deserialize,
	Serialize,
};
use utoipa::ToSchema;

use crate::{
	config::RepositoryConfig,
	error::{
		RepositoryError,
		Result,
	},
};

/// `ceil(total / per_page)`; zero when there is nothing to page over.
pub fn page_count(total: u64, per_page: u64) -> u64 {
	if per_page == 0 {
		0
	} else {
		total.div_ceil(per_page)
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMeta {
	pub total_count:  u64,
	pub page_count:   u64,
	pub current_page: u64,
	pub per_page:     u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct Link {
	pub href: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
pub struct PageLinks {
	#[serde(rename = "self")]
	pub current: Link,
	pub first:   Link,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub prev:    Option<Link>,
	#[serde(default, skip_serializing_if = "Option::is_none")]
	pub next:    Option<Link>,
	pub last:    Link,
}

/// How navigation links are spelled.
#[derive(Debug, Clone, Copy)]
pub struct LinkTemplate<'a> {
	pub base:           &'a str,
	pub page_param:     &'a str,
	pub per_page_param: &'a str,
}

impl<'a> From<&'a RepositoryConfig> for LinkTemplate<'a> {
	fn from(c: &'a RepositoryConfig) -> Self {
		Self {
			base:           &c.link_base,
			page_param:     &c.page_param,
			per_page_param: &c.per_page_param,
		}
	}
}

impl LinkTemplate<'_> {
	pub fn href(&self, page: u64, per_page: u64) -> Link {
		let sep = if self.base.contains('?') { '&' } else { '?' };
		Link {
			href: format!(
				"{}{sep}{}={page}&{}={per_page}",
				self.base, self.page_param, self.per_page_param
			),
		}
	}

	pub fn links(&self, meta: &PageMeta) -> PageLinks {
		let last = meta.page_count.max(1);
		let at = |p: u64| self.href(p, meta.per_page);

		PageLinks {
			current: at(meta.current_page),
			first:   at(1),
			prev:    (meta.current_page > 1).then(|| at(meta.current_page - 1)),
			next:    (meta.current_page < meta.page_count)
				.then(|| at(meta.current_page + 1)),
			last:    at(last),
		}
	}
}

/// One page of results with its metadata and navigation links.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Page<T> {
	pub items: Vec<T>,
	#[serde(rename = "_meta")]
	pub meta:  PageMeta,
	#[serde(rename = "_links")]
	pub links: PageLinks,
}

impl<T> Page<T> {
	pub fn new(
		items: Vec<T>,
		total: u64,
		current_page: u64,
		per_page: u64,
		links: &LinkTemplate<'_>,
	) -> Self {
		let meta = PageMeta {
			total_count: total,
			page_count: page_count(total, per_page),
			current_page,
			per_page,
		};

		Self {
			items,
			links: links.links(&meta),
			meta,
		}
	}

	pub fn map<U>(self, f: impl FnOnce(Vec<T>) -> Vec<U>) -> Page<U> {
		Page {
			items: f(self.items),
			meta:  self.meta,
			links: self.links,
		}
	}

	pub fn total_count(&self) -> u64 {
		self.meta.total_count
	}
}

impl<T> From<Page<T>> for Vec<T> {
	fn from(page: Page<T>) -> Self {
		page.items
	}
}

/// Counts the matches of `query`, then fetches page `page` (1-based) of
/// `per_page` rows. The query's own limit and offset are replaced.
pub async fn paginate<D>(
	driver: &D,
	schema: &Schema,
	mut query: FindQuery,
	per_page: u64,
	page: u64,
	links: &LinkTemplate<'_>,
) -> Result<Page<Record>>
where
	D: StorageDriver + ?Sized,
{
	if per_page == 0 || page == 0 {
		return Err(RepositoryError::invalid_argument(
			"page and page size must be at least 1",
		));
	}

	let total = driver
		.count(schema, query.filter.as_ref())
		.await
		.map_err(RepositoryError::driver)?;

	query.limit = Some(per_page);
	query.offset = (page - 1).saturating_mul(per_page);

	let items = if query.offset >= total {
		Vec::new()
	} else {
		driver.find(schema, &query).await.map_err(RepositoryError::driver)?
	};

	tracing::debug!(
		collection = schema.collection,
		total,
		page,
		per_page,
		fetched = items.len(),
		"paginated"
	);

	Ok(Page::new(items, total, page, per_page, links))
}
