use std::{
	collections::HashSet,
	fmt,
	marker::PhantomData,
};

use repoxo_traits::{
	is_identifier,
	FilterExpression,
	FindQuery,
	Model,
	Projection,
	Record,
	Relation,
	Schema,
	SortDirection,
	SortOrder,
	StorageDriver,
};
use serde_json::Value;
use smallvec::SmallVec;

use crate::{
	config::RepositoryConfig,
	criteria::{
		normalize,
		Criteria,
	},
	error::{
		RepositoryError,
		Result,
	},
	format::EntityFormatter,
	pagination::Page,
};

mod delete;
mod insert;
mod read;
mod search;
mod update;

/// Requested ordering, as given by the caller. Directions are validated
/// when applied; an empty spec keeps the current order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderSpec(pub Vec<(String, String)>);

impl<F, D> From<(F, D)> for OrderSpec
where
	F: Into<String>,
	D: Into<String>,
{
	fn from((field, dir): (F, D)) -> Self {
		Self(vec![(field.into(), dir.into())])
	}
}

impl<F, D> From<Vec<(F, D)>> for OrderSpec
where
	F: Into<String>,
	D: Into<String>,
{
	fn from(v: Vec<(F, D)>) -> Self {
		Self(v.into_iter().map(|(f, d)| (f.into(), d.into())).collect())
	}
}

impl<F, D, const N: usize> From<[(F, D); N]> for OrderSpec
where
	F: Into<String>,
	D: Into<String>,
{
	fn from(v: [(F, D); N]) -> Self {
		Self::from(Vec::from(v))
	}
}

impl<T: Into<OrderSpec>> From<Option<T>> for OrderSpec {
	fn from(v: Option<T>) -> Self {
		v.map(Into::into).unwrap_or_default()
	}
}

/// Per-repository read settings mutated by the fluent setters.
#[derive(Debug, Clone, PartialEq)]
pub struct QueryConfig {
	pub projection: Projection,
	pub relations:  Vec<&'static Relation>,
	/// `None` sorts by primary key in the configured default direction.
	pub order:      Option<SortOrder>,
	pub limit:      u64,
	pub offset:     u64,
	pub page:       u64,
	pub paginate:   bool,
}

impl QueryConfig {
	pub fn new(config: &RepositoryConfig) -> Self {
		Self {
			projection: Projection::All,
			relations:  Vec::new(),
			order:      None,
			limit:      config.default_limit,
			offset:     0,
			page:       1,
			paginate:   true,
		}
	}

	pub fn set_relations<M, I, S>(&mut self, names: I) -> Result<()>
	where
		M: Model,
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let mut seen = HashSet::new();
		let mut relations = Vec::new();

		for name in names {
			let name = name.as_ref().trim();
			if name.is_empty() {
				return Err(RepositoryError::invalid_argument("empty relation name"));
			}
			if !seen.insert(name.to_string()) {
				return Err(RepositoryError::invalid_argument(format!(
					"relation `{name}` requested twice"
				)));
			}
			let relation = M::relation(name).ok_or_else(|| {
				RepositoryError::invalid_argument(format!(
					"`{}` has no relation `{name}`",
					M::COLLECTION
				))
			})?;
			relations.push(relation);
		}

		self.relations = relations;
		Ok(())
	}

	pub fn set_columns<I, S>(&mut self, names: I) -> Result<()>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		let names: Vec<String> =
			names.into_iter().map(|n| n.as_ref().trim().to_string()).collect();

		if names.is_empty() {
			return Err(RepositoryError::invalid_argument("empty column list"));
		}
		if names.len() == 1 && names[0] == "*" {
			self.projection = Projection::All;
			return Ok(());
		}
		if let Some(bad) = names.iter().find(|n| !is_identifier(n)) {
			return Err(RepositoryError::invalid_argument(format!(
				"`{bad}` is not a valid column name"
			)));
		}

		self.projection = Projection::Columns(names);
		Ok(())
	}

	pub fn set_offset(&mut self, offset: i64) -> Result<()> {
		self.offset = u64::try_from(offset).map_err(|_| {
			RepositoryError::invalid_argument(format!("offset must be >= 0, got {offset}"))
		})?;
		Ok(())
	}

	pub fn set_limit(&mut self, limit: i64) -> Result<()> {
		self.limit = positive(limit, "limit")?;
		Ok(())
	}

	pub fn set_page(&mut self, page: i64) -> Result<()> {
		self.page = positive(page, "page")?;
		Ok(())
	}

	pub fn set_order(&mut self, spec: OrderSpec) -> Result<()> {
		if spec.0.is_empty() {
			return Ok(());
		}

		let mut order = Vec::with_capacity(spec.0.len());
		for (field, dir) in spec.0 {
			let field = field.trim();
			if !is_identifier(field) {
				return Err(RepositoryError::invalid_argument(format!(
					"`{field}` is not a valid sort field"
				)));
			}
			let dir: SortDirection = dir
				.parse()
				.map_err(|e| RepositoryError::invalid_argument(format!("{e}")))?;
			order.push((field.to_string(), dir));
		}

		self.order = Some(SortOrder(order));
		Ok(())
	}
}

fn positive(n: i64, what: &str) -> Result<u64> {
	match u64::try_from(n) {
		Ok(n) if n >= 1 => Ok(n),
		_ => Err(RepositoryError::invalid_argument(format!(
			"{what} must be >= 1, got {n}"
		))),
	}
}

/// Result of a multi-record find.
#[derive(Debug, Clone, PartialEq)]
pub enum Listing {
	Paged(Page<Record>),
	All(Vec<Record>),
}

impl Listing {
	pub fn items(&self) -> &[Record] {
		match self {
			Listing::Paged(p) => &p.items,
			Listing::All(xs) => xs,
		}
	}

	pub fn into_items(self) -> Vec<Record> {
		match self {
			Listing::Paged(p) => p.items,
			Listing::All(xs) => xs,
		}
	}

	pub fn page(&self) -> Option<&Page<Record>> {
		match self {
			Listing::Paged(p) => Some(p),
			Listing::All(_) => None,
		}
	}

	pub fn len(&self) -> usize {
		self.items().len()
	}

	pub fn is_empty(&self) -> bool {
		self.items().is_empty()
	}
}

/// Criteria-driven access to the `M` collection of a storage driver.
///
/// ```ignore
/// let mut posts = Repository::<Post, _>::new(store);
/// posts.with_columns(["id", "title"])?.with_order(("title", "asc"))?;
/// let page = posts.find_many_by("status", "draft", "=").await?;
/// ```
pub struct Repository<M, D> {
	driver: D,
	config: RepositoryConfig,
	query:  QueryConfig,
	model:  PhantomData<fn() -> M>,
}

impl<M: Model, D> fmt::Debug for Repository<M, D> {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Repository")
			.field("collection", &M::COLLECTION)
			.field("config", &self.config)
			.field("query", &self.query)
			.finish_non_exhaustive()
	}
}

impl<M, D> Repository<M, D>
where
	M: Model,
	D: StorageDriver,
{
	pub fn new(driver: D) -> Self {
		Self::with_config(driver, RepositoryConfig::default())
	}

	pub fn with_config(driver: D, config: RepositoryConfig) -> Self {
		Self {
			query: QueryConfig::new(&config),
			driver,
			config,
			model: PhantomData,
		}
	}

	pub fn driver(&self) -> &D {
		&self.driver
	}

	pub fn config(&self) -> &RepositoryConfig {
		&self.config
	}

	pub fn query_config(&self) -> &QueryConfig {
		&self.query
	}

	pub fn with_relations<I, S>(&mut self, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.query.set_relations::<M, _, _>(names)?;
		Ok(self)
	}

	/// `["*"]` selects every column.
	pub fn with_columns<I, S>(&mut self, names: I) -> Result<&mut Self>
	where
		I: IntoIterator<Item = S>,
		S: AsRef<str>,
	{
		self.query.set_columns(names)?;
		Ok(self)
	}

	/// Only applies to unpaginated finds; pages are addressed by number.
	pub fn with_offset(&mut self, offset: i64) -> Result<&mut Self> {
		self.query.set_offset(offset)?;
		Ok(self)
	}

	/// Page size when paginating, row cap otherwise.
	pub fn with_limit(&mut self, limit: i64) -> Result<&mut Self> {
		self.query.set_limit(limit)?;
		Ok(self)
	}

	pub fn with_page(&mut self, page: i64) -> Result<&mut Self> {
		self.query.set_page(page)?;
		Ok(self)
	}

	pub fn with_order(&mut self, spec: impl Into<OrderSpec>) -> Result<&mut Self> {
		self.query.set_order(spec.into())?;
		Ok(self)
	}

	pub fn with_pagination(&mut self, enabled: bool) -> Result<&mut Self> {
		self.query.paginate = enabled;
		Ok(self)
	}

	fn schema() -> Schema {
		Schema::of::<M>()
	}

	fn storage_name(field: &str) -> String {
		M::storage_field(field).to_string()
	}

	/// Normalized criteria with application-key references moved onto the
	/// primary key.
	fn filter(criteria: impl Into<Criteria>) -> Result<FilterExpression> {
		Ok(normalize(criteria)?.rename_fields(&Self::storage_name))
	}

	fn id_filter(id: Value) -> FilterExpression {
		FilterExpression::matches(M::PRIMARY_KEY, id)
	}

	fn ids_filter(ids: Vec<Value>) -> FilterExpression {
		FilterExpression::is_in(M::PRIMARY_KEY, ids)
	}

	/// The driver-side read for `q`: storage column names, relation keys
	/// added to explicit projections, default primary-key ordering.
	fn find_query(&self, q: &QueryConfig, filter: Option<FilterExpression>) -> FindQuery {
		let mut projection = match &q.projection {
			Projection::All => Projection::All,
			Projection::Columns(cols) => {
				Projection::Columns(cols.iter().map(|c| Self::storage_name(c)).collect())
			}
		};
		for relation in &q.relations {
			projection.ensure(relation.local_key);
		}

		let order = match &q.order {
			Some(order) => SortOrder(
				order
					.0
					.iter()
					.map(|(f, d)| (Self::storage_name(f), *d))
					.collect(),
			),
			None => SortOrder::by(M::PRIMARY_KEY, self.config.default_direction),
		};

		FindQuery {
			filter,
			projection,
			order,
			limit: Some(q.limit),
			offset: 0,
		}
	}

	/// Relation keys that were fetched only to resolve relations. A primary
	/// key stored under another name is left to the formatter.
	fn helper_columns(q: &QueryConfig) -> SmallVec<[&'static str; 4]> {
		let mut extra = SmallVec::new();
		for relation in &q.relations {
			let key = relation.local_key;
			if key == M::PRIMARY_KEY && M::PRIMARY_KEY != M::APPLICATION_KEY {
				continue;
			}
			if !q.projection.includes(key) && !extra.contains(&key) {
				extra.push(key);
			}
		}
		extra
	}

	/// Eager-loads, strips helper columns and formats.
	async fn finish(&self, q: &QueryConfig, mut records: Vec<Record>) -> Result<Vec<Record>> {
		if !q.relations.is_empty() && !records.is_empty() {
			let relations: Vec<Relation> = q.relations.iter().map(|r| **r).collect();
			self.driver
				.attach_relations(&mut records, &relations)
				.await
				.map_err(RepositoryError::driver)?;

			let extra = Self::helper_columns(q);
			if !extra.is_empty() {
				for record in &mut records {
					for key in &extra {
						record.remove(*key);
					}
				}
			}
		}

		Ok(EntityFormatter::for_model::<M>(&q.projection).format_many(records))
	}

	/// Raw stored record matching `filter`, for write paths.
	async fn locate(&self, filter: &FilterExpression) -> Result<Record> {
		let query = FindQuery {
			filter: Some(filter.clone()),
			limit: Some(1),
			order: SortOrder::by(M::PRIMARY_KEY, self.config.default_direction),
			..Default::default()
		};

		self.driver
			.find(&Self::schema(), &query)
			.await
			.map_err(RepositoryError::driver)?
			.into_iter()
			.next()
			.ok_or_else(|| RepositoryError::NotFound {
				collection: M::COLLECTION,
				key:        filter.to_string(),
			})
	}

	fn primary_key_of(record: &Record) -> Result<Value> {
		record.get(M::PRIMARY_KEY).cloned().ok_or_else(|| {
			RepositoryError::invalid_argument(format!(
				"stored `{}` record has no `{}`",
				M::COLLECTION,
				M::PRIMARY_KEY
			))
		})
	}
}
