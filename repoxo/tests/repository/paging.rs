use claims::{
	assert_matches,
	assert_none,
	assert_some,
};
use repoxo::{
	driver::MemoryStore,
	Listing,
	Repository,
	RepositoryConfig,
	RepositoryError,
};

use crate::helpers::{
	posts,
	seed_posts,
	titles,
	Post,
};

#[tokio::test]
async fn find_all_returns_the_first_page_by_default() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;

	let listing = posts(&store).find_all().await.unwrap();
	let page = assert_some!(listing.page());

	assert_eq!(page.items.len(), 10);
	assert_eq!(page.meta.total_count, 12);
	assert_eq!(page.meta.current_page, 1);
	assert_eq!(page.meta.page_count, 2);
	assert_eq!(page.meta.per_page, 10);
	// newest first
	assert_eq!(titles(&page.items)[0], "post 11");
}

#[tokio::test]
async fn last_page_holds_the_remainder() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;

	let mut repo = posts(&store);
	repo.with_page(2).unwrap();
	let listing = repo.find_all().await.unwrap();
	let page = assert_some!(listing.page());

	assert_eq!(titles(&page.items), vec!["post 1", "post 0"]);
	assert_eq!(page.links.current.href, "?page=2&per-page=10");
	assert_some!(page.links.prev.as_ref());
	assert_none!(page.links.next.as_ref());
}

#[tokio::test]
async fn page_count_rounds_up() {
	let store = MemoryStore::new();
	seed_posts(&store, 25).await;
	let listing = posts(&store).find_all().await.unwrap();
	assert_eq!(assert_some!(listing.page()).meta.page_count, 3);

	let store = MemoryStore::new();
	seed_posts(&store, 20).await;
	let listing = posts(&store).find_all().await.unwrap();
	assert_eq!(assert_some!(listing.page()).meta.page_count, 2);
}

#[tokio::test]
async fn limit_caps_consecutive_finds() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;

	let mut repo = posts(&store);
	repo.with_limit(5).unwrap();

	assert_eq!(repo.find_all().await.unwrap().len(), 5);
	assert_eq!(repo.find_many_by("views", 0, ">=").await.unwrap().len(), 5);
	assert_eq!(repo.find_many_by_criteria(("like", "title", "post")).await.unwrap().len(), 5);
}

#[tokio::test]
async fn out_of_range_settings_are_rejected() {
	let store = MemoryStore::new();
	let mut repo = posts(&store);

	assert_matches!(repo.with_limit(0), Err(RepositoryError::InvalidArgument(_)));
	assert_matches!(repo.with_offset(-1), Err(RepositoryError::InvalidArgument(_)));
	assert_matches!(repo.with_page(0), Err(RepositoryError::InvalidArgument(_)));
	assert_matches!(
		repo.with_order(("title", "upwards")),
		Err(RepositoryError::InvalidArgument(_))
	);
	assert_eq!(repo.query_config().limit, 10);
}

#[tokio::test]
async fn unpaginated_finds_honour_offset_and_order() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;

	let mut repo = posts(&store);
	repo.with_pagination(false)
		.unwrap()
		.with_order(("views", "asc"))
		.unwrap()
		.with_limit(3)
		.unwrap()
		.with_offset(2)
		.unwrap();

	let listing = repo.find_all().await.unwrap();
	assert_matches!(listing, Listing::All(_));
	assert_eq!(titles(listing.items()), vec!["post 2", "post 3", "post 4"]);

	// keeps the previous order
	repo.with_order(None::<(&str, &str)>).unwrap();
	let listing = repo.find_all().await.unwrap();
	assert_eq!(titles(listing.items())[0], "post 2");
}

#[tokio::test]
async fn configuration_sets_defaults() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;

	let config = RepositoryConfig {
		default_limit: 4,
		link_base: "/posts".into(),
		..Default::default()
	};
	let repo: Repository<Post, _> = Repository::with_config(store.clone(), config);

	let listing = repo.find_all().await.unwrap();
	let page = assert_some!(listing.page());
	assert_eq!(page.items.len(), 4);
	assert_eq!(page.meta.page_count, 3);
	assert_eq!(page.links.last.href, "/posts?page=3&per-page=4");
}

#[tokio::test]
async fn empty_collections_page_cleanly() {
	let store = MemoryStore::new();
	let listing = posts(&store).find_all().await.unwrap();
	let page = assert_some!(listing.page());

	assert!(page.items.is_empty());
	assert_eq!(page.meta.total_count, 0);
	assert_eq!(page.meta.page_count, 0);
	assert_eq!(page.links.last.href, "?page=1&per-page=10");
}
