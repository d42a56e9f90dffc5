use claims::{
	assert_matches,
	assert_some,
};
use repoxo::{
	driver::MemoryStore,
	RepositoryError,
	SearchParams,
};

use crate::helpers::{
	posts,
	seed_posts,
	titles,
	RecordingDriver,
};

#[tokio::test]
async fn search_matches_the_equivalent_criteria() {
	let store = MemoryStore::new();
	seed_posts(&store, 6).await;
	let repo = posts(&store);

	let searched = repo
		.search_by_criteria(&SearchParams::default().search("=:title:post 2,like:text:wor"))
		.await
		.unwrap();
	let direct = repo
		.find_many_by_criteria(vec![("=", "title", "post 2"), ("like", "text", "wor")])
		.await
		.unwrap();

	assert_eq!(searched, direct);
	assert_eq!(titles(searched.items()), vec!["post 2"]);
}

#[tokio::test]
async fn search_and_criteria_send_the_same_filter() {
	let driver = RecordingDriver::default();
	let repo: repoxo::Repository<crate::helpers::Post, _> = repoxo::Repository::new(driver.clone());

	repo.search_by_criteria(&SearchParams::default().search("=:title:hello,like:text:wor"))
		.await
		.unwrap();
	let searched = driver.take();

	repo.find_many_by_criteria(vec![("=", "title", "hello"), ("like", "text", "wor")])
		.await
		.unwrap();
	assert_eq!(searched, driver.take());
}

#[tokio::test]
async fn overrides_apply_to_one_call_only() {
	let store = MemoryStore::new();
	seed_posts(&store, 12).await;
	let repo = posts(&store);

	let params = SearchParams::default()
		.search(">=:views:4")
		.fields("id,title")
		.page(2)
		.per_page(3);
	let listing = repo.search_by_criteria(&params).await.unwrap();
	let page = assert_some!(listing.page());

	assert_eq!(page.meta.total_count, 8);
	assert_eq!(page.meta.current_page, 2);
	assert_eq!(page.meta.per_page, 3);
	assert_eq!(titles(&page.items), vec!["post 8", "post 7", "post 6"]);
	for item in &page.items {
		let mut keys: Vec<&str> = item.keys().map(String::as_str).collect();
		keys.sort_unstable();
		assert_eq!(keys, vec!["id", "title"]);
	}

	let listing = repo.find_all().await.unwrap();
	let page = assert_some!(listing.page());
	assert_eq!(page.meta.per_page, 10);
	assert!(page.items[0].contains_key("text"));
}

#[tokio::test]
async fn without_a_filter_search_lists_everything() {
	let store = MemoryStore::new();
	seed_posts(&store, 3).await;

	let listing = posts(&store).search_by_criteria(&SearchParams::default()).await.unwrap();
	assert_eq!(listing.len(), 3);
}

#[tokio::test]
async fn list_values_and_typed_literals() {
	let store = MemoryStore::new();
	seed_posts(&store, 6).await;
	let repo = posts(&store);

	let listing = repo
		.search_by_criteria(&SearchParams::default().search("in:views:1|3|5,not like:title:post 5"))
		.await
		.unwrap();
	assert_eq!(titles(listing.items()), vec!["post 3", "post 1"]);
}

#[tokio::test]
async fn malformed_searches_are_rejected() {
	let store = MemoryStore::new();
	let repo = posts(&store);

	for bad in ["title:hello", "=:title", "~:title:x", "=:ti tle:x"] {
		assert_matches!(
			repo.search_by_criteria(&SearchParams::default().search(bad)).await,
			Err(RepositoryError::InvalidCriteria(_))
		);
	}
	assert_matches!(
		repo.search_by_criteria(&SearchParams::default().with("author")).await,
		Err(RepositoryError::InvalidArgument(_))
	);
	assert_matches!(
		repo.search_by_criteria(&SearchParams::default().per_page(0)).await,
		Err(RepositoryError::InvalidArgument(_))
	);
}
