use claims::{
	assert_matches,
	assert_some,
};
use repoxo::{
	driver::MemoryStore,
	Model,
	Record,
	Repository,
	RepositoryError,
};
use serde_json::{
	json,
	Value,
};

use crate::helpers::{
	posts,
	record,
	seed_posts,
	Comment,
};

async fn seed_comments(store: &MemoryStore, post_id: &str, bodies: &[&str]) {
	let repo: Repository<Comment, _> = Repository::new(store.clone());
	for body in bodies {
		repo.create(record(json!({"post_id": post_id, "body": body})))
			.await
			.unwrap();
	}
}

fn bodies(v: &Value) -> Vec<&str> {
	let mut out: Vec<&str> = v
		.as_array()
		.map(|xs| xs.iter().filter_map(|c| c["body"].as_str()).collect())
		.unwrap_or_default();
	out.sort_unstable();
	out
}

fn by_id<'a>(items: &'a [Record], id: &str) -> &'a Record {
	items.iter().find(|p| p["id"] == json!(id)).unwrap()
}

#[tokio::test]
async fn has_many_attaches_a_list() {
	let store = MemoryStore::new();
	let ids = seed_posts(&store, 2).await;
	seed_comments(&store, &ids[0], &["first", "second"]).await;

	let mut repo = posts(&store);
	repo.with_relations(["comments"]).unwrap();
	let listing = repo.find_all().await.unwrap();

	let items = listing.items();
	assert_eq!(bodies(&by_id(items, &ids[0])["comments"]), vec!["first", "second"]);
	assert_eq!(by_id(items, &ids[1])["comments"], json!([]));
}

#[tokio::test]
async fn relation_keys_are_not_leaked_into_projections() {
	let store = MemoryStore::new();
	let ids = seed_posts(&store, 1).await;
	seed_comments(&store, &ids[0], &["only"]).await;

	let mut repo = posts(&store);
	repo.with_columns(["title"]).unwrap().with_relations(["comments"]).unwrap();
	let post = assert_some!(repo.find_one_by_id(ids[0].as_str()).await.unwrap());

	let mut keys: Vec<&str> = post.keys().map(String::as_str).collect();
	keys.sort_unstable();
	assert_eq!(keys, vec!["comments", "title"]);
	assert_eq!(bodies(&post["comments"]), vec!["only"]);
}

#[tokio::test]
async fn belongs_to_attaches_the_owner() {
	let store = MemoryStore::new();
	let ids = seed_posts(&store, 2).await;
	seed_comments(&store, &ids[1], &["hi"]).await;
	seed_comments(&store, "000000000000000000000000", &["orphan"]).await;

	let mut repo: Repository<Comment, _> = Repository::new(store.clone());
	repo.with_columns(["body"]).unwrap().with_relations(["post"]).unwrap();

	let hi = assert_some!(repo.find_one_by("body", "hi", "=").await.unwrap());
	assert_eq!(hi["post"]["title"], json!("post 1"));
	assert!(!hi.contains_key("post_id"));

	let orphan = assert_some!(repo.find_one_by("body", "orphan", "=").await.unwrap());
	assert_eq!(orphan["post"], Value::Null);
}

#[tokio::test]
async fn unknown_relations_are_rejected() {
	let store = MemoryStore::new();
	let mut repo = posts(&store);

	assert_matches!(
		repo.with_relations(["author"]),
		Err(RepositoryError::InvalidArgument(_))
	);
	assert!(repo.query_config().relations.is_empty());
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
#[repoxo(has_many(name = "books", target = "book", foreign_key = "author_id"))]
pub struct Author {
	#[primary_key]
	pub id:   i64,
	pub name: String,
}

#[allow(dead_code)]
#[derive(Debug, Clone, Model)]
pub struct Book {
	#[primary_key]
	pub id:        i64,
	pub author_id: i64,
	pub title:     String,
}

#[tokio::test]
async fn plain_primary_keys_are_not_leaked_into_projections() {
	let store = MemoryStore::new();
	let authors: Repository<Author, _> = Repository::new(store.clone());
	let books: Repository<Book, _> = Repository::new(store.clone());
	authors.create(record(json!({"id": 1, "name": "ursula"}))).await.unwrap();
	books
		.create_many(vec![
			json!({"id": 10, "author_id": 1, "title": "the dispossessed"}),
			json!({"id": 11, "author_id": 2, "title": "elsewhere"}),
		])
		.await
		.unwrap();

	let mut authors = authors;
	authors.with_columns(["name"]).unwrap().with_relations(["books"]).unwrap();
	let author = assert_some!(authors.find_one_by_id(1).await.unwrap());

	let mut keys: Vec<&str> = author.keys().map(String::as_str).collect();
	keys.sort_unstable();
	assert_eq!(keys, vec!["books", "name"]);
	assert_eq!(author["books"][0]["title"], json!("the dispossessed"));
	assert_eq!(author["books"].as_array().map(Vec::len), Some(1));

	authors.with_columns(["id", "name"]).unwrap();
	let author = assert_some!(authors.find_one_by_id(1).await.unwrap());
	assert_eq!(author["id"], json!(1));
}
