use repoxo::{
	Model,
	Relation,
	RelationKind,
	Schema,
};
use serde_json::json;

use crate::helpers::{
	record,
	Comment,
	Post,
};

#[allow(dead_code)]
#[derive(Model)]
pub struct BlogEntry {
	#[primary_key]
	pub entry_id: i64,
	pub headline: String,
	#[repoxo(skip)]
	pub cached:   Option<String>,
}

#[test]
fn attributes_become_constants() {
	assert_eq!(Post::COLLECTION, "post");
	assert_eq!(Post::PRIMARY_KEY, "_id");
	assert_eq!(Post::APPLICATION_KEY, "id");
	assert_eq!(Post::ATTRIBUTES, &["title", "text", "views"]);
	assert_eq!(Post::RELATIONS, &[Relation::has_many("comments", "comment", "_id", "post_id")]);
}

#[test]
fn collection_defaults_to_snake_case() {
	assert_eq!(Comment::COLLECTION, "comment");
	assert_eq!(BlogEntry::COLLECTION, "blog_entry");
}

#[test]
fn primary_key_attribute_and_skip() {
	assert_eq!(BlogEntry::PRIMARY_KEY, "entry_id");
	assert!(!BlogEntry::ATTRIBUTES.contains(&"cached"));
	assert!(BlogEntry::ATTRIBUTES.contains(&"headline"));
	assert_eq!(BlogEntry::storage_field("id"), "entry_id");
	assert_eq!(BlogEntry::storage_field("headline"), "headline");
}

#[test]
fn belongs_to_points_at_the_owner() {
	let post = Comment::relation("post").unwrap();
	assert_eq!(post.kind, RelationKind::One);
	assert_eq!((post.local_key, post.foreign_key), ("post_id", "_id"));
	assert!(Comment::relation("comments").is_none());
}

#[test]
fn validation_hook_is_wired() {
	assert!(Post::validate(&record(json!({"title": "ok"}))).is_ok());
	assert!(Post::validate(&record(json!({"title": ""}))).is_err());
	assert!(Comment::validate(&record(json!({}))).is_ok());
}

#[test]
fn schema_mirrors_the_model() {
	let schema = Schema::of::<Post>();
	assert_eq!(schema.collection, "post");
	assert_eq!(schema.primary_key, "_id");
	assert_eq!(schema.attributes, Post::ATTRIBUTES);
}
