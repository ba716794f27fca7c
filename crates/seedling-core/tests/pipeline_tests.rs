mod common;

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use common::{doc, same_name_loader, write_fixture, FaultyClient};
use seedling_core::{
    BackupConfig, ClientError, ClientResult, DatabaseConfig, DocumentClient, ModelDefinition,
    ModelDescriptor, SeedConfig, SeederBuilder, SqliteClient, StageKind,
};
use serde_json::json;
use tempfile::TempDir;

/// Fixture directory with two users and one post.
fn create_test_environment() -> (TempDir, PathBuf) {
    let temp_dir = TempDir::new().expect("Failed to create temporary directory");
    let fixtures = temp_dir.path().join("fixtures");
    std::fs::create_dir(&fixtures).expect("Failed to create fixtures directory");
    write_fixture(
        &fixtures,
        "users.json",
        "User",
        &[json!({ "name": "ada" }), json!({ "name": "grace" })],
    );
    write_fixture(&fixtures, "posts.json", "Post", &[json!({ "title": "hello" })]);
    std::fs::write(fixtures.join("notes.txt"), "ignored").expect("Failed to write notes");
    (temp_dir, fixtures)
}

fn test_config(fixtures: &Path) -> SeedConfig {
    SeedConfig::new(DatabaseConfig::new("pipeline"), fixtures)
        .with_model(ModelDescriptor::new("User", "user.json"))
        .with_model(ModelDescriptor::new("Post", "post.json"))
}

#[tokio::test]
async fn test_complete_run() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new());
    client.inner.preload("User", vec![doc(json!({ "name": "stale" }))]);

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let result = seeder.run().await.expect("run should succeed");

    assert_eq!(result.database_uri, "mongodb://localhost:27017/pipeline");
    assert_eq!(result.cleared, vec!["User", "Post"]);
    assert_eq!(result.populated["User"], 2);
    assert_eq!(result.populated["Post"], 1);

    // Stale documents are gone, the connection was closed
    let users = client.inner.documents("User");
    assert_eq!(users.len(), 2);
    assert!(users.iter().all(|u| u["name"] != "stale"));
    assert!(!client.inner.is_connected());
    assert_eq!(client.disconnect_count(), 1);
}

#[tokio::test]
async fn test_unreachable_database_is_connect_error() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new().refusing_connections());

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.kind, StageKind::Connect);
    assert_eq!(err.code(), "connect");
    assert!(err.message.contains("mongodb://localhost:27017/pipeline"));
    assert!(client.inner.registered_models().is_empty());
}

#[tokio::test]
async fn test_models_not_cleared_keep_documents() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new());
    client.inner.preload("Post", vec![doc(json!({ "title": "old" }))]);

    let config = SeedConfig::new(DatabaseConfig::new("pipeline"), &fixtures)
        .with_model(ModelDescriptor::new("User", "user.json"))
        .with_model(ModelDescriptor::new("Post", "post.json").with_clear(false));
    let seeder = SeederBuilder::new(config)
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let result = seeder.run().await.expect("run should succeed");
    assert_eq!(result.cleared, vec!["User"]);
    assert_eq!(result.populated["Post"], 1);
    assert_eq!(client.inner.documents("Post").len(), 2);
}

#[tokio::test]
async fn test_populate_failure_fails_run_and_closes_connection() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new().failing_insert("User", 2));

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.code(), "populate");
    assert!(err.message.contains("User"));

    // Earlier inserts persist; the run still failed
    assert_eq!(client.inner.documents("Post").len(), 1);
    assert_eq!(client.inner.documents("User").len(), 1);
    assert!(!client.inner.is_connected());
}

#[tokio::test]
async fn test_fixture_for_unknown_model_is_model_error() {
    let (_temp_dir, fixtures) = create_test_environment();
    write_fixture(&fixtures, "comments.json", "Comment", &[json!({ "body": "x" })]);
    write_fixture(&fixtures, "tags.json", "Tag", &[json!({ "label": "y" })]);
    let client = Arc::new(FaultyClient::new());

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.code(), "model");
    assert_eq!(err.message, "Models not registered: Comment, Tag");
    assert!(client.inner.documents("User").is_empty());
}

#[tokio::test]
async fn test_load_failure_stops_at_first_model() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new());
    let calls = Arc::new(AtomicUsize::new(0));
    let seen = Arc::clone(&calls);

    let config = test_config(&fixtures).with_model(ModelDescriptor::new("Tag", "tag.json"));
    let seeder = SeederBuilder::new(config)
        .with_client(client.clone())
        .with_loader(move |d: &ModelDescriptor| -> ClientResult<ModelDefinition> {
            seen.fetch_add(1, Ordering::SeqCst);
            if d.name == "Post" {
                Err(ClientError::rejected("definition missing"))
            } else {
                Ok(ModelDefinition::new(d.name.clone()))
            }
        })
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.kind, StageKind::LoadModel);
    assert!(err.message.contains("Post"));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(client.inner.registered_models(), vec!["User"]);
}

#[tokio::test]
async fn test_backup_failure_happens_before_clear() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new());
    client.inner.preload("User", vec![doc(json!({ "name": "keep" }))]);

    let config = test_config(&fixtures).with_backup(BackupConfig {
        binary_path: PathBuf::from("/nonexistent/bin/mongodump"),
        enabled: true,
        extra_args: Vec::new(),
    });
    let seeder = SeederBuilder::new(config)
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.code(), "dump");
    assert_eq!(client.inner.documents("User").len(), 1);
    assert_eq!(client.disconnect_count(), 1);
}

#[tokio::test]
async fn test_malformed_fixture_after_clear_is_not_rolled_back() {
    let (_temp_dir, fixtures) = create_test_environment();
    std::fs::write(fixtures.join("broken.json"), "{ \"model\": ").expect("write");
    let client = Arc::new(FaultyClient::new());
    client.inner.preload("User", vec![doc(json!({ "name": "old" }))]);

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.code(), "read");
    assert!(err.message.contains("broken.json"));
    assert!(client.inner.documents("User").is_empty());
}

#[tokio::test]
async fn test_clear_timeout_keeps_completed_deletions() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new().slow_delete("Post", Duration::from_secs(5)));
    client.inner.preload("User", vec![doc(json!({ "name": "old" }))]);
    client.inner.preload("Post", vec![doc(json!({ "title": "old" }))]);

    let config = test_config(&fixtures).with_stage_timeout(Duration::from_millis(100));
    let seeder = SeederBuilder::new(config)
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.kind, StageKind::ClearModel);
    assert!(err.message.ends_with(": Post"));
    let source = err.source.as_ref().map(ToString::to_string);
    assert_eq!(source.as_deref(), Some("Operation timed out after 100 ms"));

    let partial = err.partial.expect("clear failure carries its effects");
    assert_eq!(partial.cleared, vec!["User".to_string()]);
    assert!(client.inner.documents("User").is_empty());
    assert_eq!(client.inner.documents("Post").len(), 1);
    assert!(!client.inner.is_connected());
}

#[tokio::test]
async fn test_connect_timeout_closes_connection() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new().slow_connect(Duration::from_secs(5)));

    let config = test_config(&fixtures).with_stage_timeout(Duration::from_millis(50));
    let seeder = SeederBuilder::new(config)
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let err = seeder.run().await.unwrap_err();
    assert_eq!(err.kind, StageKind::Connect);
    assert!(err.is_timeout());
    assert_eq!(client.disconnect_count(), 1);
}

#[tokio::test]
async fn test_runs_are_independent() {
    let (_temp_dir, fixtures) = create_test_environment();
    let client = Arc::new(FaultyClient::new());

    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(same_name_loader)
        .build()
        .expect("Failed to build seeder");

    let first = seeder.run().await.expect("first run");
    let second = seeder.run().await.expect("second run");

    assert_eq!(first, second);
    assert_eq!(client.inner.documents("User").len(), 2);
}

#[tokio::test]
async fn test_sqlite_end_to_end() {
    let (temp_dir, fixtures) = create_test_environment();
    let definitions = temp_dir.path().join("models");
    std::fs::create_dir(&definitions).expect("mkdir");
    std::fs::write(definitions.join("user.json"), r#"{ "collection": "users" }"#).expect("write");
    std::fs::write(definitions.join("post.json"), r#"{ "collection": "posts" }"#).expect("write");

    let data_dir = temp_dir.path().join("data");
    let client = Arc::new(SqliteClient::new(&data_dir));
    let seeder = SeederBuilder::new(test_config(&fixtures))
        .with_client(client.clone())
        .with_loader(seedling_core::JsonDefinitionLoader::new(&definitions))
        .build()
        .expect("Failed to build seeder");

    let result = seeder.run().await.expect("run should succeed");
    assert_eq!(result.total_inserted(), 3);
    assert!(client.database_path("pipeline").exists());

    client
        .connect("mongodb://localhost:27017/pipeline")
        .await
        .expect("reconnect");
    assert_eq!(client.count("users").await.expect("count"), 2);
    assert_eq!(client.count("posts").await.expect("count"), 1);
}
