//! Client Operation Tests
//!
//! Exercises the client against the local backend using the same small
//! fixture throughout: two users and a sparse list of items.

use fireman_concurrency::RetryConfig;
use fireman_core::Error;
use fireman_engine::{Client, ClientConfig, LocalBackend, NullSink, OperationEvent, Query};
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::sync::Arc;
use tempfile::TempDir;

fn fixture() -> Value {
    json!({
        "user": {
            "abcd": {"name": "Joshua Moreno", "age": 85},
            "efgh": {"name": "Kimberly Harris", "age": 7}
        },
        "item": {"0": "zeroth", "1": "first", "2": "second", "10": "tenth"}
    })
}

fn create_client() -> (Client, Arc<LocalBackend>) {
    let local = Arc::new(LocalBackend::from_value(fixture()));
    let client = Client::new(local.clone(), RetryConfig::no_retry());
    (client, local)
}

fn keys(value: &Value) -> Vec<String> {
    value.as_object().map(|m| m.keys().cloned().collect()).unwrap_or_default()
}

// ============================================================================
// Reads
// ============================================================================

#[tokio::test]
async fn test_get_user() {
    let (client, _) = create_client();
    let user = client.get("/user/abcd", &Query::new()).await.unwrap();
    assert_eq!(user, json!({"name": "Joshua Moreno", "age": 85}));
}

#[tokio::test]
async fn test_get_root_spellings() {
    let (client, _) = create_client();
    let empty = client.get("", &Query::new()).await.unwrap();
    let slash = client.get("/", &Query::new()).await.unwrap();
    assert_eq!(keys(&empty), vec!["user", "item"]);
    assert_eq!(empty, slash);
}

#[tokio::test]
async fn test_get_limited_users() {
    let (client, _) = create_client();
    let last = client
        .get("/user", &Query::new().order_by_key().limit_to_last(1))
        .await
        .unwrap();
    assert_eq!(keys(&last), vec!["efgh"]);

    let oldest = client
        .get("/user", &Query::new().order_by_child("age").limit_to_last(1).start_at(10))
        .await
        .unwrap();
    assert_eq!(keys(&oldest), vec!["abcd"]);
}

#[tokio::test]
async fn test_items_sorted_by_key() {
    let (client, _) = create_client();
    let by_key = Query::new().order_by_key();

    let first = client.get("/item", &by_key.clone().limit_to_first(3)).await.unwrap();
    assert_eq!(first, json!(["zeroth", "first", "second"]));

    let from_one = client
        .get("/item", &by_key.clone().limit_to_first(3).start_at(1))
        .await
        .unwrap();
    assert_eq!(from_one, json!({"1": "first", "2": "second", "10": "tenth"}));

    let last = client.get("/item", &by_key.clone().limit_to_last(3)).await.unwrap();
    assert_eq!(last, json!({"1": "first", "2": "second", "10": "tenth"}));

    let last_from_two = client
        .get("/item", &by_key.limit_to_last(3).start_at(2))
        .await
        .unwrap();
    assert_eq!(last_from_two, json!({"2": "second", "10": "tenth"}));
}

#[tokio::test]
async fn test_items_sorted_by_value() {
    let (client, _) = create_client();
    let by_value = Query::new().order_by_value();

    let first = client.get("/item", &by_value.clone().limit_to_first(3)).await.unwrap();
    assert_eq!(first, json!({"1": "first", "2": "second", "10": "tenth"}));
    assert_eq!(keys(&first), vec!["1", "2", "10"]);

    let from_s = client
        .get("/item", &by_value.clone().limit_to_first(3).start_at("s"))
        .await
        .unwrap();
    assert_eq!(from_s, json!({"0": "zeroth", "2": "second", "10": "tenth"}));

    let last = client.get("/item", &by_value.limit_to_last(3)).await.unwrap();
    assert_eq!(keys(&last), vec!["2", "10", "0"]);
}

#[tokio::test]
async fn test_shallow_users() {
    let (client, _) = create_client();
    let users = client.get("/user", &Query::new().shallow()).await.unwrap();
    assert_eq!(users, json!({"abcd": true, "efgh": true}));
    assert_eq!(client.keys("/user").await.unwrap(), vec!["abcd", "efgh"]);
}

#[tokio::test]
async fn test_values() {
    let (client, _) = create_client();
    let ages: Vec<Value> = client
        .values("/user", &Query::new().order_by_child("age"))
        .await
        .unwrap()
        .into_iter()
        .map(|user| user["age"].clone())
        .collect();
    assert_eq!(ages, vec![json!(7), json!(85)]);
}

#[tokio::test]
async fn test_invalid_query_is_rejected() {
    let (client, _) = create_client();
    let result = client.get("/user", &Query::new().start_at("a")).await;
    assert!(matches!(result, Err(Error::InvalidQuery(_))));
}

// ============================================================================
// Writes
// ============================================================================

#[tokio::test]
async fn test_post_adds_comment() {
    let (client, local) = create_client();
    let before = local.snapshot();
    let result = client
        .post("/comment", json!({"body": "Matter is neither created nor destroyed."}))
        .await
        .unwrap();
    let key = result["name"].as_str().unwrap();
    assert_eq!(key.len(), 20);
    assert_eq!(
        local.snapshot()["comment"][key],
        json!({"body": "Matter is neither created nor destroyed."})
    );
    assert!(before.get("comment").is_none());
}

#[tokio::test]
async fn test_post_with_key() {
    let (client, local) = create_client();
    let result = client
        .post_with_key("/comment", "-Kc-ofhA2uGpymUI1CLf", json!({"body": "Fixed."}))
        .await
        .unwrap();
    assert_eq!(result, json!({"name": "-Kc-ofhA2uGpymUI1CLf"}));
    assert_eq!(local.snapshot()["comment"]["-Kc-ofhA2uGpymUI1CLf"]["body"], json!("Fixed."));
}

#[tokio::test]
async fn test_put_replaces_user() {
    let (client, local) = create_client();
    let before = local.snapshot();
    let result = client.put("/user/abcd", json!({"name": "Nancy Oconnell"})).await.unwrap();
    assert_eq!(result, json!({"name": "Nancy Oconnell"}));
    assert_eq!(local.snapshot()["user"]["abcd"], json!({"name": "Nancy Oconnell"}));
    assert_eq!(before["user"]["abcd"]["name"], json!("Joshua Moreno"));
}

#[tokio::test]
async fn test_patch_updates_user() {
    let (client, local) = create_client();
    let result = client.patch("/user/abcd", json!({"name": "Nancy Oconnell"})).await.unwrap();
    assert_eq!(result, json!({"name": "Nancy Oconnell"}));
    assert_eq!(
        local.snapshot()["user"]["abcd"],
        json!({"name": "Nancy Oconnell", "age": 85})
    );
}

#[tokio::test]
async fn test_delete_user() {
    let (client, local) = create_client();
    let before = local.snapshot();
    assert_eq!(client.delete("/user/efgh").await.unwrap(), Value::Null);
    assert!(local.snapshot()["user"].get("efgh").is_none());

    client.delete("/user").await.unwrap();
    assert!(local.snapshot().get("user").is_none());
    assert!(before.get("user").is_some());
}

#[tokio::test]
async fn test_increment() {
    let (client, local) = create_client();
    let mut deltas = Map::new();
    deltas.insert("age".to_string(), json!(1));
    deltas.insert("visits".to_string(), json!(3));

    client.increment("/user/abcd", &deltas).await.unwrap();
    assert_eq!(
        local.snapshot()["user"]["abcd"],
        json!({"name": "Joshua Moreno", "age": 86, "visits": 3})
    );

    client.increment_many(&["/user/abcd", "/user/efgh"], &deltas).await.unwrap();
    assert_eq!(local.snapshot()["user"]["abcd"]["age"], json!(87));
    assert_eq!(local.snapshot()["user"]["efgh"]["visits"], json!(3));
}

#[tokio::test]
async fn test_increment_rejects_non_numbers() {
    let (client, _) = create_client();
    let mut deltas = Map::new();
    deltas.insert("name".to_string(), json!(1));
    let result = client.increment("/user/abcd", &deltas).await;
    assert!(matches!(result, Err(Error::UnexpectedShape(_))));
}

// ============================================================================
// Fan-out
// ============================================================================

#[tokio::test]
async fn test_get_many_merges() {
    let (client, _) = create_client();
    let merged = client
        .get_many(&["/user/abcd", "/user/efgh"], &Query::new())
        .await
        .unwrap()
        .unwrap();
    assert_eq!(Value::Object(merged), json!({"name": "Kimberly Harris", "age": 7}));

    let none = client.get_many(&["/missing"], &Query::new()).await.unwrap();
    assert!(none.is_none());
}

#[tokio::test]
async fn test_put_many_then_save() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("database.json");
    std::fs::write(&file, serde_json::to_string(&fixture()).unwrap()).unwrap();

    let local = Arc::new(LocalBackend::open(&file).unwrap());
    let client = Client::new(local.clone(), RetryConfig::no_retry());
    client.put_many(&["/user", "/item"], &json!("empty")).await.unwrap();
    local.save(false).unwrap();

    assert_eq!(
        std::fs::read_to_string(&file).unwrap(),
        r#"{"user":"empty","item":"empty"}"#
    );
}

#[tokio::test]
async fn test_patch_post_delete_many() {
    let (client, local) = create_client();
    client
        .patch_many(&["/user/abcd", "/user/efgh"], &json!({"active": true}))
        .await
        .unwrap();
    assert_eq!(local.snapshot()["user"]["efgh"]["active"], json!(true));

    client.post_many(&["/log/a", "/log/b"], &json!("entry")).await.unwrap();
    assert_eq!(client.keys("/log/a").await.unwrap().len(), 1);
    assert_eq!(client.keys_many(&["/log/a", "/log/b"]).await.unwrap().len(), 2);

    client.delete_many(&["/log/a", "/log/b"]).await.unwrap();
    assert!(local.snapshot().get("log").is_none());
}

#[tokio::test]
async fn test_values_many_concatenates() {
    let (client, _) = create_client();
    let values = client
        .values_many(&["/user/abcd", "/user/efgh"], &Query::new())
        .await
        .unwrap();
    assert_eq!(values.len(), 4);
}

// ============================================================================
// Events, config and snapshots
// ============================================================================

#[tokio::test]
async fn test_sink_records_each_operation() {
    let events: Arc<Mutex<Vec<(String, String, Option<Value>)>>> = Arc::default();
    let recorded = Arc::clone(&events);
    let (client, _) = create_client();
    let client = client.with_sink(move |event: &OperationEvent<'_>| {
        recorded.lock().push((
            event.operation.to_string(),
            event.path.to_string(),
            event.payload.cloned(),
        ));
    });

    client.get("writing", &Query::new().order_by_key().start_at("here")).await.unwrap();
    client.put("a", json!(1)).await.unwrap();
    client.delete("a").await.unwrap();
    let _ = client.get("writing", &Query::new().start_at("here")).await;

    let events = events.lock();
    assert_eq!(events.len(), 4);
    assert_eq!(
        events[0],
        (
            "get".to_string(),
            "writing".to_string(),
            Some(json!({"orderBy": "$key", "startAt": "here"}))
        )
    );
    assert_eq!(events[1], ("put".to_string(), "a".to_string(), Some(json!(1))));
    assert_eq!(events[2], ("delete".to_string(), "a".to_string(), None));
    assert_eq!(events[3].2, Some(json!({"startAt": "here"})));
}

#[tokio::test]
async fn test_null_sink_replaces_recording_sink() {
    let events: Arc<Mutex<Vec<String>>> = Arc::default();
    let recorded = Arc::clone(&events);
    let (client, _) = create_client();
    let recording = client.with_sink(move |event: &OperationEvent<'_>| {
        recorded.lock().push(event.operation.to_string());
    });
    let silenced = recording.clone().with_sink(NullSink);

    silenced.put("a", json!(1)).await.unwrap();
    assert_eq!(silenced.get("a", &Query::new()).await.unwrap(), json!(1));
    assert!(events.lock().is_empty());

    recording.delete("a").await.unwrap();
    assert_eq!(*events.lock(), vec!["delete"]);
}

#[tokio::test]
async fn test_from_config_local_file() {
    let dir = TempDir::new().unwrap();
    let file = dir.path().join("database.json");
    std::fs::write(&file, serde_json::to_string(&fixture()).unwrap()).unwrap();

    let client = Client::from_config(&ClientConfig::local(&file)).unwrap();
    assert_eq!(client.backend().name(), "local");
    assert_eq!(client.retry_policy(), RetryConfig::no_retry());
    assert_eq!(client.keys("/user").await.unwrap(), vec!["abcd", "efgh"]);
}

#[test]
fn test_from_config_missing_db_file() {
    let dir = TempDir::new().unwrap();
    let config = ClientConfig::local(dir.path().join("databse.json"));
    assert!(matches!(Client::from_config(&config), Err(Error::Config(_))));
}

#[test]
fn test_from_config_remote() {
    let client = Client::from_config(&ClientConfig::remote("my-app", "secret")).unwrap();
    assert_eq!(client.backend().name(), "remote");
    assert_eq!(client.retry_policy().max_retries, 3);

    let mut incomplete = ClientConfig::remote("my-app", "secret");
    incomplete.api_key = None;
    assert!(matches!(Client::from_config(&incomplete), Err(Error::Config(_))));
}

#[tokio::test]
async fn test_sync_to_local_copies_everything() {
    let (client, local) = create_client();
    let copy = client.sync_to_local().await.unwrap();
    assert_eq!(copy.snapshot(), local.snapshot());

    client.delete("/user").await.unwrap();
    assert!(copy.snapshot().get("user").is_some());
}
