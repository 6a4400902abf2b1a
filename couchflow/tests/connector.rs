use couchflow::{
    memory::{FieldView, InMemoryStoreBuilder},
    prelude::*,
};
use serde_json::{Value, json};

async fn connected(builder: InMemoryStoreBuilder) -> CouchConnector<InMemoryStoreBuilder> {
    let connector = CouchConnector::new(ConnectionConfig::default(), builder);
    connector.connect(None).await.unwrap();
    connector
}

fn parse(text: &str) -> Value {
    serde_json::from_str(text).unwrap()
}

fn orders() -> InMemoryStoreBuilder {
    InMemoryStoreBuilder::default()
        .with_view(ViewName::new("orders", "by_customer"), FieldView::new("customer"))
        .with_view(ViewName::new("orders", "by_total"), FieldView::new("total").with_value("customer"))
}

#[tokio::test]
async fn plain_text_is_saved_under_content_property() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let id = connector.save(Some("Another string"), None, None).await.unwrap();
    let stored = parse(&connector.find_by_id(&id, None).await.unwrap());

    assert_eq!(stored["content"], "Another string");
    assert_eq!(stored["_id"], id.as_str());
    assert!(stored["_rev"].as_str().unwrap().starts_with("1-"));
}

#[tokio::test]
async fn plain_text_uses_explicit_id_and_property() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let id = connector
        .save(Some("hello"), Some("greeting"), Some("body"))
        .await
        .unwrap();
    let stored = parse(&connector.find_by_id("greeting", None).await.unwrap());

    assert_eq!(id, "greeting");
    assert_eq!(stored["body"], "hello");
    assert!(stored.get("content").is_none());
}

#[tokio::test]
async fn blank_property_name_falls_back_to_content() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let id = connector.save(Some("hello"), Some(" "), Some("")).await.unwrap();
    let stored = parse(&connector.find_by_id(&id, None).await.unwrap());

    assert_ne!(id.trim(), "");
    assert_eq!(stored["content"], "hello");
}

#[tokio::test]
async fn json_with_embedded_id_updates_that_document() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let first = connector
        .save(Some(r#"{"_id": "order-1", "status": "new"}"#), None, None)
        .await
        .unwrap();
    let second = connector
        .save(Some(r#"{"_id": "order-1", "status": "paid"}"#), Some("ignored"), None)
        .await
        .unwrap();

    assert_eq!(first, "order-1");
    assert_eq!(second, "order-1");

    let stored = parse(&connector.find_by_id("order-1", None).await.unwrap());
    assert_eq!(stored["status"], "paid");
    assert!(stored["_rev"].as_str().unwrap().starts_with("2-"));

    let ignored = parse(&connector.find_by_id("ignored", None).await.unwrap());
    assert_eq!(ignored, json!({ "_id": "ignored" }));
}

#[tokio::test]
async fn json_without_id_takes_explicit_id() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let id = connector
        .save(Some(r#"{"status": "new"}"#), Some("order-2"), None)
        .await
        .unwrap();

    assert_eq!(id, "order-2");
    assert_eq!(parse(&connector.find_by_id("order-2", None).await.unwrap())["status"], "new");
}

#[tokio::test]
async fn json_with_stale_revision_conflicts() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector
        .save(Some(r#"{"_id": "order-1", "status": "new"}"#), None, None)
        .await
        .unwrap();
    let stale = connector.find_by_id("order-1", None).await.unwrap();
    connector.save(Some(&stale), None, None).await.unwrap();

    let err = connector.save(Some(&stale), None, None).await.unwrap_err();

    assert!(matches!(err, ConnectorError::Conflict(_)));
}

#[tokio::test]
async fn missing_content_is_rejected() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let err = connector.save(None, Some("a"), None).await.unwrap_err();

    assert!(matches!(err, ConnectorError::MissingInput(input) if input == "content"));
}

#[tokio::test]
async fn malformed_json_content_is_rejected() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    assert!(connector.save(Some("{broken"), None, None).await.is_err());
}

#[tokio::test]
async fn missing_document_yields_annotated_default() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let with_default = connector
        .find_by_id("order-9", Some(r#"{"status": "new"}"#))
        .await
        .unwrap();
    let without_default = connector.find_by_id("order-9", None).await.unwrap();

    assert_eq!(parse(&with_default), json!({ "status": "new", "_id": "order-9" }));
    assert_eq!(parse(&without_default), json!({ "_id": "order-9" }));
}

#[tokio::test]
async fn default_can_be_saved_straight_back() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let fresh = connector
        .find_by_id("order-3", Some(r#"{"status": "new"}"#))
        .await
        .unwrap();
    let id = connector.save(Some(&fresh), None, None).await.unwrap();

    assert_eq!(id, "order-3");
    assert_eq!(parse(&connector.find_by_id("order-3", None).await.unwrap())["status"], "new");
}

#[tokio::test]
async fn find_by_key_returns_first_matching_document() {
    let connector = connected(orders()).await;
    connector
        .save(Some(r#"{"_id": "o1", "customer": "alice", "total": 30}"#), None, None)
        .await
        .unwrap();
    connector
        .save(Some(r#"{"_id": "o2", "customer": "bob", "total": 10}"#), None, None)
        .await
        .unwrap();

    let found = parse(
        &connector
            .find_by_key("orders/by_customer", "bob", None)
            .await
            .unwrap(),
    );
    let by_number = parse(
        &connector
            .find_by_key("_design/orders/by_total", "30", None)
            .await
            .unwrap(),
    );
    let missing = connector
        .find_by_key("orders/by_customer", "carol", Some(r#"{"customer": "unknown"}"#))
        .await
        .unwrap();

    assert_eq!(found["_id"], "o2");
    assert_eq!(by_number["_id"], "o1");
    assert_eq!(missing, r#"{"customer": "unknown"}"#);
}

#[tokio::test]
async fn find_by_key_rejects_malformed_view_names() {
    let connector = connected(orders()).await;

    let err = connector.find_by_key("by_customer", "bob", None).await.unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidView(_)));
}

#[tokio::test]
async fn list_view_returns_matching_documents_as_array() {
    let connector = connected(orders()).await;
    for (id, customer, total) in [("o1", "alice", 30), ("o2", "bob", 10), ("o3", "alice", 20)] {
        let content = json!({ "_id": id, "customer": customer, "total": total }).to_string();
        connector.save(Some(&content), None, None).await.unwrap();
    }

    let ids = |listing: String| {
        parse(&listing)
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>()
    };

    let by_key = connector
        .list_view("orders/by_customer", Some("alice"), None, None, None)
        .await
        .unwrap();
    assert_eq!(ids(by_key), ["o1", "o3"]);

    let by_range = connector
        .list_view("orders/by_total", None, Some("15"), Some("30"), None)
        .await
        .unwrap();
    assert_eq!(ids(by_range), ["o3", "o1"]);

    let limited = connector
        .list_view("orders/by_total", None, None, None, Some(1))
        .await
        .unwrap();
    assert_eq!(ids(limited), ["o2"]);

    let everything = connector
        .list_view("_all_docs", None, None, None, None)
        .await
        .unwrap();
    assert_eq!(ids(everything), ["o1", "o2", "o3"]);

    let nothing = connector
        .list_view("orders/by_customer", Some("carol"), None, None, None)
        .await
        .unwrap();
    assert_eq!(nothing, "[]");
}

#[tokio::test]
async fn remove_resolves_current_revision() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector.save(Some("v1"), Some("note"), None).await.unwrap();
    connector.save(Some("v2"), Some("note"), None).await.unwrap();

    let removed = connector.remove("note", None).await.unwrap();

    assert_eq!(removed, "note");
    assert_eq!(
        parse(&connector.find_by_id("note", None).await.unwrap()),
        json!({ "_id": "note" })
    );
}

#[tokio::test]
async fn remove_accepts_a_document() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector.save(Some("v1"), Some("note"), None).await.unwrap();
    let current = connector.find_by_id("note", None).await.unwrap();

    assert_eq!(connector.remove(&current, None).await.unwrap(), "note");
}

#[tokio::test]
async fn remove_with_stale_revision_conflicts() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector.save(Some("v1"), Some("note"), None).await.unwrap();
    let stale = parse(&connector.find_by_id("note", None).await.unwrap());
    connector.save(Some("v2"), Some("note"), None).await.unwrap();

    let err = connector
        .remove("note", stale["_rev"].as_str())
        .await
        .unwrap_err();

    assert!(matches!(err, ConnectorError::Conflict(_)));
}

#[tokio::test]
async fn remove_with_current_explicit_revision() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector.save(Some("v1"), Some("note"), None).await.unwrap();
    let current = parse(&connector.find_by_id("note", None).await.unwrap());

    let removed = connector
        .remove("note", current["_rev"].as_str())
        .await
        .unwrap();

    assert_eq!(removed, "note");
    assert_eq!(
        parse(&connector.find_by_id("note", None).await.unwrap()),
        json!({ "_id": "note" })
    );
}

#[tokio::test]
async fn explicit_revision_wins_over_embedded_one() {
    let connector = connected(InMemoryStoreBuilder::default()).await;
    connector.save(Some("v1"), Some("note"), None).await.unwrap();
    let stale = connector.find_by_id("note", None).await.unwrap();
    connector.save(Some("v2"), Some("note"), None).await.unwrap();
    let current = parse(&connector.find_by_id("note", None).await.unwrap());
    let current_rev = current["_rev"].as_str().unwrap();

    // Stale embedded revision, current explicit one.
    assert_eq!(connector.remove(&stale, Some(current_rev)).await.unwrap(), "note");

    connector.save(Some("v3"), Some("note"), None).await.unwrap();
    let fresh = connector.find_by_id("note", None).await.unwrap();

    // Current embedded revision, stale explicit one.
    let err = connector.remove(&fresh, Some(current_rev)).await.unwrap_err();
    assert!(matches!(err, ConnectorError::Conflict(_)));
}

#[tokio::test]
async fn numeric_embedded_id_addresses_its_text_form() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let id = connector
        .save(Some(r#"{"_id": 42, "status": "new"}"#), Some("outer"), None)
        .await
        .unwrap();
    let stored = parse(&connector.find_by_id("42", None).await.unwrap());

    assert_eq!(id, "42");
    assert_eq!(stored["status"], "new");
    assert_eq!(connector.remove(r#"{"_id": 42}"#, None).await.unwrap(), "42");
}

#[tokio::test]
async fn blank_id_lookup_is_rejected() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    for id in ["", "  "] {
        let err = connector.find_by_id(id, None).await.unwrap_err();
        assert!(matches!(err, ConnectorError::MissingInput(input) if input == "id"));
    }
}

#[tokio::test]
async fn remove_of_missing_document_is_not_found() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let err = connector.remove("ghost", None).await.unwrap_err();

    assert!(matches!(err, ConnectorError::DocumentNotFound(id, db) if id == "ghost" && db == "test"));
}

#[tokio::test]
async fn remove_of_document_without_id_is_rejected() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let err = connector.remove(r#"{"status": "new"}"#, None).await.unwrap_err();

    assert!(matches!(err, ConnectorError::InvalidDocument(_)));
}

#[tokio::test]
async fn processors_require_a_connection() {
    let connector = CouchConnector::new(ConnectionConfig::default(), InMemoryStoreBuilder::default());

    assert!(!connector.validate_connection().await);
    assert!(matches!(
        connector.save(Some("x"), None, None).await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(matches!(
        connector.find_by_id("x", None).await,
        Err(ConnectorError::NotConnected)
    ));
    assert!(matches!(connector.connection_id().await, Err(ConnectorError::NotConnected)));
}

#[tokio::test]
async fn lifecycle_connects_validates_and_disconnects() {
    let builder = InMemoryStoreBuilder::default();
    let connector = CouchConnector::new(ConnectionConfig::default(), builder.clone());

    connector.connect(None).await.unwrap();
    assert!(connector.validate_connection().await);
    assert!(connector.connected_at().await.is_some());
    assert!(connector.connection_id().await.unwrap().starts_with("test@"));

    connector.save(Some("kept"), Some("note"), None).await.unwrap();

    connector.disconnect().await;
    connector.disconnect().await;
    assert!(!connector.validate_connection().await);
    assert!(connector.connected_at().await.is_none());
    assert!(matches!(
        connector.remove("note", None).await,
        Err(ConnectorError::NotConnected)
    ));

    connector.connect(None).await.unwrap();
    assert_eq!(
        parse(&connector.find_by_id("note", None).await.unwrap())["content"],
        "kept"
    );
}

#[tokio::test]
async fn connect_failures_name_the_address() {
    let builder = InMemoryStoreBuilder::default().with_user(Credentials::new("admin", "secret"));
    let connector = CouchConnector::new(ConnectionConfig::default(), builder);

    let err = connector
        .connect(Some(Credentials::new("admin", "wrong")))
        .await
        .unwrap_err();

    assert!(matches!(&err, ConnectorError::Connection(message) if message.starts_with("Failed to connect to localhost:5984")));
    assert!(!connector.validate_connection().await);

    connector
        .connect(Some(Credentials::new("admin", "secret")))
        .await
        .unwrap();
    assert!(connector.validate_connection().await);
}

#[tokio::test]
async fn connect_without_auto_create_needs_existing_database() {
    let builder = InMemoryStoreBuilder::default();
    let config = ConnectionConfig::default()
        .with_database("orders")
        .with_auto_create(false);
    let connector = CouchConnector::new(config, builder.clone());

    assert!(matches!(connector.connect(None).await, Err(ConnectorError::Connection(_))));

    builder.create_database("orders").await;
    connector.connect(None).await.unwrap();
    assert!(connector.connection_id().await.unwrap().starts_with("orders@"));
}

#[tokio::test]
async fn invalid_configuration_fails_to_connect() {
    let config = ConnectionConfig::default().with_protocol("gopher");
    let connector = CouchConnector::new(config, InMemoryStoreBuilder::default());

    assert!(matches!(connector.connect(None).await, Err(ConnectorError::Connection(_))));
}

#[tokio::test]
async fn concurrent_processors_share_one_handle() {
    let connector = connected(InMemoryStoreBuilder::default()).await;

    let (a, b, c) = tokio::join!(
        connector.save(Some("a"), None, None),
        connector.save(Some("b"), None, None),
        connector.save(Some("c"), None, None),
    );

    let listing = parse(
        &connector
            .list_view("_all_docs", None, None, None, None)
            .await
            .unwrap(),
    );
    let mut ids = vec![a.unwrap(), b.unwrap(), c.unwrap()];
    ids.sort();

    assert_eq!(
        listing
            .as_array()
            .unwrap()
            .iter()
            .map(|doc| doc["_id"].as_str().unwrap().to_string())
            .collect::<Vec<_>>(),
        ids
    );
}

#[tokio::test]
async fn processors_run_from_configuration() {
    let connector = connected(orders()).await;

    let save: Processor = serde_json::from_str(
        r#"{"operation": "save", "content": "{\"customer\": \"alice\"}", "id": "o1"}"#,
    )
    .unwrap();
    let find: Processor = serde_json::from_str(
        r#"{"operation": "find_by_key", "view": "orders/by_customer", "key": "alice"}"#,
    )
    .unwrap();
    let remove: Processor = serde_json::from_str(r#"{"operation": "remove", "document": "o1"}"#).unwrap();
    let list: Processor = serde_json::from_str(r#"{"operation": "list_view", "view": "_all_docs"}"#).unwrap();

    assert_eq!(connector.invoke(&save).await.unwrap(), "o1");
    assert_eq!(parse(&connector.invoke(&find).await.unwrap())["_id"], "o1");
    assert_eq!(connector.invoke(&remove).await.unwrap(), "o1");
    assert_eq!(connector.invoke(&list).await.unwrap(), "[]");
}
