mod common;

use chrono::{DateTime, Utc};
use common::ScriptedDispatcher;
use kestrel_engine::mapping::MappingDocument;
use kestrel_engine::resource::{LEARNED_MAPPINGS_URI, ResourceError, ResourceRouter};
use kestrel_engine::store::MappingStore;
use kestrel_engine::tools::ToolRouter;
use serde_json::json;
use std::sync::Arc;

#[test]
fn test_empty_store_reads_as_empty_object() {
    let resources = ResourceRouter::new(MappingStore::new());
    let contents = resources.read(LEARNED_MAPPINGS_URI).unwrap();

    assert_eq!(contents.mime_type, "application/json");
    let doc: serde_json::Value = serde_json::from_str(&contents.text).unwrap();
    assert_eq!(doc, json!({}));
}

#[test]
fn test_unknown_uri() {
    let resources = ResourceRouter::new(MappingStore::new());
    let err = resources.read("selectors://learned").unwrap_err();
    assert!(matches!(err, ResourceError::NotFound(uri) if uri == "selectors://learned"));
}

#[tokio::test]
async fn test_resource_and_listing_agree() {
    let store = MappingStore::new();
    let router = ToolRouter::new(Arc::new(ScriptedDispatcher::new()), store.clone());
    let resources = ResourceRouter::new(store);

    router
        .call(
            "teach",
            &json!({ "description": "login btn", "target": "#a", "notes": "n1" }),
        )
        .await;

    let listing = router.call("list-learned", &json!({})).await.joined_text();
    assert!(listing.contains("\"login btn\" → `#a`"));
    assert!(listing.contains("Notes: n1"));

    let doc: serde_json::Value =
        serde_json::from_str(&resources.read(LEARNED_MAPPINGS_URI).unwrap().text).unwrap();
    assert_eq!(doc["login btn"]["target"], "#a");
    assert_eq!(doc["login btn"]["notes"], "n1");

    let recorded = doc["login btn"]["recordedAt"].as_str().unwrap();
    assert!(listing.contains(&format!("Recorded: {}", recorded)));
}

#[test]
fn test_document_round_trip() {
    let store = MappingStore::new();
    store.put("login btn", "#a", Some("n1"));
    store.put("search box", "input[name=q]", None);
    store.put("login btn", "#b", None);

    let resources = ResourceRouter::new(store.clone());
    let text = resources.read(LEARNED_MAPPINGS_URI).unwrap().text;
    let parsed: MappingDocument = serde_json::from_str(&text).unwrap();

    let snapshot = store.get_all();
    assert_eq!(parsed.len(), snapshot.len());
    for ((doc_key, entry), (store_key, mapping)) in parsed.iter().zip(snapshot.iter()) {
        assert_eq!(doc_key, store_key);
        assert_eq!(entry.target, mapping.target);
        assert_eq!(entry.notes, mapping.notes);

        let at: DateTime<Utc> = DateTime::parse_from_rfc3339(&entry.recorded_at)
            .unwrap()
            .with_timezone(&Utc);
        let drift = (mapping.recorded_at - at).num_milliseconds().abs();
        assert!(drift < 1);
    }
}

#[test]
fn test_list_describes_mapping_resource() {
    let resources = ResourceRouter::new(MappingStore::new());
    let listed = resources.list();
    assert_eq!(listed.len(), 1);
    assert_eq!(listed[0].uri, "mappings://learned");
}
