mod common;

use common::ScriptedDispatcher;
use kestrel_engine::cli::{Services, handle_line, serve};
use kestrel_engine::resource::ResourceRouter;
use kestrel_engine::store::MappingStore;
use kestrel_engine::tools::ToolRouter;
use serde_json::{Value, json};
use std::sync::Arc;
use std::time::Duration;
use tokio::io::{AsyncWriteExt, BufReader};

fn services(dispatcher: ScriptedDispatcher) -> Services {
    let store = MappingStore::new();
    Services {
        tools: ToolRouter::new(Arc::new(dispatcher), store.clone()),
        resources: ResourceRouter::new(store),
    }
}

fn to_json<T: serde::Serialize>(value: &T) -> Value {
    serde_json::to_value(value).unwrap()
}

#[tokio::test]
async fn test_tools_list() {
    let svc = services(ScriptedDispatcher::new());
    let resp = to_json(&handle_line(&svc, r#"{"id":1,"method":"tools/list"}"#).await);

    assert_eq!(resp["id"], 1);
    assert_eq!(resp["result"]["tools"].as_array().unwrap().len(), 5);
    assert_eq!(resp["result"]["tools"][2]["name"], "teach");
    assert!(resp["result"]["tools"][2]["inputSchema"].is_object());
}

#[tokio::test]
async fn test_tools_call_returns_envelope() {
    let svc = services(ScriptedDispatcher::new());
    let line = json!({
        "id": "a",
        "method": "tools/call",
        "params": { "name": "teach", "arguments": { "description": "d", "target": "#t" } }
    })
    .to_string();

    let resp = to_json(&handle_line(&svc, &line).await);
    assert_eq!(resp["id"], "a");
    assert_eq!(resp["result"]["isError"], false);
    assert_eq!(resp["result"]["content"][0]["type"], "text");
    assert_eq!(resp["result"]["content"][0]["text"], "Learned \"d\" → `#t`");
}

#[tokio::test]
async fn test_tool_failure_is_error_envelope_not_rpc_error() {
    let svc = services(ScriptedDispatcher::new());
    let line = json!({
        "id": 2,
        "method": "tools/call",
        "params": { "name": "teach", "arguments": {} }
    })
    .to_string();

    let resp = to_json(&handle_line(&svc, &line).await);
    assert!(resp.get("error").is_none());
    assert_eq!(resp["result"]["isError"], true);
    let text = resp["result"]["content"][0]["text"].as_str().unwrap();
    assert!(text.contains("'description'"));
    assert!(text.contains("'target'"));
}

#[tokio::test]
async fn test_resources_read() {
    let svc = services(ScriptedDispatcher::new());
    svc.tools.store().put("login btn", "#a", Some("n1"));

    let resp = to_json(
        &handle_line(
            &svc,
            r#"{"id":3,"method":"resources/read","params":{"uri":"mappings://learned"}}"#,
        )
        .await,
    );
    let contents = &resp["result"]["contents"][0];
    assert_eq!(contents["uri"], "mappings://learned");
    assert_eq!(contents["mimeType"], "application/json");

    let doc: Value = serde_json::from_str(contents["text"].as_str().unwrap()).unwrap();
    assert_eq!(doc["login btn"]["target"], "#a");
}

#[tokio::test]
async fn test_resources_read_unknown_uri() {
    let svc = services(ScriptedDispatcher::new());
    let resp = to_json(
        &handle_line(
            &svc,
            r#"{"id":4,"method":"resources/read","params":{"uri":"nope://x"}}"#,
        )
        .await,
    );
    assert!(resp["error"]["message"].as_str().unwrap().contains("nope://x"));
}

#[tokio::test]
async fn test_malformed_and_unknown_requests() {
    let svc = services(ScriptedDispatcher::new());

    let resp = to_json(&handle_line(&svc, "not json").await);
    assert_eq!(resp["id"], Value::Null);
    assert!(resp["error"]["message"].as_str().unwrap().starts_with("Invalid request"));

    let resp = to_json(&handle_line(&svc, r#"{"id":5,"method":"ping"}"#).await);
    assert_eq!(resp["error"]["message"], "Unknown method: ping");
}

#[tokio::test]
async fn test_serve_answers_every_line() {
    let svc = services(ScriptedDispatcher::new());
    let input = [
        r##"{"id":1,"method":"tools/call","params":{"name":"teach","arguments":{"description":"x","target":"#x"}}}"##,
        "",
        r#"{"id":2,"method":"resources/list"}"#,
        "garbage",
    ]
    .join("\n");

    let output = serve(svc.clone(), BufReader::new(input.as_bytes()), Vec::new())
        .await
        .unwrap();
    let output = String::from_utf8(output).unwrap();

    let responses: Vec<Value> = output
        .lines()
        .map(|l| serde_json::from_str(l).unwrap())
        .collect();
    assert_eq!(responses.len(), 3);

    let ids: Vec<&Value> = responses.iter().map(|r| &r["id"]).collect();
    assert!(ids.contains(&&json!(1)));
    assert!(ids.contains(&&json!(2)));
    assert!(ids.contains(&&Value::Null));
    assert_eq!(svc.tools.store().size(), 1);
}

#[tokio::test]
async fn test_serve_stops_reading_when_output_closes() {
    let svc = services(ScriptedDispatcher::new());
    let (mut feeder, input) = tokio::io::duplex(4096);
    let (output, closed_peer) = tokio::io::duplex(4096);
    drop(closed_peer);

    // Input never reaches EOF; only the dead writer can end the loop.
    let feeding = tokio::spawn(async move {
        for id in 0..100 {
            let line = format!("{{\"id\":{},\"method\":\"tools/list\"}}\n", id);
            if feeder.write_all(line.as_bytes()).await.is_err() {
                break;
            }
            tokio::time::sleep(Duration::from_millis(20)).await;
        }
        feeder
    });

    let result = tokio::time::timeout(
        Duration::from_secs(2),
        serve(svc, BufReader::new(input), output),
    )
    .await
    .expect("serve kept reading after its writer failed");
    assert!(result.is_err());

    feeding.abort();
}
