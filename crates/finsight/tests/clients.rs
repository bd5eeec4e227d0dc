//! Outbound clients against a fake upstream served on an ephemeral port.

use axum::{
    extract::State,
    http::{HeaderMap, StatusCode},
    routing::post,
    Json, Router,
};
use serde_json::{json, Value};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use finsight::config::{EmbeddingConfig, LlmConfig, StoreConfig};
use finsight::embedding::OllamaProvider;
use finsight::llm::ChatClient;
use finsight::pinecone::PineconeStore;
use finsight_core::embedding::EmbeddingProvider;
use finsight_core::generation::{ChartParamRequest, ChartParameterSelector, SummaryGenerator};
use finsight_core::models::{FilterType, Totals};
use finsight_core::store::{VectorRecord, VectorStore};

#[derive(Clone, Default)]
struct Upstream {
    embed_calls: Arc<AtomicUsize>,
    flaky_calls: Arc<AtomicUsize>,
    flaky_queries: Arc<AtomicUsize>,
    upserted: Arc<Mutex<Vec<Value>>>,
}

async fn embed(State(up): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    up.embed_calls.fetch_add(1, Ordering::SeqCst);
    let count = body["input"].as_array().map_or(0, Vec::len);
    let embeddings: Vec<Value> = (0..count).map(|i| json!([i as f64, 1.0])).collect();
    Json(json!({ "model": body["model"], "embeddings": embeddings }))
}

async fn flaky_embed(
    State(up): State<Upstream>,
    body: Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if up.flaky_calls.fetch_add(1, Ordering::SeqCst) == 0 {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    Ok(embed(State(up), body).await)
}

async fn chat(Json(body): Json<Value>) -> Json<Value> {
    let content = if body.get("response_format").is_some() {
        json!({
            "visualizationType": "line",
            "dataGrouping": "by_month",
            "filterType": "expenses_only",
            "title": "Monthly spending",
            "xAxis": "Month",
            "yAxis": "Amount",
            "colors": ["#123456"],
            "queryKeywords": ["coffee"]
        })
        .to_string()
    } else {
        "Mostly coffee.".to_string()
    };
    Json(json!({
        "choices": [{ "index": 0, "message": { "role": "assistant", "content": content } }]
    }))
}

async fn pinecone_query(
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if headers.get("Api-Key").and_then(|v| v.to_str().ok()) != Some("test-key") {
        return Err(StatusCode::UNAUTHORIZED);
    }
    assert_eq!(body["includeMetadata"], true);
    assert_eq!(body["topK"], 2);
    Ok(Json(json!({
        "matches": [
            { "id": "doc-1", "score": 0.91, "metadata": { "text": "{\"transactions\": {}}" } },
            { "id": "doc-2", "score": 0.42 }
        ]
    })))
}

/// Fails the first query with a 503, then behaves like `pinecone_query`.
async fn flaky_pinecone_query(
    State(up): State<Upstream>,
    headers: HeaderMap,
    body: Json<Value>,
) -> Result<Json<Value>, StatusCode> {
    if up.flaky_queries.fetch_add(1, Ordering::SeqCst) == 0 {
        return Err(StatusCode::SERVICE_UNAVAILABLE);
    }
    pinecone_query(headers, body).await
}

async fn pinecone_upsert(State(up): State<Upstream>, Json(body): Json<Value>) -> Json<Value> {
    let count = body["vectors"].as_array().map_or(0, Vec::len);
    up.upserted.lock().unwrap().push(body);
    Json(json!({ "upsertedCount": count }))
}

async fn start_upstream() -> (String, Upstream) {
    let upstream = Upstream::default();
    let app = Router::new()
        .route("/api/embed", post(embed))
        .route("/flaky/api/embed", post(flaky_embed))
        .route("/v1/chat/completions", post(chat))
        .route("/query", post(pinecone_query))
        .route("/flaky/query", post(flaky_pinecone_query))
        .route("/vectors/upsert", post(pinecone_upsert))
        .with_state(upstream.clone());

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });
    (format!("http://{}", addr), upstream)
}

fn ollama_config(url: String) -> EmbeddingConfig {
    EmbeddingConfig {
        provider: "ollama".to_string(),
        model: Some("nomic-embed-text".to_string()),
        dims: Some(2),
        max_retries: 1,
        timeout_secs: 5,
        url: Some(url),
    }
}

#[tokio::test]
async fn test_ollama_embeds_in_order() {
    let (base, upstream) = start_upstream().await;
    let provider = OllamaProvider::new(&ollama_config(base)).unwrap();

    let vectors = provider
        .embed(&["a".to_string(), "b".to_string()])
        .await
        .unwrap();
    assert_eq!(vectors, vec![vec![0.0, 1.0], vec![1.0, 1.0]]);
    assert_eq!(upstream.embed_calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn test_ollama_retries_server_errors() {
    let (base, upstream) = start_upstream().await;
    let provider = OllamaProvider::new(&ollama_config(format!("{}/flaky", base))).unwrap();

    let vectors = provider.embed(&["a".to_string()]).await.unwrap();
    assert_eq!(vectors.len(), 1);
    assert_eq!(upstream.flaky_calls.load(Ordering::SeqCst), 2);
}

#[tokio::test]
async fn test_ollama_client_error_is_not_retried() {
    let (base, _upstream) = start_upstream().await;
    let provider = OllamaProvider::new(&ollama_config(format!("{}/missing", base))).unwrap();

    let err = provider.embed(&["a".to_string()]).await.unwrap_err();
    assert!(err.to_string().contains("404"));
}

#[tokio::test]
async fn test_chat_client_selects_and_summarizes() {
    let (base, _upstream) = start_upstream().await;
    let client = ChatClient::new(&LlmConfig {
        base_url: format!("{}/v1/", base),
        timeout_secs: 5,
        ..LlmConfig::default()
    })
    .unwrap();

    let request = ChartParamRequest {
        query: "coffee by month",
        sample: &[],
        totals: Totals::default(),
    };
    let params = client.select(&request).await.unwrap();
    assert_eq!(params.filter_type, FilterType::ExpensesOnly);
    assert_eq!(params.query_keywords, vec!["coffee".to_string()]);

    let summary = client.summarize("system", "prompt").await.unwrap();
    assert_eq!(summary, "Mostly coffee.");
}

#[tokio::test]
async fn test_pinecone_query_and_upsert() {
    let (base, upstream) = start_upstream().await;
    let config = StoreConfig {
        namespace: "demo".to_string(),
        ..StoreConfig::default()
    };
    let store = PineconeStore::with_key(&config, base, "test-key".to_string()).unwrap();

    let hits = store.query("transactions", &[1.0, 0.0], 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(hits[0].id, "doc-1");
    assert!(hits[0].text.is_some());
    assert!(hits[1].text.is_none());

    store
        .upsert(
            "transactions",
            &[VectorRecord {
                id: "doc-3".to_string(),
                values: vec![0.5, 0.5],
                text: "{\"transactions\": {}}".to_string(),
            }],
        )
        .await
        .unwrap();
    let upserted = upstream.upserted.lock().unwrap();
    assert_eq!(upserted.len(), 1);
    assert_eq!(upserted[0]["namespace"], "demo");
    assert_eq!(upserted[0]["vectors"][0]["id"], "doc-3");
    assert_eq!(
        upserted[0]["vectors"][0]["metadata"]["text"],
        "{\"transactions\": {}}"
    );
}

#[tokio::test]
async fn test_pinecone_retries_follow_config() {
    let (base, upstream) = start_upstream().await;

    let no_retries = StoreConfig {
        max_retries: 0,
        timeout_secs: 5,
        ..StoreConfig::default()
    };
    let store =
        PineconeStore::with_key(&no_retries, format!("{}/flaky", base), "test-key".to_string())
            .unwrap();
    let err = store.query("transactions", &[1.0, 0.0], 2).await.unwrap_err();
    assert!(err.to_string().contains("503"));
    assert_eq!(upstream.flaky_queries.load(Ordering::SeqCst), 1);

    upstream.flaky_queries.store(0, Ordering::SeqCst);
    let one_retry = StoreConfig {
        max_retries: 1,
        ..no_retries
    };
    let store =
        PineconeStore::with_key(&one_retry, format!("{}/flaky", base), "test-key".to_string())
            .unwrap();
    let hits = store.query("transactions", &[1.0, 0.0], 2).await.unwrap();
    assert_eq!(hits.len(), 2);
    assert_eq!(upstream.flaky_queries.load(Ordering::SeqCst), 2);
}
