//! Config loading and validation from files on disk.

use std::path::PathBuf;
use tempfile::TempDir;

use finsight::config::load_config;

fn write_config(tmp: &TempDir, content: &str) -> PathBuf {
    let path = tmp.path().join("finsight.toml");
    std::fs::write(&path, content).unwrap();
    path
}

#[test]
fn test_minimal_config_uses_defaults() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        &tmp,
        r#"
[server]
bind = "127.0.0.1:7341"
"#,
    );

    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.embedding.provider, "disabled");
    assert_eq!(cfg.store.provider, "memory");
    assert_eq!(cfg.llm.model, "gpt-4o-mini");
    assert_eq!(cfg.seed.batch_size, 10);
    assert_eq!(cfg.store.max_retries, 2);
    assert_eq!(cfg.store.timeout_secs, 30);

    let settings = cfg.pipeline_settings();
    assert_eq!(settings.index, "transactions");
    assert_eq!(settings.top_k, 20);
    assert_eq!(settings.sample_size, 5);
    assert_eq!(settings.filter.min_score, 0.7);
    assert_eq!(settings.filter.amount_tolerance, 5.0);
    assert_eq!(settings.filter.min_filtered, 3);
    assert_eq!(settings.filter.leniency_pool, 6);
    assert_eq!(settings.chart.max_points, 20);
    assert!(!settings.chart.synthetic_padding);
}

#[test]
fn test_full_config() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(
        &tmp,
        r#"
[server]
bind = "0.0.0.0:8080"

[embedding]
provider = "ollama"
model = "nomic-embed-text"
dims = 768
url = "http://localhost:11434"

[llm]
model = "llama3.1"
base_url = "http://localhost:11434/v1"
temperature = 0.0

[store]
provider = "pinecone"
index = "tx"
host = "https://tx-abc.svc.pinecone.io"
namespace = "demo"
top_k = 50
max_retries = 4
timeout_secs = 10

[pipeline]
min_score = 0.5
synthetic_padding = true
max_points = 12

[seed]
path = "./data/transactions.sample.json"
batch_size = 25
"#,
    );

    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.embedding.dims, Some(768));
    assert_eq!(cfg.store.namespace, "demo");
    assert_eq!(cfg.store.max_retries, 4);
    assert_eq!(cfg.store.timeout_secs, 10);

    let settings = cfg.pipeline_settings();
    assert_eq!(settings.index, "tx");
    assert_eq!(settings.top_k, 50);
    assert_eq!(settings.filter.min_score, 0.5);
    assert_eq!(settings.chart.max_points, 12);
    assert!(settings.chart.synthetic_padding);
}

#[test]
fn test_rejects_invalid_values() {
    let cases = [
        ("[store]\ntop_k = 0", "store.top_k"),
        ("[store]\ntimeout_secs = 0", "store.timeout_secs"),
        ("[pipeline]\nmin_score = 1.5", "pipeline.min_score"),
        ("[pipeline]\nsample_size = 0", "pipeline.sample_size"),
        ("[embedding]\nprovider = \"openai\"\nmodel = \"m\"", "embedding.dims"),
        ("[embedding]\nprovider = \"openai\"\ndims = 8", "embedding.model"),
        ("[embedding]\nprovider = \"fastembed\"", "Unknown embedding provider"),
        ("[store]\nprovider = \"pinecone\"", "store.host"),
        ("[store]\nprovider = \"redis\"", "Unknown store provider"),
    ];

    for (section, expected) in cases {
        let tmp = TempDir::new().unwrap();
        let content = format!("[server]\nbind = \"127.0.0.1:0\"\n\n{}\n", section);
        let path = write_config(&tmp, &content);
        let err = load_config(&path).unwrap_err();
        assert!(
            format!("{:#}", err).contains(expected),
            "expected '{}' in error: {:#}",
            expected,
            err
        );
    }
}

#[test]
fn test_example_config_is_valid() {
    let path = std::path::Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("../../config/finsight.example.toml");
    let cfg = load_config(&path).unwrap();
    assert_eq!(cfg.embedding.provider, "openai");
    assert_eq!(cfg.store.provider, "memory");
    assert!(cfg.seed.path.is_some());
}

#[test]
fn test_missing_file() {
    let err = load_config(std::path::Path::new("/nonexistent/finsight.toml")).unwrap_err();
    assert!(err.to_string().contains("Failed to read config file"));
}

#[test]
fn test_missing_server_section() {
    let tmp = TempDir::new().unwrap();
    let path = write_config(&tmp, "[store]\ntop_k = 5\n");
    assert!(load_config(&path).is_err());
}
