//! Chat-completion client for the two model calls.
//!
//! [`ChatClient`] speaks the OpenAI-compatible `POST {base_url}/chat/completions`
//! protocol. Chart parameters are requested with a strict JSON-schema
//! `response_format` and parsed straight into [`ChartParams`]; the summary
//! is a plain completion. Neither call is retried: a malformed or failed
//! response surfaces as an error for the request.
//!
//! `OPENAI_API_KEY` is sent as a bearer token when set, so keyless
//! OpenAI-compatible local servers work too.

use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use serde_json::{json, Value};

use finsight_core::generation::{
    chart_params_schema, chart_prompt, ChartParamRequest, ChartParameterSelector,
    SummaryGenerator, CHART_SYSTEM_PROMPT,
};
use finsight_core::models::ChartParams;

use crate::config::LlmConfig;
use crate::http::{build_client, post_with_retry};

pub struct ChatClient {
    model: String,
    endpoint: String,
    temperature: f32,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl ChatClient {
    pub fn new(config: &LlmConfig) -> Result<Self> {
        let client = build_client(config.timeout_secs)?;
        Ok(Self {
            model: config.model.clone(),
            endpoint: format!("{}/chat/completions", config.base_url.trim_end_matches('/')),
            temperature: config.temperature,
            api_key: std::env::var("OPENAI_API_KEY").ok(),
            client,
        })
    }

    async fn complete(&self, body: Value) -> Result<String> {
        let response = post_with_retry("Chat", 0, || {
            let request = self.client.post(&self.endpoint).json(&body);
            match &self.api_key {
                Some(key) => request.header("Authorization", format!("Bearer {}", key)),
                None => request,
            }
        })
        .await?;
        message_content(&response)
    }
}

fn messages(system: &str, user: &str) -> Value {
    json!([
        { "role": "system", "content": system },
        { "role": "user", "content": user }
    ])
}

#[async_trait]
impl ChartParameterSelector for ChatClient {
    async fn select(&self, request: &ChartParamRequest<'_>) -> Result<ChartParams> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages(CHART_SYSTEM_PROMPT, &chart_prompt(request)?),
            "response_format": {
                "type": "json_schema",
                "json_schema": {
                    "name": "chart_params",
                    "strict": true,
                    "schema": chart_params_schema()
                }
            }
        });
        let content = self.complete(body).await?;
        parse_chart_params(&content)
    }
}

#[async_trait]
impl SummaryGenerator for ChatClient {
    async fn summarize(&self, system: &str, prompt: &str) -> Result<String> {
        let body = json!({
            "model": self.model,
            "temperature": self.temperature,
            "messages": messages(system, prompt),
        });
        self.complete(body).await
    }
}

/// `choices[0].message.content` of a chat completion.
fn message_content(response: &Value) -> Result<String> {
    response
        .pointer("/choices/0/message/content")
        .and_then(Value::as_str)
        .map(|s| s.trim().to_string())
        .ok_or_else(|| anyhow!("Invalid chat response: missing choices[0].message.content"))
}

pub fn parse_chart_params(content: &str) -> Result<ChartParams> {
    serde_json::from_str(content)
        .context("model returned chart parameters that do not match the schema")
}

#[cfg(test)]
mod tests {
    use super::*;
    use finsight_core::models::{FilterType, VisualizationType};

    #[test]
    fn test_message_content() {
        let response = json!({
            "choices": [{ "message": { "role": "assistant", "content": " hello \n" } }]
        });
        assert_eq!(message_content(&response).unwrap(), "hello");
        assert!(message_content(&json!({"choices": []})).is_err());
    }

    #[test]
    fn test_parse_chart_params() {
        let content = r##"{
            "visualizationType": "pie",
            "dataGrouping": "by_category",
            "filterType": "expenses_only",
            "title": "Where the money went",
            "xAxis": "Category",
            "yAxis": "Amount",
            "colors": ["#ff0000"],
            "queryKeywords": []
        }"##;
        let params = parse_chart_params(content).unwrap();
        assert_eq!(params.visualization_type, VisualizationType::Pie);
        assert_eq!(params.filter_type, FilterType::ExpensesOnly);
    }

    #[test]
    fn test_parse_chart_params_rejects_unknown_filter() {
        let content = r##"{"visualizationType": "bar", "dataGrouping": "x",
            "filterType": "everything", "title": "t", "xAxis": "x", "yAxis": "y",
            "colors": ["#000"]}"##;
        assert!(parse_chart_params(content).is_err());
    }
}
