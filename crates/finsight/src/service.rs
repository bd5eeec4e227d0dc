//! Process-wide collaborators and the CLI command runners.
//!
//! [`AppServices`] owns the store, embedder and chat clients built from
//! config. The server shares it behind an `Arc`; the `ask`, `chart` and
//! `seed` commands use it directly.

use anyhow::Result;
use std::sync::Arc;

use finsight_core::chart::ChartOutcome;
use finsight_core::embedding::EmbeddingProvider;
use finsight_core::generation::{ChartParameterSelector, SummaryGenerator};
use finsight_core::pipeline::{Pipeline, PipelineError, PipelineSettings, SummaryResponse};
use finsight_core::store::memory::InMemoryVectorStore;
use finsight_core::store::VectorStore;

use crate::config::Config;
use crate::embedding::create_provider;
use crate::llm::ChatClient;
use crate::pinecone::PineconeStore;
use crate::seed::{SeedReport, SeedState};

pub struct AppServices {
    pub settings: PipelineSettings,
    pub store: Arc<dyn VectorStore>,
    pub embedder: Arc<dyn EmbeddingProvider>,
    pub selector: Arc<dyn ChartParameterSelector>,
    pub generator: Arc<dyn SummaryGenerator>,
}

impl AppServices {
    pub fn from_config(config: &Config) -> Result<Self> {
        let store: Arc<dyn VectorStore> = match config.store.provider.as_str() {
            "pinecone" => Arc::new(PineconeStore::new(&config.store)?),
            _ => Arc::new(InMemoryVectorStore::new()),
        };
        let chat = Arc::new(ChatClient::new(&config.llm)?);

        Ok(Self {
            settings: config.pipeline_settings(),
            store,
            embedder: create_provider(&config.embedding)?,
            selector: chat.clone(),
            generator: chat,
        })
    }

    pub fn pipeline(&self) -> Pipeline<'_> {
        Pipeline {
            store: self.store.as_ref(),
            embedder: self.embedder.as_ref(),
            settings: &self.settings,
        }
    }

    pub async fn ask(&self, query: &str) -> Result<SummaryResponse, PipelineError> {
        self.pipeline()
            .summarize(self.generator.as_ref(), query)
            .await
    }

    pub async fn chart(&self, query: &str) -> Result<ChartOutcome, PipelineError> {
        self.pipeline()
            .visualize(self.selector.as_ref(), query)
            .await
    }

    /// Seed from `[seed].path` when configured.
    pub async fn seed(&self, config: &Config, state: &mut SeedState) -> Result<Option<SeedReport>> {
        let Some(path) = &config.seed.path else {
            tracing::debug!("no seed file configured");
            return Ok(None);
        };
        state
            .ensure_seeded(
                path,
                config.seed.batch_size,
                &self.settings.index,
                self.embedder.as_ref(),
                self.store.as_ref(),
            )
            .await
    }
}

/// The in-memory store starts empty in every process, so one-shot commands
/// seed it first. Persistent stores are seeded by `finsight seed`.
async fn prepare(config: &Config) -> Result<AppServices> {
    let services = AppServices::from_config(config)?;
    if config.store.provider == "memory" {
        services.seed(config, &mut SeedState::new()).await?;
    }
    Ok(services)
}

/// `finsight seed`
pub async fn run_seed(config: &Config) -> Result<()> {
    let services = AppServices::from_config(config)?;
    match services.seed(config, &mut SeedState::new()).await? {
        Some(report) => println!(
            "Seeded {} transactions in {} documents.",
            report.transactions, report.documents
        ),
        None => println!("No seed file configured ([seed].path)."),
    }
    Ok(())
}

/// `finsight ask "<query>"`
pub async fn run_ask(config: &Config, query: &str) -> Result<()> {
    let services = prepare(config).await?;
    let response = services.ask(query).await?;
    println!("{}", response.summary);
    Ok(())
}

/// `finsight chart "<query>"`
pub async fn run_chart(config: &Config, query: &str) -> Result<()> {
    let services = prepare(config).await?;
    let outcome = services.chart(query).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
