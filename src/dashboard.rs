//! Dashboard service
//!
//! Owns the level store (behind a single async mutex, so every mutation and
//! its persist happen under one writer) and the content provider. The CLI
//! and the HTTP server both go through this type.

use anyhow::{Context, Result};
use serde::Serialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::info;

use crate::config::Config;
use crate::content::{Content, ContentProvider, LlmClient, TextGenerator};
use crate::levels::{
    self, apply_manual_update, IngestColumns, IngestError, IngestReport, LevelError, LevelStore,
    ManualOutcome, RowOutcome,
};
use crate::types::{ChartPoint, Concept, MasteryTier};

/// A student's identity and level chart
#[derive(Debug, Clone, Serialize)]
pub struct StudentView {
    pub id: u32,
    pub name: String,
    pub levels: Vec<ChartPoint>,
}

/// Generated content for one concept of one student
#[derive(Debug, Clone, Serialize)]
pub struct ConceptContent {
    pub concept: Concept,
    pub gloss: &'static str,
    pub tier: MasteryTier,
    #[serde(flatten)]
    pub content: Content,
}

pub struct Dashboard {
    store: Mutex<LevelStore>,
    content: ContentProvider,
    columns: IngestColumns,
    invalidate_on_write: bool,
}

impl Dashboard {
    pub fn new(store: LevelStore, content: ContentProvider, columns: IngestColumns) -> Self {
        Self {
            store: Mutex::new(store),
            content,
            columns,
            invalidate_on_write: false,
        }
    }

    /// Drop a student's cached content whenever their levels change
    pub fn with_invalidate_on_write(mut self, enabled: bool) -> Self {
        self.invalidate_on_write = enabled;
        self
    }

    /// Build from configuration. Fails if the API key is missing or the
    /// level store cannot be loaded.
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = crate::security::get_api_key(&config.content.api_key_env)?;
        let client = LlmClient::from_config(&config.content, api_key)?;
        Self::with_generator(config, Arc::new(client))
    }

    /// Build from configuration with an explicit generator
    pub fn with_generator(config: &Config, generator: Arc<dyn TextGenerator>) -> Result<Self> {
        let store = LevelStore::open(&config.store.path)
            .with_context(|| format!("Cannot start without the level store {}", config.store.path.display()))?;
        let content = ContentProvider::new(
            generator,
            config.content.cache_capacity,
            config.content.cache_failures,
        );
        Ok(Self::new(store, content, config.ingest.clone())
            .with_invalidate_on_write(config.content.invalidate_on_write))
    }

    /// Look up one student; `None` if the id is unknown
    pub async fn student(&self, id: u32) -> Option<StudentView> {
        let store = self.store.lock().await;
        store.find(id).map(|record| StudentView {
            id: record.id,
            name: record.name.clone(),
            levels: ChartPoint::series(record),
        })
    }

    /// Content for every concept at the student's current tier.
    /// Unknown ids return `None` without any content request.
    pub async fn student_content(&self, id: u32) -> Option<Vec<ConceptContent>> {
        // Snapshot the tiers so the store lock is not held across generation
        let levels: Vec<(Concept, MasteryTier)> = {
            let store = self.store.lock().await;
            store.find(id)?.levels().collect()
        };

        let mut out = Vec::with_capacity(levels.len());
        for (concept, tier) in levels {
            let content = self.content.get_content(id, concept, tier).await;
            out.push(ConceptContent {
                concept,
                gloss: concept.gloss(),
                tier,
                content,
            });
        }
        Some(out)
    }

    /// Apply an uploaded exam-results CSV
    pub async fn ingest_upload<R: std::io::Read>(&self, reader: R) -> Result<IngestReport, IngestError> {
        let report = {
            let mut store = self.store.lock().await;
            levels::ingest(&mut store, reader, &self.columns)?
        };

        if self.invalidate_on_write {
            for outcome in &report.outcomes {
                if let RowOutcome::Updated { student_id, .. } = outcome {
                    self.content.invalidate_student(*student_id).await;
                }
            }
        }
        Ok(report)
    }

    /// Operator edit of one (student, concept) cell
    pub async fn manual_update(
        &self,
        student_id: u32,
        concept: Concept,
        tier: MasteryTier,
    ) -> Result<ManualOutcome, LevelError> {
        let outcome = {
            let mut store = self.store.lock().await;
            apply_manual_update(&mut store, student_id, concept, tier)?
        };

        if self.invalidate_on_write {
            if let ManualOutcome::Updated { .. } = outcome {
                self.content.invalidate_student(student_id).await;
            }
        }
        Ok(outcome)
    }

    pub async fn student_count(&self) -> usize {
        self.store.lock().await.len()
    }

    pub async fn store_location(&self) -> String {
        self.store.lock().await.location()
    }

    pub fn content(&self) -> &ContentProvider {
        &self.content
    }

    pub async fn log_summary(&self) {
        info!(
            "Dashboard ready: {} students from {}",
            self.student_count().await,
            self.store_location().await
        );
    }
}
