//! Cached content lookups
//!
//! Results are memoized on (student, concept, tier). A failed generation
//! yields a placeholder and a transient notice; whether that placeholder is
//! cached is an explicit setting (off by default, so the next request retries).

use lru::LruCache;
use serde::Serialize;
use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;
use tokio::sync::{Mutex, OnceCell};
use tracing::{debug, info, warn};

use super::llm::TextGenerator;
use super::prompt::{build_prompt, failure_notice, placeholder};
use crate::types::{Concept, MasteryTier};

const DEFAULT_CAPACITY: usize = 256;

/// Cache key for generated content
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ContentKey {
    pub student_id: u32,
    pub concept: Concept,
    pub tier: MasteryTier,
}

/// Text for one concept, plus any notice to surface to the user
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Content {
    pub text: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub notice: Option<String>,
    pub from_cache: bool,
}

impl Content {
    pub fn is_placeholder(&self) -> bool {
        self.notice.is_some()
    }
}

/// Generation shared by every caller waiting on the same key
type InFlight = Arc<OnceCell<Content>>;

struct CacheState {
    entries: LruCache<ContentKey, Content>,
    in_flight: HashMap<ContentKey, InFlight>,
}

/// Memoizing front for a text generator
pub struct ContentProvider {
    generator: Arc<dyn TextGenerator>,
    state: Mutex<CacheState>,
    cache_failures: bool,
}

impl ContentProvider {
    pub fn new(generator: Arc<dyn TextGenerator>, capacity: usize, cache_failures: bool) -> Self {
        let capacity = NonZeroUsize::new(capacity)
            .unwrap_or(NonZeroUsize::MIN.saturating_add(DEFAULT_CAPACITY - 1));
        Self {
            generator,
            state: Mutex::new(CacheState {
                entries: LruCache::new(capacity),
                in_flight: HashMap::new(),
            }),
            cache_failures,
        }
    }

    /// Content for one (student, concept, tier).
    ///
    /// Never fails: a generator error becomes placeholder text with a notice.
    /// Concurrent callers for the same key share a single generator call.
    /// The caller is expected to have checked that the student exists.
    pub async fn get_content(&self, student_id: u32, concept: Concept, tier: MasteryTier) -> Content {
        let key = ContentKey {
            student_id,
            concept,
            tier,
        };

        let cell = {
            let mut state = self.state.lock().await;
            if let Some(hit) = state.entries.get(&key) {
                debug!("Content cache hit: {:?}", key);
                return Content {
                    from_cache: true,
                    ..hit.clone()
                };
            }
            state.in_flight.entry(key).or_default().clone()
        };

        let mut generated_here = false;
        let content = cell
            .get_or_init(|| {
                generated_here = true;
                self.generate(key)
            })
            .await
            .clone();

        if !generated_here {
            debug!("Joined in-flight generation: {:?}", key);
            return Content {
                from_cache: true,
                ..content
            };
        }

        let mut state = self.state.lock().await;
        if !content.is_placeholder() || self.cache_failures {
            state.entries.put(key, content.clone());
        }
        state.in_flight.remove(&key);
        content
    }

    async fn generate(&self, key: ContentKey) -> Content {
        let ContentKey {
            student_id,
            concept,
            tier,
        } = key;
        let prompt = build_prompt(student_id, concept, tier);
        match self.generator.generate(&prompt).await {
            Ok(text) => {
                info!("Generated content for student {} {} ({})", student_id, concept, tier);
                Content {
                    text,
                    notice: None,
                    from_cache: false,
                }
            }
            Err(e) => {
                warn!("Content generation failed for student {} {}: {:#}", student_id, concept, e);
                Content {
                    text: placeholder(concept),
                    notice: Some(failure_notice(concept, &e)),
                    from_cache: false,
                }
            }
        }
    }

    /// Drop every cached entry for a student; returns how many were removed
    pub async fn invalidate_student(&self, student_id: u32) -> usize {
        let mut state = self.state.lock().await;
        let stale: Vec<ContentKey> = state
            .entries
            .iter()
            .filter(|(k, _)| k.student_id == student_id)
            .map(|(k, _)| *k)
            .collect();
        for key in &stale {
            state.entries.pop(key);
        }
        if !stale.is_empty() {
            debug!("Invalidated {} cached entries for student {}", stale.len(), student_id);
        }
        stale.len()
    }

    pub async fn cached_entries(&self) -> usize {
        self.state.lock().await.entries.len()
    }
}
