//! Knowledge unit service - validated, cached access to knowledge units

use std::sync::Arc;

use futures::future::join_all;
use moka::future::Cache;
use tokio::sync::Semaphore;
use tracing::{debug, info, warn};
use uuid::Uuid;

use super::repository::Repository;
use crate::config::AppConfig;
use crate::domain::knowledge::{
    normalize_domain, validate_domain, validate_knowledge_unit, validate_similarity,
};
use crate::domain::{IntegrationPoint, KnowledgeUnit, ResilientExecutor, StoreError};
use crate::infrastructure::connection::ConnectionManager;

/// Outcome of [`KnowledgeUnitService::save_batch`]
#[derive(Debug, Default)]
pub struct BatchResult {
    pub saved: Vec<String>,
    pub failed: Vec<(String, StoreError)>,
}

impl BatchResult {
    pub fn is_complete(&self) -> bool {
        self.failed.is_empty()
    }
}

/// Validated, cached access to knowledge units and their integration points
///
/// ```
/// use std::sync::Arc;
/// use acdkn_store::infrastructure::store::InMemoryDocumentStore;
/// use acdkn_store::{AppConfig, ConnectionManager, KnowledgeUnit, KnowledgeUnitService};
///
/// # tokio_test::block_on(async {
/// let connection = ConnectionManager::with_store("demo", Arc::new(InMemoryDocumentStore::new()));
/// let config = Arc::new(AppConfig::new("demo", "credentials.json"));
/// let service = KnowledgeUnitService::new(&connection, config).unwrap();
///
/// let unit = service
///     .create(KnowledgeUnit::new("", "Finance", "Rates rose"))
///     .await
///     .unwrap();
/// assert_eq!(service.get_required(unit.id()).await.unwrap().domain, "finance");
/// # });
/// ```
pub struct KnowledgeUnitService {
    units: Repository<KnowledgeUnit>,
    integrations: Repository<IntegrationPoint>,
    config: Arc<AppConfig>,
    cache: Cache<String, Arc<KnowledgeUnit>>,
    permits: Arc<Semaphore>,
}

impl std::fmt::Debug for KnowledgeUnitService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KnowledgeUnitService")
            .field("collection", &self.units.collection().name())
            .field("cached", &self.cache.entry_count())
            .finish()
    }
}

impl KnowledgeUnitService {
    pub fn new(connection: &ConnectionManager, config: Arc<AppConfig>) -> Result<Self, StoreError> {
        let executor = ResilientExecutor::new(config.retry_policy()?)?;

        let cache = Cache::builder()
            .time_to_live(config.cache_ttl()?)
            .max_capacity(config.max_knowledge_units as u64)
            .build();

        Ok(Self {
            units: Repository::new(connection.knowledge_units(), executor.clone()),
            integrations: Repository::new(connection.integration_points(), executor),
            permits: Arc::new(Semaphore::new(config.max_concurrent_operations.max(1))),
            config,
            cache,
        })
    }

    /// Stores a new unit, generating an id when none was given
    ///
    /// The id check is atomic in the store, so of two concurrent creates with the
    /// same id exactly one succeeds. The capacity check is a count taken before
    /// the write and may be overshot by concurrent creates.
    pub async fn create(&self, mut unit: KnowledgeUnit) -> Result<KnowledgeUnit, StoreError> {
        prepare(&mut unit);
        validate_knowledge_unit(&unit, &self.config.supported_domains)?;

        let count = self.units.count().await?;
        if count >= self.config.max_knowledge_units {
            return Err(StoreError::validation(format!(
                "Knowledge unit limit of {} reached",
                self.config.max_knowledge_units
            )));
        }

        if !self.units.insert(&unit).await? {
            return Err(StoreError::conflict(format!(
                "Knowledge unit '{}' already exists",
                unit.id()
            )));
        }

        self.cache
            .insert(unit.id().to_string(), Arc::new(unit.clone()))
            .await;

        info!(unit_id = %unit.id(), domain = %unit.domain, "Created knowledge unit");
        Ok(unit)
    }

    /// Fetches a unit, serving repeated reads from the cache
    pub async fn get(&self, id: &str) -> Result<Option<KnowledgeUnit>, StoreError> {
        if let Some(cached) = self.cache.get(id).await {
            debug!(unit_id = %id, "Cache hit for knowledge unit");
            return Ok(Some((*cached).clone()));
        }

        let unit = self.units.get(id).await?;
        if let Some(unit) = &unit {
            self.cache
                .insert(id.to_string(), Arc::new(unit.clone()))
                .await;
        }

        Ok(unit)
    }

    pub async fn get_required(&self, id: &str) -> Result<KnowledgeUnit, StoreError> {
        self.get(id)
            .await?
            .ok_or_else(|| StoreError::not_found(format!("Knowledge unit '{}' not found", id)))
    }

    /// Replaces an existing unit; `created_at` is carried over from the stored copy
    pub async fn update(&self, mut unit: KnowledgeUnit) -> Result<KnowledgeUnit, StoreError> {
        let existing = self.units.get(unit.id()).await?.ok_or_else(|| {
            StoreError::not_found(format!("Knowledge unit '{}' not found", unit.id()))
        })?;

        unit.keep_created_at(existing.created_at());
        unit.domain = normalize_domain(&unit.domain);
        unit.touch();
        validate_knowledge_unit(&unit, &self.config.supported_domains)?;

        self.units.save(&unit).await?;
        self.cache.invalidate(unit.id()).await;

        info!(unit_id = %unit.id(), "Updated knowledge unit");
        Ok(unit)
    }

    pub async fn delete(&self, id: &str) -> Result<bool, StoreError> {
        let deleted = self.units.delete(id).await?;
        self.cache.invalidate(id).await;

        if deleted {
            info!(unit_id = %id, "Deleted knowledge unit");
        }
        Ok(deleted)
    }

    pub async fn find_by_domain(&self, domain: &str) -> Result<Vec<KnowledgeUnit>, StoreError> {
        validate_domain(domain, &self.config.supported_domains)?;
        self.units.find_by("domain", normalize_domain(domain)).await
    }

    pub async fn count(&self) -> Result<usize, StoreError> {
        self.units.count().await
    }

    /// Writes units in chunks of `batch_size`, at most `max_concurrent_operations` at a time
    ///
    /// Invalid units and units past the capacity limit are reported in
    /// [`BatchResult::failed`] without stopping the rest of the batch.
    pub async fn save_batch(&self, units: Vec<KnowledgeUnit>) -> Result<BatchResult, StoreError> {
        let mut result = BatchResult::default();
        let mut remaining = self
            .config
            .max_knowledge_units
            .saturating_sub(self.units.count().await?);

        let mut accepted = Vec::with_capacity(units.len());
        for mut unit in units {
            prepare(&mut unit);
            if let Err(e) = validate_knowledge_unit(&unit, &self.config.supported_domains) {
                result.failed.push((unit.id().to_string(), e.into()));
                continue;
            }
            if remaining == 0 {
                result.failed.push((
                    unit.id().to_string(),
                    StoreError::validation(format!(
                        "Knowledge unit limit of {} reached",
                        self.config.max_knowledge_units
                    )),
                ));
                continue;
            }
            remaining -= 1;
            accepted.push(unit);
        }

        for chunk in accepted.chunks(self.config.batch_size.max(1)) {
            let writes = chunk.iter().map(|unit| async move {
                let _permit = self
                    .permits
                    .acquire()
                    .await
                    .map_err(|_| StoreError::internal("Operation semaphore closed"))?;
                self.units.save(unit).await
            });

            for (unit, outcome) in chunk.iter().zip(join_all(writes).await) {
                match outcome {
                    Ok(()) => {
                        self.cache.invalidate(unit.id()).await;
                        result.saved.push(unit.id().to_string());
                    }
                    Err(e) => {
                        warn!(unit_id = %unit.id(), error = %e, "Batch write failed");
                        result.failed.push((unit.id().to_string(), e));
                    }
                }
            }
        }

        info!(
            saved = result.saved.len(),
            failed = result.failed.len(),
            "Batch save finished"
        );
        Ok(result)
    }

    /// Records an integration point between two stored units
    pub async fn link(
        &self,
        source_id: &str,
        target_id: &str,
        similarity: f64,
    ) -> Result<IntegrationPoint, StoreError> {
        validate_similarity(similarity, self.config.similarity_threshold)?;

        let source = self.get_required(source_id).await?;
        let target = self.get_required(target_id).await?;

        let point = IntegrationPoint::between(&source, &target, similarity);
        self.integrations.save(&point).await?;

        info!(
            point_id = %point.id(),
            source = %source_id,
            target = %target_id,
            similarity,
            "Linked knowledge units"
        );
        Ok(point)
    }

    /// Integration points whose source is the given unit
    pub async fn integration_points_for(
        &self,
        unit_id: &str,
    ) -> Result<Vec<IntegrationPoint>, StoreError> {
        self.integrations.find_by("source_unit_id", unit_id).await
    }

    pub async fn unlink(&self, point_id: &str) -> Result<bool, StoreError> {
        self.integrations.delete(point_id).await
    }
}

/// Generates a missing id and normalizes the domain tag before validation
fn prepare(unit: &mut KnowledgeUnit) {
    if unit.id().is_empty() {
        unit.assign_id(Uuid::new_v4().to_string());
    }
    unit.domain = normalize_domain(&unit.domain);
}
