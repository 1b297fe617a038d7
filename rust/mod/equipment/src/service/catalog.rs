use std::collections::BTreeSet;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::{Duration, Instant};

use tracing::{debug, warn};

use crate::model::Equipment;
use crate::service::source::EquipmentSource;
use crate::service::EquipmentError;

/// Default lifetime of a fetched sheet.
pub const DEFAULT_TTL_SECS: u64 = 300;

/// Filter for [`Catalog::list`]. Empty fields match everything.
#[derive(Debug, Clone, Default)]
pub struct EquipmentFilter {
    pub area: Option<String>,
    pub q: Option<String>,
}

struct CacheEntry {
    items: Arc<Vec<Equipment>>,
    fetched_at: Instant,
}

/// Read-only equipment catalog with a TTL cache over its source.
pub struct Catalog {
    source: Arc<dyn EquipmentSource>,
    ttl: Duration,
    cache: RwLock<Option<CacheEntry>>,
}

impl Catalog {
    pub fn new(source: Arc<dyn EquipmentSource>, ttl_secs: u64) -> Self {
        Self {
            source,
            ttl: Duration::from_secs(ttl_secs),
            cache: RwLock::new(None),
        }
    }

    fn fresh(&self) -> Option<Arc<Vec<Equipment>>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache
            .as_ref()
            .filter(|entry| entry.fetched_at.elapsed() < self.ttl)
            .map(|entry| entry.items.clone())
    }

    fn stale(&self) -> Option<Arc<Vec<Equipment>>> {
        let cache = self.cache.read().unwrap_or_else(PoisonError::into_inner);
        cache.as_ref().map(|entry| entry.items.clone())
    }

    /// Every record, fetching the sheet when the cache is empty or expired.
    ///
    /// A failed fetch falls back to the expired entry when there is one.
    pub async fn all(&self) -> Result<Arc<Vec<Equipment>>, EquipmentError> {
        if let Some(items) = self.fresh() {
            return Ok(items);
        }

        match self.source.fetch_rows().await {
            Ok(rows) => {
                let items: Arc<Vec<Equipment>> =
                    Arc::new(rows.iter().filter_map(Equipment::from_row).collect());
                debug!(rows = rows.len(), items = items.len(), "equipment catalog refreshed");
                let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
                *cache = Some(CacheEntry {
                    items: items.clone(),
                    fetched_at: Instant::now(),
                });
                Ok(items)
            }
            Err(e) => match self.stale() {
                Some(items) => {
                    warn!(error = %e, "equipment sheet unavailable, serving cached copy");
                    Ok(items)
                }
                None => Err(e),
            },
        }
    }

    pub async fn get(&self, code: &str) -> Result<Equipment, EquipmentError> {
        let code = code.trim();
        self.all()
            .await?
            .iter()
            .find(|e| e.code == code)
            .cloned()
            .ok_or_else(|| EquipmentError::NotFound(format!("Equipo {code} no encontrado.")))
    }

    /// Distinct non-empty areas, sorted.
    pub async fn areas(&self) -> Result<Vec<String>, EquipmentError> {
        let items = self.all().await?;
        let areas: BTreeSet<&str> = items
            .iter()
            .map(|e| e.area.as_str())
            .filter(|a| !a.is_empty())
            .collect();
        Ok(areas.into_iter().map(str::to_string).collect())
    }

    /// Records in sheet order, narrowed by area and a free-text query.
    pub async fn list(&self, filter: &EquipmentFilter) -> Result<Vec<Equipment>, EquipmentError> {
        let items = self.all().await?;
        let area = filter.area.as_deref().map(str::trim).filter(|a| !a.is_empty());
        let needle = filter
            .q
            .as_deref()
            .map(|q| q.trim().to_lowercase())
            .filter(|q| !q.is_empty());

        Ok(items
            .iter()
            .filter(|e| area.map_or(true, |a| e.area == a))
            .filter(|e| needle.as_deref().map_or(true, |n| e.matches(n)))
            .cloned()
            .collect())
    }

    /// Drop the cached sheet; the next read fetches it again.
    pub fn invalidate(&self) {
        let mut cache = self.cache.write().unwrap_or_else(PoisonError::into_inner);
        *cache = None;
    }
}
