//! Entity-keyed observation history with bounded FIFO windows.
//!
//! The map sits behind an `RwLock` and each entity behind its own `Mutex`:
//! appends to one entity serialize, appends to different entities only
//! share the brief map read lock.

use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::{Arc, Mutex, PoisonError, RwLock};

use serde::Serialize;
use tracing::debug;

use geowatch_core::{Magnitude, Result};

use crate::confidence::{ConfidenceCalculator, ConfidenceResult};

#[derive(Debug)]
struct EntityHistory {
    values: VecDeque<f64>,
    /// Most recent explicit domain.
    domain: Option<String>,
}

/// Copy of one entity's history at a point in time.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HistorySnapshot {
    pub values: Vec<f64>,
    pub domain: Option<String>,
}

#[derive(Debug)]
pub struct HistoryTracker {
    calculator: ConfidenceCalculator,
    entities: RwLock<HashMap<String, Arc<Mutex<EntityHistory>>>>,
}

impl HistoryTracker {
    pub fn new(calculator: ConfidenceCalculator) -> Self {
        Self {
            calculator,
            entities: RwLock::new(HashMap::new()),
        }
    }

    fn capacity(&self) -> usize {
        self.calculator.history_config().window.max(1)
    }

    fn entry(&self, entity: &str) -> Arc<Mutex<EntityHistory>> {
        if let Some(e) = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
        {
            return Arc::clone(e);
        }
        let mut map = self.entities.write().unwrap_or_else(PoisonError::into_inner);
        let capacity = self.capacity();
        Arc::clone(map.entry(entity.to_string()).or_insert_with(|| {
            debug!(entity = %entity, "tracking new entity");
            Arc::new(Mutex::new(EntityHistory {
                values: VecDeque::with_capacity(capacity),
                domain: None,
            }))
        }))
    }

    fn existing(&self, entity: &str) -> Option<Arc<Mutex<EntityHistory>>> {
        self.entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(entity)
            .cloned()
    }

    /// Append one magnitude, evicting the oldest once the window is full.
    pub fn record(&self, entity: &str, magnitude: f64, domain: Option<&str>) -> Result<()> {
        self.record_batch(entity, &[magnitude], domain)
    }

    /// Append several magnitudes in order. Nothing is recorded if any
    /// value is out of range.
    pub fn record_batch(&self, entity: &str, magnitudes: &[f64], domain: Option<&str>) -> Result<()> {
        let validated = Magnitude::validate_all(magnitudes)?;
        let capacity = self.capacity();
        let entry = self.entry(entity);
        let mut history = entry.lock().unwrap_or_else(PoisonError::into_inner);
        for m in validated {
            if history.values.len() == capacity {
                history.values.pop_front();
            }
            history.values.push_back(m.value());
        }
        if let Some(d) = domain {
            history.domain = Some(d.to_string());
        }
        Ok(())
    }

    pub fn snapshot(&self, entity: &str) -> Option<HistorySnapshot> {
        let entry = self.existing(entity)?;
        let history = entry.lock().unwrap_or_else(PoisonError::into_inner);
        Some(HistorySnapshot {
            values: history.values.iter().copied().collect(),
            domain: history.domain.clone(),
        })
    }

    /// Confidence of an entity's history under its remembered domain.
    pub fn confidence(&self, entity: &str, current: Option<f64>) -> ConfidenceResult {
        match self.snapshot(entity) {
            Some(s) => self
                .calculator
                .calculate(&s.values, current, s.domain.as_deref()),
            None => ConfidenceResult::insufficient(0, "No observations available for this entity"),
        }
    }

    /// Confidence of every tracked entity, keyed by entity id.
    pub fn all_confidences(&self) -> BTreeMap<String, ConfidenceResult> {
        self.entities()
            .into_iter()
            .map(|e| {
                let c = self.confidence(&e, None);
                (e, c)
            })
            .collect()
    }

    /// Forget one entity. Returns whether it was tracked.
    pub fn clear_entity(&self, entity: &str) -> bool {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(entity)
            .is_some()
    }

    pub fn clear_all(&self) {
        self.entities
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .clear();
    }

    /// Tracked entity ids, sorted.
    pub fn entities(&self) -> Vec<String> {
        let mut ids: Vec<String> = self
            .entities
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .keys()
            .cloned()
            .collect();
        ids.sort();
        ids
    }
}
