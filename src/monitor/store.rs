use std::sync::{Mutex, MutexGuard, PoisonError};
use thiserror::Error;
use tracing::{debug, info};

use super::locations::lookup_location_id;
use super::models::MonitorTarget;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    #[error("Monitoring target not found: {0}")]
    NotFound(String),
    #[error("No monitoring target selected")]
    NoSelection,
}

/// Resolves `(postal_code, country)` to a marketplace location id.
pub type LocationResolver = fn(&str, &str) -> Option<String>;

#[derive(Debug, Default)]
struct StoreState {
    // Insertion order is the display and polling order.
    targets: Vec<MonitorTarget>,
    selected: Option<String>,
    last_id: u64,
}

impl StoreState {
    fn position(&self, name: &str) -> Option<usize> {
        self.targets.iter().position(|t| t.name == name)
    }
}

/// In-memory set of monitor targets plus the selection used by attribute commands.
///
/// All access goes through one lock, so readers always see whole entries:
/// a poll cycle never observes a target with half-applied updates.
#[derive(Debug)]
pub struct TargetStore {
    state: Mutex<StoreState>,
    resolver: LocationResolver,
}

impl Default for TargetStore {
    fn default() -> Self {
        Self::new()
    }
}

impl TargetStore {
    pub fn new() -> Self {
        Self::with_resolver(lookup_location_id)
    }

    pub fn with_resolver(resolver: LocationResolver) -> Self {
        Self {
            state: Mutex::new(StoreState::default()),
            resolver,
        }
    }

    fn lock(&self) -> MutexGuard<'_, StoreState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn update<R>(
        &self,
        name: &str,
        apply: impl FnOnce(&mut MonitorTarget) -> R,
    ) -> Result<R, StoreError> {
        let mut state = self.lock();
        let idx = state
            .position(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        Ok(apply(&mut state.targets[idx]))
    }

    /// Inserts an empty target. Returns `false` and leaves the existing entry
    /// untouched when the name is already taken.
    pub fn add(&self, name: &str) -> bool {
        let mut state = self.lock();
        if state.position(name).is_some() {
            debug!(target_name = %name, "Monitoring target already exists, keeping it.");
            return false;
        }
        state.last_id += 1;
        let target = MonitorTarget {
            id: state.last_id,
            ..MonitorTarget::new(name)
        };
        state.targets.push(target);
        info!(target_name = %name, target_id = state.last_id, "Added monitoring target.");
        true
    }

    /// Selects `name` if it exists. On a miss the previous selection is kept.
    pub fn select(&self, name: &str) -> bool {
        let mut state = self.lock();
        if state.position(name).is_none() {
            return false;
        }
        state.selected = Some(name.to_string());
        true
    }

    /// The selected name. It may refer to a target that was deleted since.
    pub fn selected(&self) -> Option<String> {
        self.lock().selected.clone()
    }

    /// Resolves the selection for attribute commands.
    pub fn selected_or_err(&self) -> Result<String, StoreError> {
        self.selected().ok_or(StoreError::NoSelection)
    }

    pub fn delete(&self, name: &str) -> Result<MonitorTarget, StoreError> {
        let mut state = self.lock();
        let idx = state
            .position(name)
            .ok_or_else(|| StoreError::NotFound(name.to_string()))?;
        let removed = state.targets.remove(idx);
        info!(target_name = %name, "Deleted monitoring target.");
        Ok(removed)
    }

    pub fn set_keywords(&self, name: &str, keywords: &str) -> Result<(), StoreError> {
        self.update(name, |t| t.keywords = Some(keywords.to_string()))
    }

    /// Stores the postal code and country and resolves the location id.
    /// An unknown pair clears the id, leaving the target unpollable.
    pub fn set_location(
        &self,
        name: &str,
        postal_code: &str,
        country: &str,
    ) -> Result<Option<String>, StoreError> {
        let location_id = (self.resolver)(postal_code, country);
        if location_id.is_none() {
            debug!(target_name = %name, postal_code, country, "Location could not be resolved.");
        }
        self.update(name, |t| {
            t.location_id = location_id.clone();
            t.postal_code = Some(postal_code.to_string());
            t.country = Some(country.to_string());
        })?;
        Ok(location_id)
    }

    pub fn set_price_range(&self, name: &str, min: u64, max: u64) -> Result<(), StoreError> {
        self.update(name, |t| {
            t.min_price = Some(min);
            t.max_price = Some(max);
        })
    }

    pub fn set_radius(&self, name: &str, radius_km: u32) -> Result<(), StoreError> {
        self.update(name, |t| t.radius = Some(radius_km))
    }

    /// Whether the named target exists and is eligible for polling.
    pub fn valid(&self, name: &str) -> bool {
        let state = self.lock();
        state
            .position(name)
            .is_some_and(|idx| state.targets[idx].is_valid())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.lock().position(name).is_some()
    }

    pub fn get(&self, name: &str) -> Option<MonitorTarget> {
        let state = self.lock();
        state.position(name).map(|idx| state.targets[idx].clone())
    }

    /// Snapshot of every target in insertion order.
    pub fn list(&self) -> Vec<MonitorTarget> {
        self.lock().targets.clone()
    }

    pub fn names(&self) -> Vec<String> {
        self.lock().targets.iter().map(|t| t.name.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.lock().targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().targets.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resolve_test_location(postal_code: &str, country: &str) -> Option<String> {
        match (postal_code, country) {
            ("1000", "XX") => Some("X".to_string()),
            _ => None,
        }
    }

    fn store() -> TargetStore {
        TargetStore::with_resolver(resolve_test_location)
    }

    #[test]
    fn test_add_is_idempotent_and_keeps_fields() {
        let store = store();
        assert!(store.add("bike"));
        store.set_keywords("bike", "red bike").unwrap();

        assert!(!store.add("bike"));
        assert_eq!(store.len(), 1);
        assert_eq!(
            store.get("bike").unwrap().keywords.as_deref(),
            Some("red bike")
        );
    }

    #[test]
    fn test_recreated_target_gets_new_id() {
        let store = store();
        store.add("a");
        store.add("b");
        let first = store.get("a").unwrap().id;
        assert_ne!(first, store.get("b").unwrap().id);

        store.delete("a").unwrap();
        store.add("a");
        let recreated = store.get("a").unwrap();
        assert_ne!(recreated.id, first);
        assert_eq!(recreated.keywords, None);
    }

    #[test]
    fn test_list_preserves_insertion_order() {
        let store = store();
        for name in ["zeta", "alpha", "mid"] {
            store.add(name);
        }
        let names: Vec<String> = store.list().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["zeta", "alpha", "mid"]);
        assert_eq!(store.names(), names);
    }

    #[test]
    fn test_select_unknown_keeps_previous_selection() {
        let store = store();
        store.add("a");
        assert!(store.select("a"));
        assert!(!store.select("missing"));
        assert_eq!(store.selected().as_deref(), Some("a"));
    }

    #[test]
    fn test_selection_errors_when_nothing_selected() {
        let store = store();
        assert_eq!(store.selected_or_err(), Err(StoreError::NoSelection));
    }

    #[test]
    fn test_delete_missing_is_not_found() {
        let store = store();
        assert_eq!(
            store.delete("ghost"),
            Err(StoreError::NotFound("ghost".to_string()))
        );
    }

    #[test]
    fn test_delete_removes_from_list() {
        let store = store();
        store.add("a");
        store.add("b");
        let removed = store.delete("a").unwrap();
        assert_eq!(removed.name, "a");
        assert_eq!(store.names(), vec!["b"]);
        assert!(!store.contains("a"));
    }

    #[test]
    fn test_mutating_missing_target_is_not_found() {
        let store = store();
        let missing = StoreError::NotFound("nope".to_string());
        assert_eq!(store.set_keywords("nope", "x"), Err(missing.clone()));
        assert_eq!(store.set_price_range("nope", 1, 2), Err(missing.clone()));
        assert_eq!(store.set_radius("nope", 5), Err(missing.clone()));
        assert_eq!(store.set_location("nope", "1000", "XX"), Err(missing));
    }

    #[test]
    fn test_set_location_resolves_id() {
        let store = store();
        store.add("a");
        let id = store.set_location("a", "1000", "XX").unwrap();
        assert_eq!(id.as_deref(), Some("X"));

        let target = store.get("a").unwrap();
        assert_eq!(target.location_id.as_deref(), Some("X"));
        assert_eq!(target.postal_code.as_deref(), Some("1000"));
        assert_eq!(target.country.as_deref(), Some("XX"));
    }

    #[test]
    fn test_unresolved_location_leaves_target_invalid() {
        let store = store();
        store.add("a");
        store.set_keywords("a", "lamp").unwrap();
        store.set_location("a", "1000", "XX").unwrap();
        assert!(store.valid("a"));

        assert_eq!(store.set_location("a", "9999", "XX").unwrap(), None);
        let target = store.get("a").unwrap();
        assert_eq!(target.location_id, None);
        assert_eq!(target.postal_code.as_deref(), Some("9999"));
        assert!(!store.valid("a"));
    }

    #[test]
    fn test_price_and_radius_only_touch_their_fields() {
        let store = store();
        store.add("a");
        store.set_keywords("a", "desk").unwrap();
        store.set_price_range("a", 10, 50).unwrap();
        store.set_radius("a", 5).unwrap();

        let target = store.get("a").unwrap();
        assert_eq!(target.keywords.as_deref(), Some("desk"));
        assert_eq!(target.min_price, Some(10));
        assert_eq!(target.max_price, Some(50));
        assert_eq!(target.radius, Some(5));
        assert_eq!(target.location_id, None);
    }

    #[test]
    fn test_valid_is_false_for_unknown_name() {
        assert!(!store().valid("missing"));
    }
}
