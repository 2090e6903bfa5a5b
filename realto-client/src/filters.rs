//! Shared filter state for realty list views
//!
//! One filter service is shared by a list view and its filter panel; every
//! mutation broadcasts a change notification, which the pager turns into an
//! automatic reload.

use std::sync::RwLock;
use tokio::sync::broadcast;
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    fn as_str(&self) -> &'static str {
        match self {
            SortDirection::Asc => "asc",
            SortDirection::Desc => "desc",
        }
    }
}

/// Column sorting choice
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSort {
    pub field: String,
    pub direction: SortDirection,
}

/// Filter set applied to a realty list
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RealtyListFilter {
    pub query: Option<String>,
    pub city: Option<String>,
    pub action: Option<String>,
    pub entity: Option<String>,
    pub is_published: Option<bool>,
    pub sort: Option<TableSort>,
}

impl RealtyListFilter {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    /// Render the filter into the query-parameter list sent to the API
    pub fn to_query_params(&self) -> Vec<(String, String)> {
        let mut params: Vec<(String, String)> = Vec::new();

        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }
        if let Some(city) = &self.city {
            params.push(("city".to_string(), city.clone()));
        }
        if let Some(action) = &self.action {
            params.push(("action".to_string(), action.clone()));
        }
        if let Some(entity) = &self.entity {
            params.push(("entity".to_string(), entity.clone()));
        }
        if let Some(is_published) = self.is_published {
            params.push(("is_published".to_string(), is_published.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort_by".to_string(), sort.field.clone()));
            params.push(("sort_dir".to_string(), sort.direction.as_str().to_string()));
        }

        params
    }
}

/// Notification that the filter set changed
#[derive(Debug, Clone)]
pub struct FilterChange;

/// Owner of the filter state shared between a list view and its filter panel
pub struct RealtyFilterService {
    filter: RwLock<RealtyListFilter>,
    changes: broadcast::Sender<FilterChange>,
}

impl RealtyFilterService {
    pub fn new() -> Self {
        let (changes, _) = broadcast::channel(16);

        Self {
            filter: RwLock::new(RealtyListFilter::default()),
            changes,
        }
    }

    pub fn filters(&self) -> RealtyListFilter {
        self.filter.read().unwrap().clone()
    }

    pub fn has_filters(&self) -> bool {
        !self.filter.read().unwrap().is_empty()
    }

    /// Replace the filter set wholesale
    pub fn set_filters(&self, filter: RealtyListFilter) {
        *self.filter.write().unwrap() = filter;
        self.notify();
    }

    /// Apply a targeted mutation to the current filter set
    pub fn update(&self, mutate: impl FnOnce(&mut RealtyListFilter)) {
        mutate(&mut self.filter.write().unwrap());
        self.notify();
    }

    pub fn change_sorting(&self, sort: TableSort) {
        self.filter.write().unwrap().sort = Some(sort);
        self.notify();
    }

    pub fn clear(&self) {
        *self.filter.write().unwrap() = RealtyListFilter::default();
        self.notify();
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FilterChange> {
        self.changes.subscribe()
    }

    fn notify(&self) {
        debug!("Realty filters changed");
        let _ = self.changes.send(FilterChange);
    }
}

impl Default for RealtyFilterService {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_has_filters_and_clear() {
        let service = RealtyFilterService::new();
        assert!(!service.has_filters());

        service.update(|filter| filter.city = Some("Riga".to_string()));
        assert!(service.has_filters());

        service.clear();
        assert!(!service.has_filters());
    }

    #[test]
    fn test_query_params_cover_set_fields_only() {
        let filter = RealtyListFilter {
            query: Some("loft".to_string()),
            is_published: Some(true),
            sort: Some(TableSort {
                field: "created".to_string(),
                direction: SortDirection::Desc,
            }),
            ..Default::default()
        };

        let params = filter.to_query_params();
        assert!(params.contains(&("query".to_string(), "loft".to_string())));
        assert!(params.contains(&("is_published".to_string(), "true".to_string())));
        assert!(params.contains(&("sort_by".to_string(), "created".to_string())));
        assert!(params.contains(&("sort_dir".to_string(), "desc".to_string())));
        assert!(!params.iter().any(|(key, _)| key == "city"));
    }

    #[tokio::test]
    async fn test_every_mutation_broadcasts_a_change() {
        let service = RealtyFilterService::new();
        let mut changes = service.subscribe();

        service.update(|filter| filter.query = Some("flat".to_string()));
        service.change_sorting(TableSort {
            field: "created".to_string(),
            direction: SortDirection::Asc,
        });
        service.clear();

        for _ in 0..3 {
            changes.recv().await.unwrap();
        }
    }
}
