//! Realtor endpoints: lists, moderation queues, profile info

use log::{debug, info};
use realto_core::{RealtoResult, RealtorProfile, RealtorSummary, RealtorUpdate};

use crate::http::{ApiClient, ApiEnvelope, ListPayload};

/// Text queries shorter than this go to the plain list endpoint instead of
/// the search endpoint.
const MIN_SEARCH_LENGTH: usize = 3;

/// Query parameters accepted by the realtor list endpoints
#[derive(Debug, Clone, Default)]
pub struct RealtorListQuery {
    pub page: u32,
    pub query: Option<String>,
}

impl RealtorListQuery {
    pub fn page(page: u32) -> Self {
        Self {
            page,
            query: None,
        }
    }

    pub fn with_query(mut self, query: impl Into<String>) -> Self {
        self.query = Some(query.into());
        self
    }

    fn wants_search(&self) -> bool {
        self.query
            .as_ref()
            .map(|q| q.chars().count() >= MIN_SEARCH_LENGTH)
            .unwrap_or(false)
    }

    fn to_params(&self) -> Vec<(String, String)> {
        let mut params = vec![("page".to_string(), self.page.max(1).to_string())];

        if let Some(query) = &self.query {
            params.push(("query".to_string(), query.clone()));
        }

        params
    }
}

/// Endpoint group for realtor management
#[derive(Clone)]
pub struct RealtorsApi {
    client: ApiClient,
}

impl RealtorsApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }

    /// Shared loader for every realtor list feed. Routes to the search
    /// endpoint when the text query is long enough to be meaningful.
    async fn load_list(
        &self,
        base_path: &str,
        query: &RealtorListQuery,
    ) -> RealtoResult<ListPayload<RealtorSummary>> {
        let path = if query.wants_search() {
            format!("{}/search", base_path)
        } else {
            base_path.to_string()
        };

        debug!("Loading realtor list from {}", path);

        let envelope: ApiEnvelope<ListPayload<RealtorSummary>> =
            self.client.get_json(&path, &query.to_params()).await?;
        Ok(envelope.data)
    }

    /// All realtors
    pub async fn list(
        &self,
        query: &RealtorListQuery,
    ) -> RealtoResult<ListPayload<RealtorSummary>> {
        self.load_list("realtors", query).await
    }

    /// Realtors awaiting promotion moderation
    pub async fn increase_moderation_list(
        &self,
        query: &RealtorListQuery,
    ) -> RealtoResult<ListPayload<RealtorSummary>> {
        self.load_list("realtors/moderation/increase", query).await
    }

    /// Realtors awaiting profile-change moderation
    pub async fn update_moderation_list(
        &self,
        query: &RealtorListQuery,
    ) -> RealtoResult<ListPayload<RealtorSummary>> {
        self.load_list("realtors/moderation/update", query).await
    }

    /// Approve a pending moderation request
    pub async fn apply_moderation(&self, guid: &str) -> RealtoResult<bool> {
        info!("Approving moderation request for {}", guid);

        let envelope: ApiEnvelope<bool> = self
            .client
            .post_json(
                &format!("realtors/{}/moderation/apply", guid),
                &serde_json::Value::Null,
            )
            .await?;
        Ok(envelope.data)
    }

    /// Reject a pending moderation request with a reason
    pub async fn reject_moderation(&self, guid: &str, reason: &str) -> RealtoResult<bool> {
        info!("Rejecting moderation request for {}", guid);

        let body = serde_json::json!({ "reason": reason });
        let envelope: ApiEnvelope<bool> = self
            .client
            .post_json(&format!("realtors/{}/moderation/reject", guid), &body)
            .await?;
        Ok(envelope.data)
    }

    /// Current realtor profile
    pub async fn realtor_info(&self, guid: &str) -> RealtoResult<RealtorProfile> {
        let envelope: ApiEnvelope<RealtorProfile> = self
            .client
            .get_json(&format!("realtors/{}", guid), &[])
            .await?;
        Ok(envelope.data)
    }

    /// Profile as submitted for moderation
    pub async fn moderation_info(&self, guid: &str) -> RealtoResult<RealtorProfile> {
        let envelope: ApiEnvelope<RealtorProfile> = self
            .client
            .get_json(&format!("realtors/{}/moderation", guid), &[])
            .await?;
        Ok(envelope.data)
    }

    /// Update a realtor profile
    pub async fn update(
        &self,
        guid: &str,
        fields: &RealtorUpdate,
    ) -> RealtoResult<RealtorProfile> {
        info!("Updating realtor {}", guid);

        let envelope: ApiEnvelope<RealtorProfile> = self
            .client
            .put_json(&format!("realtors/{}", guid), fields)
            .await?;
        Ok(envelope.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_short_queries_do_not_route_to_search() {
        let query = RealtorListQuery::page(1).with_query("ab");
        assert!(!query.wants_search());

        let query = RealtorListQuery::page(1).with_query("abc");
        assert!(query.wants_search());

        let query = RealtorListQuery::page(1);
        assert!(!query.wants_search());
    }

    #[test]
    fn test_query_params_include_page_and_text() {
        let query = RealtorListQuery::page(2).with_query("Ivanov");
        let params = query.to_params();

        assert!(params.contains(&("page".to_string(), "2".to_string())));
        assert!(params.contains(&("query".to_string(), "Ivanov".to_string())));
    }

    #[test]
    fn test_page_is_clamped_to_one() {
        let params = RealtorListQuery::page(0).to_params();
        assert!(params.contains(&("page".to_string(), "1".to_string())));
    }
}
