//! Realty list endpoints, one paginated feed per back-office section

use async_trait::async_trait;
use log::debug;
use realto_core::{RealtoResult, RealtySummary};

use crate::http::{ApiClient, ApiEnvelope, ListPayload};
use crate::pager::ListSource;

/// Back-office realty sections, each with its own list feed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RealtySection {
    /// Every listing
    All,
    /// Listings published on the sale portal
    Sale,
    /// Listings awaiting publication moderation
    PublishModeration,
    /// Listings awaiting change moderation
    UpdateModeration,
}

impl RealtySection {
    pub fn path(&self) -> &'static str {
        match self {
            RealtySection::All => "realty",
            RealtySection::Sale => "realty/sale",
            RealtySection::PublishModeration => "realty/moderation/publish",
            RealtySection::UpdateModeration => "realty/moderation/update",
        }
    }
}

/// Endpoint group for one realty section's paginated list
#[derive(Clone)]
pub struct RealtyApi {
    client: ApiClient,
    section: RealtySection,
}

impl RealtyApi {
    pub fn new(client: ApiClient, section: RealtySection) -> Self {
        Self { client, section }
    }

    pub fn section(&self) -> RealtySection {
        self.section
    }

    pub async fn list(
        &self,
        page: u32,
        params: &[(String, String)],
    ) -> RealtoResult<ListPayload<RealtySummary>> {
        let mut query: Vec<(String, String)> = params.to_vec();
        query.push(("page".to_string(), page.max(1).to_string()));

        debug!("Loading realty list {} page {}", self.section.path(), page);

        let envelope: ApiEnvelope<ListPayload<RealtySummary>> =
            self.client.get_json(self.section.path(), &query).await?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl ListSource for RealtyApi {
    async fn fetch_page(
        &self,
        page: u32,
        params: &[(String, String)],
    ) -> RealtoResult<ListPayload<RealtySummary>> {
        self.list(page, params).await
    }
}
