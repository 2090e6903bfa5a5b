//! Current-user endpoints: profile fetch, login, logout

use async_trait::async_trait;
use log::{debug, info};
use realto_core::{Credentials, RealtoResult, UserProfile};
use serde::Deserialize;

use crate::http::{ApiClient, ApiEnvelope, LoginPayload};
use crate::session::CurrentUserGateway;

/// Payload of the "self" endpoint
#[derive(Debug, Clone, Deserialize)]
struct SelfPayload {
    user: UserProfile,
}

/// Endpoint group for the signed-in user, consumed by the session manager
#[derive(Clone)]
pub struct CurrentUserApi {
    client: ApiClient,
}

impl CurrentUserApi {
    pub fn new(client: ApiClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl CurrentUserGateway for CurrentUserApi {
    async fn fetch_self(&self) -> RealtoResult<UserProfile> {
        debug!("Fetching current user profile");

        let envelope: ApiEnvelope<SelfPayload> = self.client.get_json("users/self", &[]).await?;
        Ok(envelope.data.user)
    }

    async fn login(&self, credentials: &Credentials) -> RealtoResult<LoginPayload> {
        info!("Logging in as {}", credentials.email);

        let envelope: ApiEnvelope<LoginPayload> =
            self.client.post_json("users/login", credentials).await?;
        Ok(envelope.data)
    }

    async fn logout(&self) -> RealtoResult<()> {
        debug!("Logging out");

        self.client.delete("users/logout").await
    }
}
