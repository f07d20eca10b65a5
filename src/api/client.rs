use anyhow::{bail, Context, Result};
use base64::Engine;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, info};

use super::messages::{
    BuyMachineRequest, CurrentUser, DemandRequest, ListingKind, MachineListing,
    SellMachineRequest, TeamApplicationRequest, UploadRequest, UploadResponse,
};
use crate::form::Attachment;

/// Marketplace backend: storage, listings and auth
#[async_trait::async_trait]
pub trait ApiClient: Send + Sync {
    /// Upload a file into `destination` and return its public URL
    async fn upload_file(&self, attachment: &Attachment, destination: &str) -> Result<String>;

    async fn create_sell_machine(&self, request: &SellMachineRequest) -> Result<()>;

    async fn create_buy_machine(&self, request: &BuyMachineRequest) -> Result<()>;

    async fn list_machines(&self, kind: ListingKind) -> Result<Vec<MachineListing>>;

    async fn submit_team_application(&self, request: &TeamApplicationRequest) -> Result<()>;

    /// Post a material demand listing
    async fn create_demand(&self, request: &DemandRequest) -> Result<()>;

    /// Id of the signed-in user
    async fn current_user_id(&self) -> Result<String>;

    fn is_authenticated(&self) -> bool;
}

/// `ApiClient` over the backend's JSON HTTP API
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: String,
    access_token: Option<String>,
}

impl HttpApiClient {
    pub fn new(base_url: &str, access_token: Option<String>, timeout: Duration) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .context("Failed to build HTTP client")?;

        info!("Backend API client for {}", base_url);

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            access_token: access_token.filter(|t| !t.is_empty()),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    fn authorized(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn post_json<T: Serialize + Sync>(&self, path: &str, body: &T, what: &str) -> Result<()> {
        let response = self
            .authorized(self.client.post(self.url(path)))
            .json(body)
            .send()
            .await
            .with_context(|| format!("Failed to send {}", what))?;

        Self::check(response, what).await?;
        Ok(())
    }

    async fn check(response: reqwest::Response, what: &str) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        bail!("{} failed with status {}: {}", what, status, body)
    }
}

#[async_trait::async_trait]
impl ApiClient for HttpApiClient {
    async fn upload_file(&self, attachment: &Attachment, destination: &str) -> Result<String> {
        let request = UploadRequest {
            path: destination.to_string(),
            file_name: attachment.file_name().to_string(),
            content_type: attachment.mime_type().to_string(),
            data: base64::engine::general_purpose::STANDARD.encode(attachment.data()),
        };

        debug!(
            "Uploading {} ({} bytes) to {}",
            attachment.file_name(),
            attachment.size(),
            destination
        );

        let response = self
            .authorized(self.client.post(self.url("storage/upload")))
            .json(&request)
            .send()
            .await
            .context("Failed to send upload request")?;

        let uploaded: UploadResponse = Self::check(response, "Upload")
            .await?
            .json()
            .await
            .context("Failed to parse upload response")?;

        info!("Uploaded {} -> {}", attachment.file_name(), uploaded.public_url);

        Ok(uploaded.public_url)
    }

    async fn create_sell_machine(&self, request: &SellMachineRequest) -> Result<()> {
        self.post_json("machines/sell", request, "sell listing").await
    }

    async fn create_buy_machine(&self, request: &BuyMachineRequest) -> Result<()> {
        self.post_json("machines/buy", request, "buy request").await
    }

    async fn list_machines(&self, kind: ListingKind) -> Result<Vec<MachineListing>> {
        let response = self
            .authorized(self.client.get(self.url(&format!("machines/{}", kind.path()))))
            .send()
            .await
            .context("Failed to fetch machines")?;

        let listings = Self::check(response, "List machines")
            .await?
            .json()
            .await
            .context("Failed to parse machine listings")?;

        Ok(listings)
    }

    async fn submit_team_application(&self, request: &TeamApplicationRequest) -> Result<()> {
        self.post_json("team/applications", request, "team application")
            .await
    }

    async fn create_demand(&self, request: &DemandRequest) -> Result<()> {
        self.post_json("marketplace/demands", request, "demand listing")
            .await
    }

    async fn current_user_id(&self) -> Result<String> {
        if !self.is_authenticated() {
            bail!("Not signed in");
        }

        let response = self
            .authorized(self.client.get(self.url("auth/user")))
            .send()
            .await
            .context("Failed to fetch current user")?;

        let user: CurrentUser = Self::check(response, "Get user")
            .await?
            .json()
            .await
            .context("Failed to parse current user")?;

        Ok(user.id)
    }

    fn is_authenticated(&self) -> bool {
        self.access_token.is_some()
    }
}
