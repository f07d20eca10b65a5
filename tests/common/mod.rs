// Shared test doubles for the backend API

#![allow(dead_code)]

use anyhow::{bail, Result};
use listing_capture::api::{
    ApiClient, BuyMachineRequest, DemandRequest, ListingKind, MachineListing, SellMachineRequest,
    TeamApplicationRequest,
};
use listing_capture::Attachment;
use std::sync::Mutex;

/// Records every call; uploads to destinations in `failing` are rejected
#[derive(Default)]
pub struct MockApiClient {
    pub authenticated: bool,
    pub failing: Vec<String>,
    pub listings: Vec<MachineListing>,
    pub uploads: Mutex<Vec<(String, String, usize)>>,
    pub sell_requests: Mutex<Vec<SellMachineRequest>>,
    pub buy_requests: Mutex<Vec<BuyMachineRequest>>,
    pub applications: Mutex<Vec<TeamApplicationRequest>>,
    pub demands: Mutex<Vec<DemandRequest>>,
}

impl MockApiClient {
    pub fn signed_in() -> Self {
        Self {
            authenticated: true,
            ..Default::default()
        }
    }

    pub fn failing_uploads_to(destination: &str) -> Self {
        Self {
            authenticated: true,
            failing: vec![destination.to_string()],
            ..Default::default()
        }
    }

    pub fn uploaded(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait::async_trait]
impl ApiClient for MockApiClient {
    async fn upload_file(&self, attachment: &Attachment, destination: &str) -> Result<String> {
        if self.failing.iter().any(|d| d == destination) {
            bail!("storage unavailable");
        }

        self.uploads.lock().unwrap().push((
            destination.to_string(),
            attachment.file_name().to_string(),
            attachment.size(),
        ));

        Ok(format!(
            "https://cdn.example.test/{}/{}",
            destination,
            attachment.file_name()
        ))
    }

    async fn create_sell_machine(&self, request: &SellMachineRequest) -> Result<()> {
        self.sell_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn create_buy_machine(&self, request: &BuyMachineRequest) -> Result<()> {
        self.buy_requests.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn submit_team_application(&self, request: &TeamApplicationRequest) -> Result<()> {
        self.applications.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn create_demand(&self, request: &DemandRequest) -> Result<()> {
        self.demands.lock().unwrap().push(request.clone());
        Ok(())
    }

    async fn list_machines(&self, _kind: ListingKind) -> Result<Vec<MachineListing>> {
        Ok(self.listings.clone())
    }

    async fn current_user_id(&self) -> Result<String> {
        if !self.authenticated {
            bail!("Not signed in");
        }
        Ok("user-123".to_string())
    }

    fn is_authenticated(&self) -> bool {
        self.authenticated
    }
}
