use tracing::info;

use super::attachment::AttachmentList;
use super::listing::UploadPaths;
use super::upload::{current_user, upload_all};
use crate::api::{ApiClient, DemandDetails, DemandRequest};
use crate::error::SubmitError;

/// "Post your requirements" form of the materials marketplace
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DemandForm {
    pub details: DemandDetails,
    pub images: AttachmentList,
}

impl DemandForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), SubmitError> {
        let d = &self.details;
        let required = [
            (&d.title, "title"),
            (&d.category, "category"),
            (&d.rm, "raw material"),
            (&d.required_quantity, "required quantity"),
            (&d.location, "location"),
        ];

        match required.iter().find(|(value, _)| value.trim().is_empty()) {
            Some((_, field)) => Err(SubmitError::MissingField(*field)),
            None => Ok(()),
        }
    }

    pub async fn submit(
        &mut self,
        api: &dyn ApiClient,
        uploads: &UploadPaths,
    ) -> Result<DemandRequest, SubmitError> {
        if !api.is_authenticated() {
            return Err(SubmitError::NotAuthenticated);
        }
        self.validate()?;

        let image_url = upload_all(api, &self.images, &uploads.listing_images).await?;

        let request = DemandRequest {
            user_id: current_user(api).await?,
            details: self.details.clone(),
            image_url,
        };

        api.create_demand(&request)
            .await
            .map_err(|e| SubmitError::Backend(format!("{:#}", e)))?;

        info!("Demand '{}' posted", request.details.title);
        *self = Self::default();

        Ok(request)
    }
}
