use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::info;

use super::attachment::{Attachment, AttachmentList};
use super::upload::{current_user, upload_all, upload_one};
use crate::api::{ApiClient, BuyMachineRequest, MachineDetails, SellMachineRequest};
use crate::error::SubmitError;

/// Storage folders for each kind of upload
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadPaths {
    pub videos: String,
    pub specs: String,
    pub images: String,
    pub resumes: String,
    /// Self-interview videos sent with team applications
    pub application_videos: String,
    pub listing_images: String,
}

impl Default for UploadPaths {
    fn default() -> Self {
        Self {
            videos: "machines/videos".to_string(),
            specs: "machines/specs".to_string(),
            images: "machines/images".to_string(),
            resumes: "marketplace-all/resumes".to_string(),
            application_videos: "marketplace-all/videos".to_string(),
            listing_images: "marketplace-all/listings".to_string(),
        }
    }
}

/// State of the "sell a machine" form
///
/// The form owns its attachments; capture sessions only append to `videos`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SellMachineForm {
    pub details: MachineDetails,
    pub other_options: BTreeMap<String, String>,
    pub videos: AttachmentList,
    pub material_spec: Option<Attachment>,
    pub production_images: AttachmentList,
}

impl SellMachineForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn validate(&self) -> Result<(), SubmitError> {
        validate_details(&self.details)
    }

    /// Upload every attachment, then create the listing
    ///
    /// On failure nothing is cleared, so the same form can be submitted
    /// again. On success the form is reset.
    pub async fn submit(
        &mut self,
        api: &dyn ApiClient,
        uploads: &UploadPaths,
    ) -> Result<SellMachineRequest, SubmitError> {
        if !api.is_authenticated() {
            return Err(SubmitError::NotAuthenticated);
        }
        self.validate()?;

        info!(
            "Submitting sell listing '{}' ({} videos, {} images)",
            self.details.machine_name,
            self.videos.len(),
            self.production_images.len()
        );

        let video_urls = upload_all(api, &self.videos, &uploads.videos).await?;

        let material_specification_url = match &self.material_spec {
            Some(spec) => upload_one(api, spec, &uploads.specs).await?,
            None => String::new(),
        };

        let production_image_urls =
            upload_all(api, &self.production_images, &uploads.images).await?;

        let request = SellMachineRequest {
            user_id: current_user(api).await?,
            details: self.details.clone(),
            video_urls,
            material_specification_url,
            production_image_urls,
            other_options: self.other_options.clone(),
        };

        api.create_sell_machine(&request)
            .await
            .map_err(|e| SubmitError::Backend(format!("{:#}", e)))?;

        info!("Machine listing created successfully");
        *self = Self::default();

        Ok(request)
    }
}

/// State of the "buy a machine" request form
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BuyMachineForm {
    pub details: MachineDetails,
    pub notes: String,
    pub production_images: AttachmentList,
}

impl BuyMachineForm {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn submit(
        &mut self,
        api: &dyn ApiClient,
        uploads: &UploadPaths,
    ) -> Result<BuyMachineRequest, SubmitError> {
        if !api.is_authenticated() {
            return Err(SubmitError::NotAuthenticated);
        }
        validate_details(&self.details)?;

        let production_image_urls =
            upload_all(api, &self.production_images, &uploads.images).await?;

        let request = BuyMachineRequest {
            user_id: current_user(api).await?,
            details: self.details.clone(),
            notes: self.notes.clone(),
            production_image_urls,
        };

        api.create_buy_machine(&request)
            .await
            .map_err(|e| SubmitError::Backend(format!("{:#}", e)))?;

        info!("Buy request created successfully");
        *self = Self::default();

        Ok(request)
    }
}

fn validate_details(details: &MachineDetails) -> Result<(), SubmitError> {
    if details.machine_name.trim().is_empty() {
        return Err(SubmitError::MissingField("machine name"));
    }
    Ok(())
}
