use tracing::info;

use super::attachment::Attachment;
use super::listing::UploadPaths;
use super::upload::upload_one;
use crate::api::{ApiClient, ApplicantDetails, TeamApplicationRequest};
use crate::error::SubmitError;

/// Job application with a resume and a self-interview video
///
/// The video can come from a capture session or a picked file.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TeamApplicationForm {
    pub applicant: ApplicantDetails,
    pub resume: Option<Attachment>,
    pub video: Option<Attachment>,
}

impl TeamApplicationForm {
    pub fn new() -> Self {
        Self::default()
    }

    /// Upload the resume and the video, then send the application
    ///
    /// Both files are required. Nothing is cleared on failure.
    pub async fn submit(
        &mut self,
        api: &dyn ApiClient,
        uploads: &UploadPaths,
    ) -> Result<TeamApplicationRequest, SubmitError> {
        let (resume, video) = match (&self.resume, &self.video) {
            (Some(resume), Some(video)) => (resume, video),
            _ => return Err(SubmitError::MissingAttachment("resume and video")),
        };

        info!(
            "Submitting team application for {} ({})",
            self.applicant.name, self.applicant.role
        );

        let resume_url = upload_one(api, resume, &uploads.resumes).await?;
        let video_url = upload_one(api, video, &uploads.application_videos).await?;

        let request = TeamApplicationRequest {
            applicant: self.applicant.clone(),
            resume_url,
            video_url,
        };

        api.submit_team_application(&request)
            .await
            .map_err(|e| SubmitError::Backend(format!("{:#}", e)))?;

        info!("Team application submitted");
        *self = Self::default();

        Ok(request)
    }
}
