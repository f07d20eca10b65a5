use futures::future::try_join_all;
use tracing::error;

use super::attachment::{Attachment, AttachmentList};
use crate::api::ApiClient;
use crate::error::SubmitError;

pub(crate) async fn current_user(api: &dyn ApiClient) -> Result<String, SubmitError> {
    api.current_user_id()
        .await
        .map_err(|e| SubmitError::Backend(format!("could not get user id: {:#}", e)))
}

pub(crate) async fn upload_all(
    api: &dyn ApiClient,
    attachments: &AttachmentList,
    destination: &str,
) -> Result<Vec<String>, SubmitError> {
    try_join_all(
        attachments
            .iter()
            .map(|attachment| upload_one(api, attachment, destination)),
    )
    .await
}

pub(crate) async fn upload_one(
    api: &dyn ApiClient,
    attachment: &Attachment,
    destination: &str,
) -> Result<String, SubmitError> {
    api.upload_file(attachment, destination)
        .await
        .map_err(|e| {
            error!("Failed to upload {}: {:#}", attachment.file_name(), e);
            SubmitError::Upload {
                file_name: attachment.file_name().to_string(),
                destination: destination.to_string(),
                message: format!("{:#}", e),
            }
        })
}
