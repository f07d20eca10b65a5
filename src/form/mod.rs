//! Listing form state
//!
//! Forms own their attachment lists. Capture sessions and file pickers only
//! append to them; submission uploads everything through the `ApiClient`.

mod application;
mod attachment;
mod demand;
mod filter;
mod listing;
mod upload;

pub use application::TeamApplicationForm;
pub use attachment::{Attachment, AttachmentList, AttachmentSummary};
pub use demand::DemandForm;
pub use filter::ListingFilter;
pub use listing::{BuyMachineForm, SellMachineForm, UploadPaths};
