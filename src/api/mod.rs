pub mod client;
pub mod messages;

pub use client::{ApiClient, HttpApiClient};
pub use messages::{
    ApplicantDetails, BuyMachineRequest, DemandDetails, DemandRequest, ListingKind,
    MachineDetails, MachineListing, SellMachineRequest, TeamApplicationRequest, UploadRequest,
    UploadResponse,
};
