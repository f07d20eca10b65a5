pub mod api;
pub mod capture;
pub mod config;
pub mod device;
pub mod error;
pub mod form;
pub mod http;

pub use api::{ApiClient, HttpApiClient, ListingKind, MachineDetails, MachineListing};
pub use capture::{
    CaptureOptions, CaptureSession, CaptureStatus, ChunkBuffer, FinalizedRecording,
    PreviewSurface, Recorder, RecorderPhase, RecorderState, RecorderStatus,
};
pub use config::Config;
pub use device::{
    DeviceError, EncoderConfig, EncoderEvent, EncoderFactory, FacingMode, MediaDevices,
    MediaEncoder, MediaStream, StreamConstraints, StreamGuard,
};
pub use error::{CaptureError, SubmitError};
pub use form::{
    Attachment, AttachmentList, BuyMachineForm, DemandForm, ListingFilter, SellMachineForm,
    TeamApplicationForm, UploadPaths,
};
pub use http::{create_router, spawn_session_reaper, AppState};
