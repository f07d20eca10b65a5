pub mod encoder;
pub mod stream;
pub mod synthetic;

pub use encoder::{EncoderConfig, EncoderEvent, EncoderFactory, MediaEncoder};
pub use stream::{
    DeviceError, FacingMode, MediaDevices, MediaStream, StreamConstraints, StreamGuard,
};
pub use synthetic::{
    ChunkSource, DeviceStats, ScriptEnding, SyntheticCamera, SyntheticDevices,
    SyntheticEncoderFactory,
};
