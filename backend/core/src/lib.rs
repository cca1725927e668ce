pub mod error;
pub mod types;

pub use error::IntakeError;
pub use types::{
    Destination, ScanFailurePolicy, ScanVerdict, StoredUpload, UploadRequest, INCOMING_CONTAINER,
    SAFE_CONTAINER, UNSAFE_CONTAINER,
};
