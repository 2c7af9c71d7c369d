pub mod encoder;
pub mod frame;
pub mod source;
pub mod still;

pub use encoder::{EncodeError, Encoded, FrameEncoder};
pub use frame::{CapturedFrame, RawFrame};
pub use source::{CaptureDevice, CaptureError, CaptureHandle, CaptureSource};
pub use still::ImageDirSource;
