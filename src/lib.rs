pub mod capture;
pub mod config;
pub mod error;
pub mod http;
pub mod models;
pub mod session;
pub mod transport;

pub use capture::{
    CaptureDevice, CaptureError, CaptureHandle, CaptureSource, CapturedFrame, Encoded,
    FrameEncoder, ImageDirSource, RawFrame,
};
pub use config::Config;
pub use error::SessionError;
pub use http::{create_router, AppState};
pub use models::{AssetDirLoader, ModelGate, ModelLoadError, ModelLoader, ModelReadiness, ModelSet};
pub use session::{
    NoticeBoard, RecognitionResult, RecognitionSession, ResultPresenter, SessionConfig,
    SessionHost, SessionState, SessionStats,
};
pub use transport::{
    HttpUnaryTransport, Identity, NatsStreamingTransport, RecognitionReply, TransportError,
    TransportKind, TransportStrategy,
};
