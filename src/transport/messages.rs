use base64::Engine;
use serde::{Deserialize, Serialize};

use super::strategy::{Identity, RecognitionReply};

/// Name the streaming backend reports when no face matched
pub const UNKNOWN_NAME: &str = "Unknown";

/// Unary recognition request body
#[derive(Debug, Serialize, Deserialize)]
pub struct RecognizeRequest {
    pub image: String, // data:image/jpeg;base64,...
}

impl RecognizeRequest {
    pub fn from_jpeg(jpeg: &[u8]) -> Self {
        Self {
            image: format!(
                "data:image/jpeg;base64,{}",
                base64::engine::general_purpose::STANDARD.encode(jpeg)
            ),
        }
    }
}

/// Student record returned with a unary match
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StudentRecord {
    #[serde(default, alias = "_id")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, alias = "program")]
    pub course: Option<String>,
}

/// Unary recognition response body
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecognizeResponse {
    #[serde(alias = "match")]
    pub matched: bool,
    #[serde(default)]
    pub student: Option<StudentRecord>,
    #[serde(default)]
    pub message: Option<String>,
}

impl From<RecognizeResponse> for RecognitionReply {
    fn from(resp: RecognizeResponse) -> Self {
        let identity = resp.student.map(|s| Identity {
            id: s.id,
            display_name: s.name,
            course_or_program: s.course,
        });

        Self {
            // A match without a student record is still shown as a match
            matched: resp.matched,
            identity: if resp.matched { identity } else { None },
            message: resp.message,
            sequence: None,
        }
    }
}

/// Result pushed by the streaming backend
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StreamPush {
    pub name: String,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub course: Option<String>,
    /// Echo of the `Frame-Sequence` header; older backends omit it
    #[serde(default)]
    pub sequence: Option<u64>,
}

impl From<StreamPush> for RecognitionReply {
    fn from(push: StreamPush) -> Self {
        let matched = !push.name.is_empty() && push.name != UNKNOWN_NAME;
        let identity = matched.then(|| Identity {
            id: push.email,
            display_name: push.name,
            course_or_program: push.course,
        });

        Self {
            matched,
            identity,
            message: push.message,
            sequence: push.sequence,
        }
    }
}
