//! The Result Message model: the structured outcome a submission
//! publishes to its result queue, either a success manifest or an error
//! report.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::error::SubmissionError;

/// One bitstream's entry in a success result's manifest.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BitstreamResult {
    #[serde(rename = "BitstreamName")]
    pub bitstream_name: String,
    #[serde(rename = "BitstreamUUID")]
    pub bitstream_uuid: String,
    #[serde(rename = "BitstreamChecksum")]
    pub bitstream_checksum: serde_json::Value,
}

/// The outcome of one submission attempt, serialized verbatim as the
/// result message body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ResultMessage {
    /// A nonconforming input body: report-continue, but not an
    /// exception, so it carries no timestamp/traceback, just the sentence.
    PlainError(String),
    Success(SuccessResult),
    Error(ErrorResult),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SuccessResult {
    #[serde(rename = "ResultType")]
    pub result_type: String,
    #[serde(rename = "ItemHandle")]
    pub item_handle: String,
    #[serde(rename = "lastModified")]
    pub last_modified: String,
    #[serde(rename = "Bitstreams")]
    pub bitstreams: Vec<BitstreamResult>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorResult {
    #[serde(rename = "ResultType")]
    pub result_type: String,
    #[serde(rename = "ErrorTimestamp")]
    pub error_timestamp: String,
    #[serde(rename = "ErrorInfo")]
    pub error_info: String,
    #[serde(rename = "DSpaceResponse")]
    pub dspace_response: String,
    #[serde(rename = "ExceptionTraceback")]
    pub exception_traceback: Vec<String>,
}

impl ResultMessage {
    /// Build a success result from a posted item and its posted bitstreams,
    /// preserving `Files` order.
    pub fn success(item_handle: String, last_modified: String, bitstreams: Vec<BitstreamResult>) -> Self {
        ResultMessage::Success(SuccessResult {
            result_type: "success".to_string(),
            item_handle,
            last_modified,
            bitstreams,
        })
    }

    /// Build an error result from a classified [`SubmissionError`], with a
    /// trimmed synthetic traceback (this process has no Python-style stack
    /// to format, so the error chain stands in for it).
    pub fn error(err: &SubmissionError) -> Self {
        ResultMessage::Error(ErrorResult {
            result_type: "error".to_string(),
            error_timestamp: Utc::now().format("%Y-%m-%d %H:%M:%S").to_string(),
            error_info: err.to_string(),
            dspace_response: err.dspace_response().to_string(),
            exception_traceback: vec![err.to_string()],
        })
    }

    /// Build the plain-string error result for a nonconforming input body
    /// ("did not conform to the expected shape").
    pub fn nonconforming(detail: &str) -> Self {
        ResultMessage::PlainError(format!(
            "Submission message did not conform to the specification: {detail}"
        ))
    }

    pub fn result_type(&self) -> &str {
        match self {
            ResultMessage::PlainError(_) => "error",
            ResultMessage::Success(s) => &s.result_type,
            ResultMessage::Error(e) => &e.result_type,
        }
    }
}
