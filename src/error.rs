//! Closed taxonomy of submission errors, with the dispatch policy attached.
//!
//! [`SubmissionError`] holds the kinds that `Submission::submit` catches and
//! converts into an error result message, plus the one kind
//! ([`SubmissionError::DSpaceTimeout`]) it never catches. [`WorkerError`]
//! holds the kinds that never even reach `submit`: a message that cannot be
//! trusted at all, a publish that could not be verified, or a timeout
//! propagated up from `submit`.

use thiserror::Error;

/// How the message loop should react to a given error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Policy {
    /// Publish an error result, delete the input, keep polling.
    ReportContinue,
    /// Same as `ReportContinue`, but roll back any repository state first.
    ReportContinueCompensate,
    /// Publish nothing, propagate, do not delete the input.
    HaltReport,
    /// Publish nothing, propagate, do not delete the input, no context to report.
    HaltSilent,
}

/// Errors raised while building or posting a submission.
///
/// Every variant but [`SubmissionError::DSpaceTimeout`] is report-continue
/// (or report-continue-with-compensation): `Submission::submit` catches it
/// locally and turns it into an error result message. `DSpaceTimeout` is
/// halt-report: `submit` returns it as-is and the message loop propagates it.
#[derive(Debug, Error)]
pub enum SubmissionError {
    #[error(
        "Error occurred while creating item metadata entries from file '{metadata_location}'"
    )]
    ItemCreateError { metadata_location: String },

    #[error(
        "Error occurred while parsing bitstream information from files listed in submission message."
    )]
    BitstreamAddError,

    #[error("Error occurred while posting item to DSpace collection '{collection_handle}'")]
    ItemPostError {
        collection_handle: String,
        dspace_response: String,
    },

    #[error(
        "Error occurred while opening file '{file_location}' for bitstream. Item '{item_handle}' \
         and any bitstreams already posted to it will be deleted"
    )]
    BitstreamOpenError {
        file_location: String,
        item_handle: String,
    },

    #[error(
        "Error occurred while posting bitstream '{bitstream_name}' to item in DSpace. Item \
         '{item_handle}' and any bitstreams already posted to it will be deleted"
    )]
    BitstreamPostError {
        bitstream_name: String,
        item_handle: String,
        dspace_response: String,
    },

    #[error(
        "DSpace server at '{dspace_url}' took more than {timeout_seconds} seconds to respond. \
         Aborting processing until this can be investigated. NOTE: the submission in process \
         when this occurred likely has partially published data in DSpace. The package id of \
         the submission was '{package_id}', from source '{submission_source}'"
    )]
    DSpaceTimeout {
        dspace_url: String,
        timeout_seconds: f64,
        package_id: String,
        submission_source: String,
    },
}

impl SubmissionError {
    /// Dispatch policy for this error kind.
    pub fn policy(&self) -> Policy {
        match self {
            SubmissionError::DSpaceTimeout { .. } => Policy::HaltReport,
            SubmissionError::BitstreamOpenError { .. } | SubmissionError::BitstreamPostError { .. } => {
                Policy::ReportContinueCompensate
            }
            _ => Policy::ReportContinue,
        }
    }

    /// The repository's own error body, or `"N/A"` when the kind carries none.
    pub fn dspace_response(&self) -> &str {
        match self {
            SubmissionError::ItemPostError { dspace_response, .. }
            | SubmissionError::BitstreamPostError { dspace_response, .. } => dspace_response,
            _ => "N/A",
        }
    }
}

/// Errors that never reach (or are never caught by) `Submission::submit`.
#[derive(Debug, Error)]
pub enum WorkerError {
    #[error(
        "Aborting processing due to a non-recoverable error: error occurred while processing \
         message '{message_id}' from input queue '{input_queue}'. Message provided invalid \
         result queue name '{result_queue}'. Valid result queue names are: {valid_queues:?}."
    )]
    InvalidResultQueue {
        message_id: String,
        input_queue: String,
        result_queue: String,
        valid_queues: Vec<String>,
    },

    #[error(
        "Aborting processing due to a non-recoverable error: error occurred while processing \
         message '{message_id}' from input queue '{input_queue}'. Message was missing required \
         attribute '{attribute_name}'."
    )]
    MissingAttribute {
        message_id: String,
        input_queue: String,
        attribute_name: String,
    },

    #[error(
        "Message was not successfully sent to result queue '{result_queue}', aborting processing \
         until this can be investigated. NOTE: the submit message is likely still in the \
         submission queue and may need to be manually deleted before processing resumes. Submit \
         message ID: {submit_message_id}. Result message attributes: PackageID={package_id}, \
         SubmissionSource={submission_source}."
    )]
    ResultPublishError {
        package_id: String,
        submission_source: String,
        result_queue: String,
        submit_message_id: String,
    },

    #[error(
        "DSpace server at '{dspace_url}' took more than {timeout_seconds} seconds to respond. \
         Aborting processing until this can be investigated. NOTE: the submission in process \
         when this occurred likely has partially published data in DSpace. The package id of \
         the submission was '{package_id}', from source '{submission_source}'"
    )]
    Timeout {
        dspace_url: String,
        timeout_seconds: f64,
        package_id: String,
        submission_source: String,
    },

    /// Any exception that escapes classification: logged with its context
    /// and re-raised, halting the worker without publishing a result.
    #[error(transparent)]
    Unclassified(#[from] anyhow::Error),
}

impl WorkerError {
    /// Dispatch policy for this error kind.
    pub fn policy(&self) -> Policy {
        match self {
            WorkerError::Timeout { .. } => Policy::HaltReport,
            _ => Policy::HaltSilent,
        }
    }
}

impl From<SubmissionError> for WorkerError {
    /// Only ever called with [`SubmissionError::DSpaceTimeout`] in practice:
    /// that's the one variant `submit` returns instead of catching. Any
    /// other variant reaching here indicates a bug in `submit`'s local
    /// handling, so it is folded into `Unclassified` rather than panicking.
    fn from(err: SubmissionError) -> Self {
        match err {
            SubmissionError::DSpaceTimeout {
                dspace_url,
                timeout_seconds,
                package_id,
                submission_source,
            } => WorkerError::Timeout {
                dspace_url,
                timeout_seconds,
                package_id,
                submission_source,
            },
            other => WorkerError::Unclassified(anyhow::anyhow!(other.to_string())),
        }
    }
}
