//! Message loop: the worker's top-level supervisor. Polls the
//! input queue, dispatches each message to a [`Submission`], verifies and
//! publishes the result, and deletes the input message once it has been
//! durably handed off.

use tracing::{info, warn};

use crate::config::Config;
use crate::error::{Policy, WorkerError};
use crate::object_store::ObjectReader;
use crate::queue::QueueAdapter;
use crate::repository::RepositoryClient;
use crate::submission::Submission;
use crate::verify;

/// Run until the input queue reports no messages for one poll.
///
/// `login` is called once per batch of messages, not once per message
/// (mirrors the original process: authenticate, then drain). A
/// [`WorkerError`] with [`Policy::HaltReport`] or [`Policy::HaltSilent`]
/// stops the loop immediately without deleting the message that caused it.
pub async fn run(
    config: &Config,
    queue: &dyn QueueAdapter,
    repo: &dyn RepositoryClient,
    reader: &dyn ObjectReader,
    input_queue: &str,
    wait_seconds: u32,
) -> Result<(), WorkerError> {
    info!(queue = input_queue, "message loop started");

    loop {
        info!(queue = input_queue, "polling queue for messages");
        let messages = queue
            .receive(input_queue, wait_seconds.min(20), 30)
            .await
            .map_err(|e| WorkerError::Unclassified(e.into()))?;

        if messages.is_empty() {
            info!(queue = input_queue, "no messages available in queue");
            break;
        }
        info!(count = messages.len(), "messages received");

        if !config.skip_processing {
            repo.login()
                .await
                .map_err(|e| WorkerError::Unclassified(e.into()))?;
        }

        for message in &messages {
            if config.skip_processing {
                info!(message_id = %message.message_id, "skipping processing due to config");
                queue
                    .delete(input_queue, &message.receipt_handle)
                    .await
                    .map_err(|e| WorkerError::Unclassified(e.into()))?;
                continue;
            }

            let mut submission = Submission::from_message(message, config)?;
            info!(
                package_id = %submission.package_id,
                source = %submission.submission_source,
                "processing message"
            );

            if submission.result_message.is_none() {
                submission
                    .submit(repo, reader, &config.dspace_api_url, config.dspace_timeout)
                    .await?;
            }

            publish_result(queue, &message.message_id, &submission).await?;

            queue
                .delete(input_queue, &message.receipt_handle)
                .await
                .map_err(|e| WorkerError::Unclassified(e.into()))?;
            info!(message_id = %message.message_id, "deleted message from input queue");
        }
    }

    info!(queue = input_queue, "completed processing messages from queue");
    Ok(())
}

/// Publish a submission's result, verifying the queue's own MD5 digest of
/// what it stored against the digest of the body we sent. A mismatch is
/// [`Policy::HaltReport`]: the submit message
/// stays in the input queue so it can be investigated manually.
async fn publish_result(
    queue: &dyn QueueAdapter,
    submit_message_id: &str,
    submission: &Submission,
) -> Result<(), WorkerError> {
    let result_message = submission
        .result_message
        .as_ref()
        .expect("submit always populates result_message before returning Ok");

    let body = serde_json::to_value(result_message).expect("ResultMessage always serializes");
    let body_string = body.to_string();

    let response = queue
        .send(&submission.result_queue, submission.result_attributes(), body_string.clone())
        .await
        .map_err(|_| into_publish_error(submit_message_id, submission))?;

    if !verify::verify_sent(&body, &response.md5_of_body) {
        warn!(
            result_queue = %submission.result_queue,
            "published result digest did not match, treating as a failed publish"
        );
        return Err(into_publish_error(submit_message_id, submission));
    }

    info!(
        result_queue = %submission.result_queue,
        result_type = result_message.result_type(),
        "published result message"
    );
    Ok(())
}

fn into_publish_error(submit_message_id: &str, submission: &Submission) -> WorkerError {
    WorkerError::ResultPublishError {
        package_id: submission.package_id.clone(),
        submission_source: submission.submission_source.clone(),
        result_queue: submission.result_queue.clone(),
        submit_message_id: submit_message_id.to_string(),
    }
}
