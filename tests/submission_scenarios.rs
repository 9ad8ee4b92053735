//! Integration tests for the concrete failure/success scenarios and the
//! cross-cutting behavioral invariants, run against the in-memory fakes in
//! `tests/common`.

mod common;

use std::collections::HashMap;

use common::{FakeObjectReader, FakeQueueAdapter, FakeRepositoryClient};
use dsw::config::Config;
use dsw::error::Policy;
use dsw::queue::{AttributeValue, ReceivedMessage};
use dsw::result::ResultMessage;
use dsw::submission::Submission;

fn message(package_id: &str, source: &str, output_queue: &str, body: serde_json::Value) -> ReceivedMessage {
    let mut attributes = HashMap::new();
    attributes.insert("PackageID".to_string(), AttributeValue::string(package_id));
    attributes.insert("SubmissionSource".to_string(), AttributeValue::string(source));
    attributes.insert("OutputQueue".to_string(), AttributeValue::string(output_queue));
    ReceivedMessage {
        message_id: format!("msg-{package_id}"),
        receipt_handle: format!("receipt-{package_id}"),
        attributes,
        body: body.to_string(),
    }
}

fn happy_path_body() -> serde_json::Value {
    serde_json::json!({
        "SubmissionSystem": "DSpace@MIT",
        "CollectionHandle": "0000/collection01",
        "MetadataLocation": "tests/fixtures/test-item-metadata.json",
        "Files": [{
            "BitstreamName": "test-file-01.pdf",
            "FileLocation": "tests/fixtures/test-file-01.pdf",
            "BitstreamDescription": "A test bitstream"
        }]
    })
}

#[tokio::test]
async fn scenario_1_happy_path_publishes_success_and_deletes_input() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let msg = message("etdtest01", "etd", "empty_result_queue", happy_path_body());

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    submission.submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0).await.unwrap();

    match submission.result_message.as_ref().unwrap() {
        ResultMessage::Success(success) => {
            assert_eq!(success.item_handle, "0000/item01");
            assert_eq!(success.bitstreams.len(), 1);
            assert_eq!(success.bitstreams[0].bitstream_name, "test-file-01.pdf");
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn scenario_2_item_create_error_reports_metadata_uri() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let mut body = happy_path_body();
    body["MetadataLocation"] = serde_json::json!("tests/fixtures/does-not-exist.json");
    let msg = message("etdtest01", "etd", "empty_result_queue", body);

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    submission.submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0).await.unwrap();

    match submission.result_message.as_ref().unwrap() {
        ResultMessage::Error(err) => {
            assert!(err.error_info.contains("creating item metadata entries from file"));
            assert!(err.error_info.contains("does-not-exist.json"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(repo.posted_items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_3_item_post_error_leaves_no_item_behind() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let mut body = happy_path_body();
    body["CollectionHandle"] = serde_json::json!("0000/not-a-collection");
    let msg = message("etdtest01", "etd", "empty_result_queue", body);

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    submission.submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0).await.unwrap();

    match submission.result_message.as_ref().unwrap() {
        ResultMessage::Error(err) => {
            assert!(err
                .error_info
                .contains("posting item to DSpace collection '0000/not-a-collection'"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert!(repo.posted_items.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_4_bitstream_open_error_triggers_compensation() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let mut body = happy_path_body();
    body["Files"][0]["FileLocation"] = serde_json::json!("tests/fixtures/nothing-here");
    let msg = message("etdtest01", "etd", "empty_result_queue", body);

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    submission.submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0).await.unwrap();

    match submission.result_message.as_ref().unwrap() {
        ResultMessage::Error(err) => {
            assert!(err.error_info.contains("nothing-here"));
            assert!(err.error_info.contains("will be deleted"));
        }
        other => panic!("expected error, got {other:?}"),
    }
    assert_eq!(repo.deleted_items.lock().unwrap().len(), 1);
    assert!(repo.deleted_bitstreams.lock().unwrap().is_empty());
}

#[tokio::test]
async fn scenario_5_repository_timeout_halts_without_publishing() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let mut body = happy_path_body();
    body["CollectionHandle"] = serde_json::json!("0000/collection03");
    let msg = message("etdtest01", "etd", "empty_result_queue", body);

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    let err = submission
        .submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0)
        .await
        .unwrap_err();

    assert_eq!(err.policy(), Policy::HaltReport);
    assert!(submission.result_message.is_none());
}

#[tokio::test]
async fn scenario_6_invalid_output_queue_halts_before_any_repository_call() {
    let config = Config::test_profile();
    let msg = message("etdtest01", "etd", "not_on_allow_list", happy_path_body());

    let err = Submission::from_message(&msg, &config).unwrap_err();
    assert_eq!(err.policy(), Policy::HaltSilent);
}

#[tokio::test]
async fn p1_successful_processing_sends_exactly_one_result_and_deletes_input() {
    let config = Config::test_profile();
    let queue = FakeQueueAdapter::new();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    queue.seed(
        &config.input_queue,
        message("etdtest01", "etd", "empty_result_queue", happy_path_body()),
    );

    dsw::message_loop::run(&config, &queue, &repo, &reader, &config.input_queue, 0)
        .await
        .unwrap();

    assert_eq!(queue.sent_to("empty_result_queue").len(), 1);
    assert!(queue.sent_to(&config.input_queue).is_empty());
}

#[tokio::test]
async fn p2_halt_class_failure_sends_no_result_and_keeps_input() {
    let config = Config::test_profile();
    let queue = FakeQueueAdapter::new();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    queue.seed(&config.input_queue, message("etdtest01", "etd", "not_on_allow_list", happy_path_body()));

    let err = dsw::message_loop::run(&config, &queue, &repo, &reader, &config.input_queue, 0)
        .await
        .unwrap_err();

    assert_eq!(err.policy(), Policy::HaltSilent);
    assert!(queue.sent_to("not_on_allow_list").is_empty());
}

#[tokio::test]
async fn p4_result_attributes_are_drawn_verbatim_from_input() {
    let config = Config::test_profile();
    let msg = message("pkg-xyz", "source-xyz", "empty_result_queue", happy_path_body());
    let submission = Submission::from_message(&msg, &config).unwrap();
    let attrs = submission.result_attributes();
    assert_eq!(attrs.len(), 2);
    assert_eq!(attrs["PackageID"].string_value, "pkg-xyz");
    assert_eq!(attrs["SubmissionSource"].string_value, "source-xyz");
}

#[tokio::test]
async fn p6_bitstream_order_in_success_matches_files_order() {
    let config = Config::test_profile();
    let repo = FakeRepositoryClient::new();
    let reader = FakeObjectReader;
    let mut body = happy_path_body();
    body["Files"] = serde_json::json!([
        {"BitstreamName": "a.pdf", "FileLocation": "tests/fixtures/test-file-01.pdf"},
        {"BitstreamName": "b.pdf", "FileLocation": "tests/fixtures/test-file-01.pdf"},
        {"BitstreamName": "c.pdf", "FileLocation": "tests/fixtures/test-file-01.pdf"},
    ]);
    let msg = message("etdtest01", "etd", "empty_result_queue", body);

    let mut submission = Submission::from_message(&msg, &config).unwrap();
    submission.submit(&repo, &reader, "mock://dspace.edu/rest/", 3.0).await.unwrap();

    match submission.result_message.as_ref().unwrap() {
        ResultMessage::Success(success) => {
            let names: Vec<_> = success.bitstreams.iter().map(|b| b.bitstream_name.as_str()).collect();
            assert_eq!(names, vec!["a.pdf", "b.pdf", "c.pdf"]);
        }
        other => panic!("expected success, got {other:?}"),
    }
}

#[tokio::test]
async fn malformed_body_never_reaches_submit_and_is_report_continue() {
    let config = Config::test_profile();
    let mut msg = message("etdtest01", "etd", "empty_result_queue", happy_path_body());
    msg.body = "{not valid json".to_string();

    let submission = Submission::from_message(&msg, &config).unwrap();
    assert!(matches!(submission.result_message, Some(ResultMessage::PlainError(_))));
}
