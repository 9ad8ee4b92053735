//! dspace-submission-worker - submits packages from a queue into a DSpace
//! repository and reports outcomes on a per-request result queue.

pub mod cli;
pub mod config;
pub mod error;
pub mod message;
pub mod message_loop;
pub mod object_store;
pub mod queue;
pub mod repository;
pub mod result;
pub mod submission;
pub mod verify;
