//! Domain of the execution-unit provisioning pipeline.
//!
//! Entities, value objects, storage and service seams shared by the service
//! implementations and the application.

pub mod command;
pub mod exception;
#[cfg(feature = "mock")]
pub mod mock;
pub mod model;
pub mod repository;
pub mod service;
