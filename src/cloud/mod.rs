//! Cloud verdict service boundary.
//!
//! The engine talks to the remote scanning service only through the
//! [`CloudVerdictClient`] trait. The concrete provider lives outside this
//! crate; [`MockCloudClient`] is provided for tests and demos.
//!
//! ## Implementing a Client
//!
//! ```rust,ignore
//! use scanward::cloud::{CloudVerdict, CloudVerdictClient};
//! use scanward::core::CloudError;
//! use async_trait::async_trait;
//! use std::path::Path;
//!
//! #[derive(Debug)]
//! pub struct MyService;
//!
//! #[async_trait]
//! impl CloudVerdictClient for MyService {
//!     fn name(&self) -> &str {
//!         "my-service"
//!     }
//!
//!     async fn submit(&self, path: &Path) -> Result<CloudVerdict, CloudError> {
//!         todo!()
//!     }
//! }
//! ```

mod client;
pub mod mock;

pub use client::{submit_with_timeout, ArcCloudClient, CloudVerdict, CloudVerdictClient};
pub use mock::MockCloudClient;
