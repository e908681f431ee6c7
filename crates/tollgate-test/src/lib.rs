//! Tollgate Test - shared test utilities.
//!
//! Mock confirmation ports, an in-memory audit sink and descriptor
//! fixtures, used as a dev-dependency by the other tollgate crates.
//!
//! # Usage
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use tollgate_approval::PolicyEvaluator;
//! use tollgate_test::{Reply, ScriptedPort, delete_file, rules_with_deadline};
//!
//! #[tokio::test(start_paused = true)]
//! async fn unanswered_prompt_denies() {
//!     let port = ScriptedPort::new().then(Reply::Hang);
//!     let evaluator = PolicyEvaluator::builder(rules_with_deadline(1))
//!         .confirmation_port(Arc::new(port))
//!         .build();
//!     assert!(!evaluator.evaluate(&delete_file("/tmp/x")).await);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]
#![deny(clippy::all)]
#![warn(unreachable_pub)]

pub mod prelude;

pub mod fixtures;
pub mod harness;
pub mod mocks;

pub use fixtures::*;
pub use harness::*;
pub use mocks::*;
