//! Client entry point for the tutoring core.
//!
//! [`TutorClientImpl`] owns one content service and one observability stack
//! and hands out the streamers, tutor flows and transcriber built on top of
//! them. Components are created lazily on first use.

mod builder;
mod client;
mod traits;

pub use builder::TutorClientBuilder;
pub use client::{create_client, create_client_from_env, TutorClientImpl};
pub use traits::TutorClient;
