//! Redfish service interaction module
//!
//! This module provides the concrete transport for a live Redfish service:
//! session handling, the HTTP layer, and the client that hands out the
//! service root as a [`Resource`](crate::resource::Resource).
//!
//! # Module Structure
//!
//! - [`session`] - Session token state and per-request credentials
//! - [`client`] - Main Redfish client, implements [`Transport`](crate::resource::Transport)
//! - [`http`] - HTTP utilities for REST calls
//!
//! # Example
//!
//! ```ignore
//! use rfnav::redfish::{ClientOptions, RedfishClient};
//!
//! async fn example() -> rfnav::Result<()> {
//!     let options = ClientOptions::new("https://bmc.example.com")
//!         .with_credentials("admin", "password");
//!     let client = RedfishClient::new(options)?;
//!     let system = client.attr("System").await?;
//!     println!("{}", system.summary());
//!     client.logout().await
//! }
//! ```

pub mod client;
pub mod http;
pub mod session;

pub use client::{ClientOptions, RedfishClient, SERVICE_ROOT, SESSIONS_PATH};
pub use http::format_redfish_error;
