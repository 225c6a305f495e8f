//! Seller-side client for the Kilat pet-services marketplace.
//!
//! ARCHITECTURE
//! ============
//! Leaf to root:
//! - [`storage`]: key-value persistence backends;
//! - [`token_store`]: access token, refresh token and cached profile;
//! - [`session`]: observable session state derived from the token store;
//! - [`client`] + [`refresh`]: bearer attachment and single-flight refresh;
//! - [`guard`]: gate for protected views;
//! - [`services`]: typed endpoint wrappers used by the CLI.
//!
//! Construct one [`client::ApiClient`] per process and share clones of it;
//! the refresh protocol is single-flight per client instance.

pub mod client;
pub mod config;
pub mod error;
pub mod format;
pub mod guard;
pub mod navigator;
pub mod refresh;
pub mod services;
pub mod session;
pub mod storage;
pub mod token_store;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;
