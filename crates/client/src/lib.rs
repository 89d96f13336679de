//! Client code for the franchise resolver.
//!
//! This crate provides the HTTP transport for the upstream agency directory:
//! bearer-token acquisition and the [`PageFetcher`](franchise_core::PageFetcher)
//! implementation the directory transform runs on.

pub mod directory;

#[cfg(test)]
pub(crate) mod testing;

pub use directory::{
    BearerTokenProvider, DirectoryClient, DirectoryConfig, RetryPolicy, StaticToken, TokenSource, http_client,
};
