#![doc = "copr-fetch-core: core logic library for copr-fetch."]

//! Finds the most recent build of a COPR repository, lists the package files
//! it produced and downloads them with a bounded pool of workers.
//!
//! # Usage
//! Call [`pipeline::run`] with an [`fetch::HttpPageFetcher`] and a
//! [`config::FetchConfig`], or drive the stages in [`discovery`] and
//! [`download`] individually.

pub mod config;
pub mod contract;
pub mod discovery;
pub mod download;
pub mod error;
pub mod fetch;
pub mod layout;
pub mod pipeline;
