//! Cloudglue MCP Server Library
//!
//! Video understanding over MCP: collections, transcripts, descriptions,
//! entities, segmentation, search and chat backed by the Cloudglue API.
//!
//! The tools are built on three primitives: [`poller::JobPoller`] drives
//! remote jobs to a terminal state, [`batch::run_batched`] runs bounded
//! concurrent chunks, and [`pagination::filter_fetch`] pages over
//! date-filtered listings.

pub mod batch;
pub mod client;
pub mod handler;
pub mod pagination;
pub mod poller;
pub mod resources;
pub mod server;
pub mod tools;
pub mod youtube;

#[cfg(test)]
mod testing;

pub use client::{CloudGlueApi, CloudGlueClient};
pub use handler::CloudGlueHandler;
pub use server::CloudGlueServer;
