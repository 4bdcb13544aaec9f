//! Tool implementations.
//!
//! Each submodule holds the parameter structs for a family of tools (used for
//! both deserialisation and JSON schema generation) and an
//! `impl CloudGlueHandler` block with the tool bodies. Every tool returns the
//! text placed in the MCP response.

pub mod analysis;
pub mod collections;
pub mod ingest;
pub mod retrieval;
pub mod search;
pub mod segments;
pub mod videos;

pub use analysis::{DescribeVideoParams, ExtractVideoEntitiesParams, TranscribeVideoParams};
pub use collections::{
    AddVideoToCollectionParams, CreateCollectionParams, DeleteCollectionParams, ListCollectionsParams,
    RemoveVideoFromCollectionParams,
};
pub use ingest::{AddFileParams, AddYoutubeParams};
pub use retrieval::{RetrieveCollectionEntitiesParams, RetrieveDescriptionsParams, RetrieveSummariesParams};
pub use search::{ChatWithVideoCollectionParams, SearchParams};
pub use segments::{ListJobsParams, SegmentVideoCameraShotsParams, SegmentVideoChaptersParams};
pub use videos::{GetVideoInfoParams, ListVideosParams};
