//! MCP Resources for the Cloudglue server.
//!
//! - `cloudglue://collections` - the first page of collections
//! - `cloudglue://collections/{id}` - a single collection

use crate::client::{CloudGlueApi, Collection, CollectionQuery};
use crate::handler::to_pretty;
use cloudglue_mcp_common::error::Result;
use serde_json::json;

pub const COLLECTIONS_URI: &str = "cloudglue://collections";

/// Collections listed by the index resource.
pub const RESOURCE_PAGE_LIMIT: u32 = 100;

/// `cloudglue://collections/{id}`
pub fn collection_uri(collection_id: &str) -> String {
    format!("{}/{}", COLLECTIONS_URI, collection_id)
}

/// Collection id of a `cloudglue://collections/{id}` URI.
pub fn collection_id_from_uri(uri: &str) -> Option<&str> {
    uri.strip_prefix(COLLECTIONS_URI)?
        .strip_prefix('/')
        .filter(|id| !id.is_empty() && !id.contains('/'))
}

/// First page of collections.
pub async fn list_collections(api: &dyn CloudGlueApi) -> Result<Vec<Collection>> {
    let page = api
        .list_collections(&CollectionQuery {
            limit: RESOURCE_PAGE_LIMIT,
            offset: 0,
            collection_type: None,
        })
        .await?;
    Ok(page.data)
}

/// Body of `cloudglue://collections`.
pub async fn collections_resource_json(api: &dyn CloudGlueApi) -> Result<String> {
    let collections = list_collections(api).await?;
    Ok(to_pretty(&json!({
        "collections": collections,
        "total": collections.len(),
    })))
}

/// Body of `cloudglue://collections/{id}`.
pub async fn collection_resource_json(api: &dyn CloudGlueApi, collection_id: &str) -> Result<String> {
    let collection = api.get_collection(collection_id).await?;
    Ok(to_pretty(&collection))
}
