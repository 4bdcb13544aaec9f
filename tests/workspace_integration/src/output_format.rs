//! Output format tests.
//!
//! Every tool answers with exactly one text content item. Failures keep that
//! shape and carry an `{"error": ...}` JSON body; only malformed arguments and
//! unknown tools are protocol errors.

use rmcp::model::{CallToolResult, RawContent};
use serde_json::Value;

/// The single text item of a tool result.
fn single_text(result: &CallToolResult) -> Result<&str, String> {
    if result.content.len() != 1 {
        return Err(format!("Expected one content item, got {}", result.content.len()));
    }
    match &result.content[0].raw {
        RawContent::Text(text) if !text.text.is_empty() => Ok(text.text.as_str()),
        RawContent::Text(_) => Err("Text content should not be empty".to_string()),
        _ => Err("Tool results should be text".to_string()),
    }
}

/// Parse an error envelope, checking it names an error.
fn error_body(result: &CallToolResult) -> Result<Value, String> {
    let text = single_text(result)?;
    let body: Value = serde_json::from_str(text).map_err(|e| format!("Not JSON: {}", e))?;
    match body.get("error").and_then(Value::as_str) {
        Some(message) if !message.is_empty() => Ok(body),
        _ => Err(format!("Missing error message in {}", text)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_config;
    use cloudglue_mcp_server::CloudGlueServer;
    use rmcp::model::{Content, JsonObject};

    fn server() -> CloudGlueServer {
        CloudGlueServer::new(test_config()).unwrap()
    }

    fn args(value: Value) -> Option<JsonObject> {
        value.as_object().cloned()
    }

    #[test]
    fn test_single_text_helper() {
        let ok = CallToolResult::success(vec![Content::text("done")]);
        assert_eq!(single_text(&ok).unwrap(), "done");

        let empty = CallToolResult::success(vec![Content::text("")]);
        assert!(single_text(&empty).is_err());

        let two = CallToolResult::success(vec![Content::text("a"), Content::text("b")]);
        assert!(single_text(&two).is_err());
    }

    #[tokio::test]
    async fn test_validation_failure_is_error_envelope() {
        let result = server()
            .dispatch("retrieve_summaries", args(serde_json::json!({ "collection_id": "c1", "limit": 99 })))
            .await
            .unwrap();
        let body = error_body(&result).unwrap();
        assert_eq!(body["tool"], "retrieve_summaries");
        assert!(body["error"].as_str().unwrap().contains("limit"));
    }

    #[tokio::test]
    async fn test_youtube_segmentation_rejected_in_envelope() {
        let result = server()
            .dispatch("segment_video_camera_shots", args(serde_json::json!({ "url": "https://youtu.be/x" })))
            .await
            .unwrap();
        let body = error_body(&result).unwrap();
        assert_eq!(body["url"], "https://youtu.be/x");
    }

    #[tokio::test]
    async fn test_add_file_source_choice_in_envelope() {
        let result = server().dispatch("add_file", args(serde_json::json!({}))).await.unwrap();
        let body = error_body(&result).unwrap();
        assert_eq!(body["error"], "Must provide either local_file_path or file_id");
    }

    #[tokio::test]
    async fn test_unreachable_api_still_answers_with_text() {
        let result = server()
            .dispatch("get_video_info", args(serde_json::json!({ "file_id": "f1" })))
            .await
            .unwrap();
        let body = error_body(&result).unwrap();
        assert_eq!(body["tool"], "get_video_info");
    }

    #[tokio::test]
    async fn test_protocol_errors() {
        let s = server();
        assert!(s.dispatch("no_such_tool", None).await.is_err());
        assert!(s.dispatch("describe_video", args(serde_json::json!({ "page": 1 }))).await.is_err());
    }
}
