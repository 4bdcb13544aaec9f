//! Tool schema validity tests.
//!
//! Every registered tool carries a name, a description and an object-typed
//! JSON schema listing its parameters.

use serde_json::Value;

/// Validates that a JSON schema has the required structure.
fn validate_json_schema(schema: &Value) -> Result<(), String> {
    let obj = schema
        .as_object()
        .ok_or_else(|| "Schema must be an object".to_string())?;

    if let Some(type_val) = obj.get("type") {
        if type_val != "object" {
            return Err(format!("Expected type 'object', got {:?}", type_val));
        }
    }

    if let Some(properties) = obj.get("properties") {
        if !properties.is_object() {
            return Err("Properties must be an object".to_string());
        }
    }

    if let Some(required) = obj.get("required") {
        let props = obj.get("properties").and_then(Value::as_object);
        for field in required.as_array().ok_or("Required must be an array")? {
            let field = field.as_str().ok_or("Required entries must be strings")?;
            if !props.is_some_and(|p| p.contains_key(field)) {
                return Err(format!("Required field '{}' missing from properties", field));
            }
        }
    }

    Ok(())
}

/// Validates that a tool has required fields.
fn validate_tool(tool: &rmcp::model::Tool) -> Result<(), String> {
    if tool.name.is_empty() {
        return Err("Tool name cannot be empty".to_string());
    }

    if tool.description.as_ref().is_none_or(|d| d.is_empty()) {
        return Err(format!("Tool '{}' must have a description", tool.name));
    }

    if tool.input_schema.is_empty() {
        return Err(format!("Tool '{}' must have an input schema", tool.name));
    }

    let schema_value = serde_json::to_value(&*tool.input_schema)
        .map_err(|e| format!("Failed to serialize schema: {}", e))?;
    validate_json_schema(&schema_value)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cloudglue_mcp_server::server::tools;
    use std::borrow::Cow;
    use std::sync::Arc;

    fn required_of(name: &str) -> Vec<String> {
        let tool = tools().into_iter().find(|t| t.name == name).unwrap();
        tool.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|r| r.iter().filter_map(|v| v.as_str().map(String::from)).collect())
            .unwrap_or_default()
    }

    #[test]
    fn test_json_schema_validation() {
        let valid_schema = serde_json::json!({
            "type": "object",
            "properties": { "url": { "type": "string" } },
            "required": ["url"]
        });
        assert!(validate_json_schema(&valid_schema).is_ok());

        let wrong_type = serde_json::json!({ "type": "string" });
        assert!(validate_json_schema(&wrong_type).is_err());

        let dangling = serde_json::json!({ "type": "object", "properties": {}, "required": ["url"] });
        assert!(validate_json_schema(&dangling).is_err());
    }

    #[test]
    fn test_tool_validation() {
        let nameless = rmcp::model::Tool {
            name: Cow::Borrowed(""),
            description: Some(Cow::Borrowed("A test tool")),
            input_schema: Arc::new(serde_json::Map::new()),
            annotations: None,
            icons: None,
            meta: None,
            output_schema: None,
            title: None,
        };
        assert!(validate_tool(&nameless).is_err());
    }

    #[test]
    fn test_every_registered_tool_is_valid() {
        let tools = tools();
        assert_eq!(tools.len(), 21);
        for tool in &tools {
            let result = validate_tool(tool);
            assert!(result.is_ok(), "Tool {} should be valid: {:?}", tool.name, result.err());
        }
    }

    #[test]
    fn test_required_parameters() {
        assert_eq!(required_of("describe_video"), vec!["url"]);
        assert_eq!(required_of("get_video_info"), vec!["file_id"]);
        assert!(required_of("list_videos").is_empty());
        assert!(required_of("add_file").is_empty());

        let mut search = required_of("search_video_moments");
        search.sort();
        assert_eq!(search, vec!["collection_id", "query"]);

        let mut youtube = required_of("add_youtube");
        youtube.sort();
        assert_eq!(youtube, vec!["collection_id"]);

        let mut extract = required_of("extract_video_entities");
        extract.sort();
        assert_eq!(extract, vec!["prompt"]);
    }

    #[test]
    fn test_param_structs_generate_valid_schemas() {
        use cloudglue_mcp_server::tools::{AddYoutubeParams, DescribeVideoParams, SearchParams};
        use schemars::schema_for;

        for schema in [
            serde_json::to_value(schema_for!(DescribeVideoParams)).unwrap(),
            serde_json::to_value(schema_for!(SearchParams)).unwrap(),
            serde_json::to_value(schema_for!(AddYoutubeParams)).unwrap(),
        ] {
            assert!(validate_json_schema(&schema).is_ok(), "{}", schema);
        }
    }

    #[test]
    fn test_job_kind_schema_lists_kinds() {
        let tool = tools().into_iter().find(|t| t.name == "list_jobs").unwrap();
        let text = serde_json::to_string(&*tool.input_schema).unwrap();
        for kind in ["describe", "transcribe", "extract", "segment"] {
            assert!(text.contains(&format!("\"{}\"", kind)), "list_jobs schema should list {}", kind);
        }
    }
}

#[cfg(test)]
mod property_tests {
    use cloudglue_mcp_server::server::tools;
    use proptest::prelude::*;

    proptest! {
        /// Tool names are snake_case identifiers.
        #[test]
        fn tool_names_are_snake_case(index in 0usize..21) {
            let tools = tools();
            let name = tools[index].name.as_ref();
            prop_assert!(name.chars().next().unwrap().is_ascii_lowercase());
            prop_assert!(name.chars().all(|c| c.is_ascii_lowercase() || c == '_'));
        }

        /// Descriptions are sentences, not placeholders.
        #[test]
        fn tool_descriptions_are_descriptive(index in 0usize..21) {
            let tools = tools();
            let desc = tools[index].description.as_deref().unwrap_or_default();
            prop_assert!(desc.len() >= 30, "{} description too short", tools[index].name);
            prop_assert!(desc.ends_with('.'));
        }
    }
}
