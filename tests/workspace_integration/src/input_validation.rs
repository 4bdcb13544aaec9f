//! Input parameter validation tests.
//!
//! Out-of-range or malformed parameters are rejected with field-level
//! details before any remote call, and surface through the server as an
//! `{"error": ...}` payload.

#[cfg(test)]
mod tests {
    use cloudglue_mcp_server::pagination::DateRange;
    use cloudglue_mcp_server::tools::*;

    fn list_videos(limit: u32) -> ListVideosParams {
        serde_json::from_value(serde_json::json!({ "limit": limit })).unwrap()
    }

    #[test]
    fn test_list_videos_limit_bounds() {
        assert!(list_videos(1).validate().is_ok());
        assert!(list_videos(100).validate().is_ok());

        let errors = list_videos(0).validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "limit"));
        assert!(list_videos(101).validate().is_err());
    }

    #[test]
    fn test_retrieval_limits_differ_per_tool() {
        let descriptions: RetrieveDescriptionsParams =
            serde_json::from_value(serde_json::json!({ "collection_id": "c1", "limit": 11 })).unwrap();
        assert!(descriptions.validate().is_err());

        let summaries: RetrieveSummariesParams =
            serde_json::from_value(serde_json::json!({ "collection_id": "c1", "limit": 50 })).unwrap();
        assert!(summaries.validate().is_ok());

        let entities: RetrieveCollectionEntitiesParams =
            serde_json::from_value(serde_json::json!({ "collection_id": "c1" })).unwrap();
        assert_eq!(entities.limit, 5);
        assert!(entities.validate().is_ok());
    }

    #[test]
    fn test_search_requires_query() {
        let params = SearchParams {
            collection_id: "c1".into(),
            query: "  ".into(),
            max_results: 5,
        };
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "query"));
    }

    #[test]
    fn test_transcribe_url_choice() {
        let both: TranscribeVideoParams = serde_json::from_value(serde_json::json!({
            "url": "https://e.com/a.mp4",
            "urls": ["https://e.com/b.mp4"]
        }))
        .unwrap();
        assert!(both.validate().is_err());

        let neither: TranscribeVideoParams = serde_json::from_value(serde_json::json!({})).unwrap();
        assert!(neither.validate().is_err());

        let many: TranscribeVideoParams = serde_json::from_value(serde_json::json!({
            "urls": (0..51).map(|i| format!("https://e.com/{}.mp4", i)).collect::<Vec<_>>()
        }))
        .unwrap();
        assert!(many.validate().is_err());
    }

    #[test]
    fn test_add_youtube_limit() {
        let params: AddYoutubeParams = serde_json::from_value(serde_json::json!({
            "collection_id": "c1",
            "playlist_url": "https://www.youtube.com/playlist?list=PL1",
            "limit": 20
        }))
        .unwrap();
        let errors = params.validate().unwrap_err();
        assert!(errors.iter().any(|e| e.field == "limit"));
    }

    #[test]
    fn test_entities_collection_needs_prompt() {
        let params: CreateCollectionParams = serde_json::from_value(serde_json::json!({
            "name": "Brands",
            "collection_type": "entities"
        }))
        .unwrap();
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_malformed_dates_rejected() {
        assert!(DateRange::parse(Some("2024-13-01"), None).is_err());
        assert!(DateRange::parse(None, Some("yesterday")).is_err());
        assert!(DateRange::parse(Some("2024-01-01"), Some("2024-01-31")).is_ok());
    }
}

#[cfg(test)]
mod property_tests {
    use cloudglue_mcp_server::tools::ListCollectionsParams;
    use proptest::prelude::*;

    proptest! {
        /// Limits inside 1..=100 validate, anything above does not.
        #[test]
        fn list_collections_limit_range(limit in 0u32..500) {
            let params: ListCollectionsParams =
                serde_json::from_value(serde_json::json!({ "limit": limit })).unwrap();
            prop_assert_eq!(params.validate().is_ok(), (1..=100).contains(&limit));
        }
    }
}
