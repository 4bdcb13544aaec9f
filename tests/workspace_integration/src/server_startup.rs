//! Server startup integration tests.
//!
//! The server can be built from a configuration and advertises its tools and
//! resources.

#[cfg(test)]
mod tests {
    use crate::test_config;
    use cloudglue_mcp_common::{ConfigArgs, ConfigError};
    use cloudglue_mcp_server::CloudGlueServer;
    use rmcp::ServerHandler;

    #[test]
    fn test_server_startup() {
        let server = CloudGlueServer::new(test_config()).expect("server should build");
        let info = server.get_info();

        assert_eq!(info.server_info.name, "cloudglue-mcp-server");
        let instructions = info.instructions.as_ref().unwrap().to_lowercase();
        assert!(instructions.contains("video"), "Server instructions should mention 'video'");
        assert!(info.capabilities.tools.is_some());
        assert!(info.capabilities.resources.is_some());
    }

    #[test]
    fn test_instructions_name_every_tool() {
        let server = CloudGlueServer::new(test_config()).unwrap();
        let instructions = server.get_info().instructions.unwrap();
        for tool in cloudglue_mcp_server::server::tools() {
            assert!(
                instructions.contains(tool.name.as_ref()),
                "instructions should mention {}",
                tool.name
            );
        }
    }

    #[test]
    fn test_missing_api_key_is_fatal() {
        let args = ConfigArgs {
            api_key: None,
            ..Default::default()
        };
        let err = args.into_config().unwrap_err();
        assert!(matches!(err, ConfigError::MissingEnvVar(_)), "{:?}", err);
    }

    #[test]
    fn test_server_is_cloneable_for_http_sessions() {
        let server = CloudGlueServer::new(test_config()).unwrap();
        let clone = server.clone();
        assert_eq!(clone.get_info().server_info.name, server.get_info().server_info.name);
    }
}
