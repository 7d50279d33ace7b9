//! MCP server implementation.

use crate::tools::{SearchRequest, handle_index_status, handle_refresh, handle_search};
use crate::worker::IndexState;
use rmcp::{
    ServerHandler,
    handler::server::{router::tool::ToolRouter, wrapper::Parameters},
    model::*,
    schemars::{self, JsonSchema, generate::SchemaSettings},
    tool, tool_handler, tool_router,
};
use std::sync::Arc;

/// MCP server answering field and code queries over the extension registry
#[derive(Clone)]
pub struct ExtensionServer {
    /// Shared index state (current index, in-flight build, query cache)
    state: Arc<IndexState>,

    /// Base URL for extension links in rendered results
    explorer_url: Arc<str>,

    /// Tool router for handling MCP tool calls
    tool_router: ToolRouter<Self>,
}

impl std::fmt::Debug for ExtensionServer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExtensionServer")
            .field("state", &self.state)
            .field("explorer_url", &self.explorer_url)
            .finish()
    }
}

#[tool_router]
impl ExtensionServer {
    pub fn new(state: Arc<IndexState>, explorer_url: &str) -> Self {
        Self {
            state,
            explorer_url: Arc::from(explorer_url),
            tool_router: Self::tool_router(),
        }
    }

    pub fn state(&self) -> &Arc<IndexState> {
        &self.state
    }

    #[tool(
        description = "Search fields and codes of Open Contracting extensions. Matches words against field paths (split on dots and camelCase), codes, titles and descriptions; every word must match. Returns ranked results with type, codelist and links to the extension explorer.",
        input_schema = inline_schema_for_type::<SearchRequest>()
    )]
    fn search(
        &self,
        Parameters(request): Parameters<SearchRequest>,
    ) -> std::result::Result<String, String> {
        handle_search(&self.state, &self.explorer_url, request)
    }

    #[tool(
        description = "Re-fetch the extension registry and rebuild the search index. Queries keep using the previous index until the new one is installed."
    )]
    async fn refresh(&self) -> std::result::Result<String, String> {
        handle_refresh(&self.state).await
    }

    #[tool(description = "Report whether the search index is ready, its generation and record counts.")]
    fn index_status(&self) -> std::result::Result<String, String> {
        Ok(handle_index_status(&self.state))
    }
}

#[tool_handler]
impl ServerHandler for ExtensionServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo::new(ServerCapabilities::builder().enable_tools().build())
            .with_protocol_version(ProtocolVersion::V_2024_11_05)
            .with_server_info(Implementation::from_build_env())
            .with_instructions(
                "extension-search: fuzzy search over the fields and codes of the Open Contracting \
                 extension registry. The index builds in the background on startup; use \
                 index_status to check readiness and search to query it."
                    .to_string(),
            )
    }
}

/// Generate an inline JSON schema for MCP tools
///
/// Unlike rmcp's default `schema_for_type()`, this sets `inline_subschemas = true` so the
/// `format` enum is rendered inline instead of through a `$ref`.
pub fn inline_schema_for_type<T: JsonSchema>() -> Arc<JsonObject> {
    let mut settings = SchemaSettings::draft07();
    settings.transforms = vec![Box::new(schemars::transform::AddNullable::default())];
    settings.inline_subschemas = true;

    let generator = settings.into_generator();
    let schema = generator.into_root_schema_for::<T>();

    match serde_json::to_value(schema) {
        Ok(serde_json::Value::Object(object)) => Arc::new(object),
        _ => Arc::new(JsonObject::new()),
    }
}
