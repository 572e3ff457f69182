pub mod http;
pub mod mcp_server;
