//! Search Adapter - Tavily 网页搜索客户端

mod tavily_client;

pub use tavily_client::*;
