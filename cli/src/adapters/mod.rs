mod http_collector;
mod http_embedder;
mod http_llm;

pub use http_collector::HttpCollector;
pub use http_embedder::HttpEmbedder;
pub use http_llm::HttpLlmBackend;
