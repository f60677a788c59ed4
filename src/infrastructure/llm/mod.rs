pub mod anthropic;
pub mod embedding;
pub mod http_client;
pub mod openai;
pub mod pool;

pub use anthropic::AnthropicProvider;
pub use embedding::{DisabledEmbeddingProvider, OpenAiEmbeddingProvider};
pub use http_client::{HttpClient, HttpClientTrait};
pub use openai::OpenAiProvider;
pub use pool::{ConnectionPool, PoolConfig};
