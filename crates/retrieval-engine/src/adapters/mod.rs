//! HTTP adapters for the services the engine depends on. Each is
//! defined behind a trait so the pipeline and engine can be exercised
//! against in-process fakes (see `crate::testing`) without touching
//! the network.

mod signing;
mod index_client;
mod embedding_client;
mod chat_completion_client;
mod chat_platform_client;

pub use signing::sign_request;
pub use index_client::{IndexClient, IndexClientConfig, IndexHit, IndexSearchResponse, HttpIndexClient};
pub use embedding_client::{EmbeddingClient, EmbeddingClientConfig, HttpEmbeddingClient, EMBEDDING_DIMENSIONS};
pub use chat_completion_client::{
    ChatCompletionClient, ChatCompletionConfig, ChatMessageRole, ChatTurn, HttpChatCompletionClient,
};
pub use chat_platform_client::{
    ChatPlatformClient, ChatPlatformConfig, ChatSearchResponse, HttpChatPlatformClient,
};
