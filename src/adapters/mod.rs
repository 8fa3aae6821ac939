// Adapters layer: concrete implementations for external systems (storage, http).

pub mod openai;
pub mod storage;

pub use openai::OpenAiClient;
pub use storage::LocalStorage;
