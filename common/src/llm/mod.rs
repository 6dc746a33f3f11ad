pub mod model;
pub mod openai;

pub use model::{
    ChatModel, Embedder, FunctionCall, Message, MessageRole, ModelConfig, ToolCall, ToolSpec,
};
pub use openai::OpenAiClient;
