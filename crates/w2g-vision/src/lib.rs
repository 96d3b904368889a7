//! Watch2Give Vision: model access for the photo validator.
//!
//! Two seams are exposed as traits so the validator can be exercised without
//! network access:
//!
//! - [`ChatModel`]: a tool-capable chat completion model.
//! - [`PhotoDescriber`]: turns a photo on disk into a text description.
//!
//! [`GroqClient`] implements both against an OpenAI-compatible endpoint.

pub mod describe;
pub mod groq;
pub mod message;
pub mod model;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use describe::{image_data_uri, DescribeError, PhotoDescriber, VisionDescriber};
pub use groq::GroqClient;
pub use message::{ChatMessage, ModelReply, Role, ToolCall, ToolSpec};
pub use model::{ChatModel, ModelError};
