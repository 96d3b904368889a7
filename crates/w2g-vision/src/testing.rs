//! Scripted doubles for exercising the validator without a network.
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use serde_json::json;

use crate::describe::{DescribeError, PhotoDescriber};
use crate::message::{ChatMessage, ModelReply, ToolCall, ToolSpec};
use crate::model::{ChatModel, ModelError};

/// Replays a fixed sequence of replies, one per `complete` call.
///
/// Once the script runs out every further call fails with a transport error.
pub struct ScriptedModel {
    replies: Mutex<VecDeque<Result<ModelReply, ModelError>>>,
    calls: AtomicUsize,
}

impl ScriptedModel {
    pub fn new(replies: impl IntoIterator<Item = Result<ModelReply, ModelError>>) -> Self {
        Self {
            replies: Mutex::new(replies.into_iter().collect()),
            calls: AtomicUsize::new(0),
        }
    }

    /// A model that asks for the photo tool once, then scores with `final_text`.
    pub fn tool_then_text(photo_path: &str, final_text: &str) -> Self {
        Self::new([
            Ok(photo_tool_reply("call_1", photo_path)),
            Ok(ModelReply::text(final_text)),
        ])
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl ChatModel for ScriptedModel {
    fn complete(&self, _messages: &[ChatMessage], _tools: &[ToolSpec]) -> Result<ModelReply, ModelError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let mut replies = self
            .replies
            .lock()
            .map_err(|e| ModelError::Transport(e.to_string()))?;
        replies
            .pop_front()
            .unwrap_or_else(|| Err(ModelError::Transport("script exhausted".to_string())))
    }
}

/// A reply that requests `validate_donation_photo` for `photo_path`.
pub fn photo_tool_reply(call_id: &str, photo_path: &str) -> ModelReply {
    ModelReply {
        content: String::new(),
        tool_calls: vec![ToolCall {
            id: call_id.to_string(),
            name: "validate_donation_photo".to_string(),
            arguments: json!({ "photo_path": photo_path }),
        }],
    }
}

/// Returns the same outcome for every photo and counts calls.
pub struct StaticDescriber {
    outcome: Result<String, DescribeError>,
    calls: AtomicUsize,
}

impl StaticDescriber {
    pub fn describing(description: &str) -> Self {
        Self {
            outcome: Ok(description.to_string()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(err: DescribeError) -> Self {
        Self {
            outcome: Err(err),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl PhotoDescriber for StaticDescriber {
    fn describe(&self, _photo_path: &str) -> Result<String, DescribeError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.outcome.clone()
    }
}
