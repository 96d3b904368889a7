//! Photo validator: an infer/act loop around a tool-calling chat model.
//!
//! The model is asked to score a donation photo. It may first request the
//! `validate_donation_photo` tool, which describes the photo via the vision
//! model; the description is fed back and the model is called again. The loop
//! ends when the model stops asking for tools, when a call fails, when the
//! photo is missing, or when `max_tool_rounds` tool rounds have run.

use std::sync::Arc;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use serde_json::json;
use w2g_core::{
    run_graph, ExecutionContext, GiveState, GraphNode, Stage, StageError, StageGraph, StageOutput,
    Transition,
};
use w2g_vision::{ChatMessage, ChatModel, DescribeError, PhotoDescriber, ToolSpec};

pub const PHOTO_TOOL: &str = "validate_donation_photo";
pub const IMAGE_FILE_ERROR: &str = "Image file error";
pub const TOOL_NOT_FOUND: &str = "Tool not found.";

pub const DEFAULT_SYSTEM_PROMPT: &str = "You are a donation validation agent. You'll be given a description of an image. \
Based on the description, determine whether the image clearly shows a successful donation, \
such as a child receiving a snack or a donation being handed over. \
Assign a score (0 to 1) based on how likely the image is valid, where 1 is highly valid. \
Reply with Score: <value> and explain why.";

static SCORE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)score[:\s]*(\d+(?:\.\d+)?)").expect("score pattern is valid")
});

/// First `score <number>` in `text`, clamped to `[0, 1]`; `0.0` when absent.
pub fn extract_score(text: &str) -> f64 {
    let Some(caps) = SCORE_RE.captures(text) else {
        tracing::warn!("no score found in model output");
        return 0.0;
    };
    caps.get(1)
        .and_then(|m| m.as_str().parse::<f64>().ok())
        .map(|score| score.clamp(0.0, 1.0))
        .unwrap_or(0.0)
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidatorInput {
    pub photo_path: String,
}

/// Result returned to callers of the validator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ValidationOutcome {
    pub validation_result: bool,
    pub score: f64,
}

impl ValidationOutcome {
    fn rejected() -> Self {
        Self {
            validation_result: false,
            score: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct ValidatorState {
    pub photo_path: String,
    pub messages: Vec<ChatMessage>,
    pub score: f64,
    pub validation_result: bool,
    pub model_failed: bool,
    pub tool_rounds: u32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidatorNode {
    Infer,
    Act,
}

impl GraphNode for ValidatorNode {
    fn name(self) -> &'static str {
        match self {
            ValidatorNode::Infer => "infer",
            ValidatorNode::Act => "act",
        }
    }
}

pub struct PhotoValidatorStage {
    model: Arc<dyn ChatModel>,
    describer: Arc<dyn PhotoDescriber>,
    threshold: f64,
    max_tool_rounds: u32,
    system_prompt: String,
    tools: Vec<ToolSpec>,
}

impl PhotoValidatorStage {
    pub fn new(
        model: Arc<dyn ChatModel>,
        describer: Arc<dyn PhotoDescriber>,
        threshold: f64,
        max_tool_rounds: u32,
    ) -> Self {
        Self {
            model,
            describer,
            threshold,
            max_tool_rounds,
            system_prompt: DEFAULT_SYSTEM_PROMPT.to_string(),
            tools: vec![photo_tool_spec()],
        }
    }

    pub fn with_system_prompt(mut self, prompt: impl Into<String>) -> Self {
        self.system_prompt = prompt.into();
        self
    }

    pub fn validate(
        &self,
        input: ValidatorInput,
        ctx: &ExecutionContext,
    ) -> Result<(ValidationOutcome, Vec<&'static str>), StageError> {
        let state = ValidatorState {
            messages: vec![ChatMessage::user(format!(
                "Please validate this donation photo: {}",
                input.photo_path
            ))],
            photo_path: input.photo_path,
            score: 0.0,
            validation_result: false,
            model_failed: false,
            tool_rounds: 0,
        };

        let run = run_graph(self, state, ctx)?;
        let outcome = ValidationOutcome {
            validation_result: run.state.validation_result,
            score: run.state.score,
        };

        let _enter = ctx.span().enter();
        tracing::info!(
            score = outcome.score,
            valid = outcome.validation_result,
            "photo validation finished"
        );
        Ok((outcome, run.path))
    }

    fn infer(&self, mut state: ValidatorState) -> (ValidatorState, Transition<ValidatorNode>) {
        let mut messages = Vec::with_capacity(state.messages.len() + 1);
        if !self.system_prompt.is_empty() {
            messages.push(ChatMessage::system(self.system_prompt.clone()));
        }
        messages.extend(state.messages.iter().cloned());

        tracing::info!(messages = messages.len(), "calling model");
        let reply = match self.model.complete(&messages, &self.tools) {
            Ok(reply) => reply,
            Err(e) => {
                tracing::error!(error = %e, "model invocation failed");
                state.score = 0.0;
                state.validation_result = false;
                state.model_failed = true;
                let transition = self.exists_action(&state, false);
                return (state, transition);
            }
        };

        state.score = extract_score(&reply.content);
        state.validation_result = state.score >= self.threshold;
        let wants_tools = reply.wants_tools();
        state.messages.push(ChatMessage::assistant(&reply));

        let transition = self.exists_action(&state, wants_tools);
        (state, transition)
    }

    /// Branch predicate: loop into `act` only while the model asks for tools,
    /// nothing has failed and the round budget is not spent.
    fn exists_action(&self, state: &ValidatorState, wants_tools: bool) -> Transition<ValidatorNode> {
        if state.model_failed {
            tracing::warn!("model failed, stopping flow");
            return Transition::Terminal;
        }
        if !wants_tools {
            return Transition::Terminal;
        }
        if state.tool_rounds >= self.max_tool_rounds {
            tracing::warn!(rounds = state.tool_rounds, "tool round limit reached, stopping flow");
            return Transition::Terminal;
        }
        Transition::Branch(ValidatorNode::Act)
    }

    fn act(&self, mut state: ValidatorState) -> (ValidatorState, Transition<ValidatorNode>) {
        let calls = state
            .messages
            .last()
            .map(|m| m.tool_calls.clone())
            .unwrap_or_default();
        state.tool_rounds += 1;

        for call in &calls {
            tracing::debug!(tool = %call.name, "calling tool");
            if call.name != PHOTO_TOOL {
                tracing::warn!(tool = %call.name, "tool not found");
                state.messages.push(ChatMessage::tool(call, TOOL_NOT_FOUND));
                continue;
            }

            let photo_path = call
                .str_arg("photo_path")
                .filter(|p| !p.trim().is_empty())
                .unwrap_or(&state.photo_path)
                .to_string();

            match self.describer.describe(&photo_path) {
                Ok(description) => state.messages.push(ChatMessage::tool(call, description)),
                Err(DescribeError::NotFound(path)) => {
                    tracing::warn!(photo = %path, "photo not found, stopping early");
                    state.messages.push(ChatMessage::tool(call, IMAGE_FILE_ERROR));
                    state.score = 0.0;
                    state.validation_result = false;
                    return (state, Transition::Terminal);
                }
                Err(e) => {
                    tracing::error!(error = %e, "photo description failed");
                    state.messages.push(ChatMessage::tool(call, e.to_string()));
                    state.score = 0.0;
                    state.validation_result = false;
                    state.model_failed = true;
                    return (state, Transition::Terminal);
                }
            }
        }

        (state, Transition::Continue(ValidatorNode::Infer))
    }
}

fn photo_tool_spec() -> ToolSpec {
    ToolSpec {
        name: PHOTO_TOOL.to_string(),
        description: "Uses the vision model to extract a description of the donation photo. \
It does not decide whether the photo is valid."
            .to_string(),
        parameters: json!({
            "type": "object",
            "properties": {
                "photo_path": { "type": "string", "description": "Path of the photo to describe" }
            },
            "required": ["photo_path"]
        }),
    }
}

impl StageGraph for PhotoValidatorStage {
    type State = ValidatorState;
    type Node = ValidatorNode;

    fn name(&self) -> &'static str {
        "photo_validator"
    }

    fn entry(&self) -> ValidatorNode {
        ValidatorNode::Infer
    }

    fn step(&self, node: ValidatorNode, state: ValidatorState) -> (ValidatorState, Transition<ValidatorNode>) {
        match node {
            ValidatorNode::Infer => self.infer(state),
            ValidatorNode::Act => self.act(state),
        }
    }
}

impl Stage for PhotoValidatorStage {
    fn id(&self) -> &'static str {
        "photo_validator"
    }

    fn inputs(&self) -> &'static [&'static str] {
        &["photo_path"]
    }

    fn deterministic(&self) -> bool {
        false
    }

    fn run(&self, state: &GiveState, ctx: &ExecutionContext) -> Result<StageOutput, StageError> {
        let (outcome, path) = match &state.photo_path {
            Some(photo_path) => self.validate(
                ValidatorInput {
                    photo_path: photo_path.clone(),
                },
                ctx,
            )?,
            None => {
                let _enter = ctx.span().enter();
                tracing::warn!("no photo supplied, rejecting validation");
                (ValidationOutcome::rejected(), Vec::new())
            }
        };

        Ok(StageOutput {
            patch: GiveState {
                validation_result: Some(outcome.validation_result),
                score: Some(outcome.score),
                ..GiveState::default()
            },
            path,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use w2g_vision::testing::{photo_tool_reply, ScriptedModel, StaticDescriber};
    use w2g_vision::{ModelError, ModelReply};

    const PHOTO: &str = "./images/sharing.jpg";

    fn stage(model: Arc<ScriptedModel>, describer: Arc<StaticDescriber>) -> PhotoValidatorStage {
        PhotoValidatorStage::new(model, describer, 0.75, 3)
    }

    fn input() -> ValidatorInput {
        ValidatorInput {
            photo_path: PHOTO.to_string(),
        }
    }

    #[test]
    fn extracts_first_score() {
        assert_eq!(extract_score("Score: 0.85 because a child holds a snack"), 0.85);
        assert_eq!(extract_score("SCORE 0.4, later score: 0.9"), 0.4);
        assert_eq!(extract_score("score:1"), 1.0);
    }

    #[test]
    fn missing_score_defaults_to_zero() {
        assert_eq!(extract_score("The photo looks fine."), 0.0);
        assert_eq!(extract_score("score: none"), 0.0);
    }

    #[test]
    fn score_extraction_is_idempotent() {
        let text = "Score: 0.85 because...";
        assert_eq!(extract_score(text), extract_score(text));
    }

    #[test]
    fn out_of_range_scores_are_clamped() {
        assert_eq!(extract_score("Score: 85"), 1.0);
    }

    #[test]
    fn tool_round_then_valid_score() {
        let model = Arc::new(ScriptedModel::tool_then_text(PHOTO, "Score: 0.9 a donation is handed over"));
        let describer = Arc::new(StaticDescriber::describing("A child receiving a snack."));
        let validator = stage(model.clone(), describer.clone());

        let (outcome, path) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert!(outcome.validation_result);
        assert_eq!(outcome.score, 0.9);
        assert_eq!(path, vec!["infer", "act", "infer"]);
        assert_eq!(model.calls(), 2);
        assert_eq!(describer.calls(), 1);
    }

    #[test]
    fn validity_follows_threshold() {
        for (text, expected) in [("Score: 0.75", true), ("Score: 0.74", false), ("Score: 0.2", false)] {
            let model = Arc::new(ScriptedModel::new([Ok(ModelReply::text(text))]));
            let validator = stage(model, Arc::new(StaticDescriber::describing("unused")));
            let (outcome, _) = validator.validate(input(), &ExecutionContext::new()).unwrap();
            assert_eq!(outcome.validation_result, expected, "for {}", text);
            assert_eq!(outcome.validation_result, outcome.score >= 0.75);
        }
    }

    #[test]
    fn model_failure_terminates_with_zero_score() {
        let model = Arc::new(ScriptedModel::new([Err(ModelError::Timeout(
            "deadline elapsed".to_string(),
        ))]));
        let describer = Arc::new(StaticDescriber::describing("unused"));
        let validator = stage(model.clone(), describer.clone());

        let (outcome, path) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert_eq!(outcome, ValidationOutcome::rejected());
        assert_eq!(path, vec!["infer"]);
        assert_eq!(describer.calls(), 0);
    }

    #[test]
    fn missing_photo_short_circuits() {
        let model = Arc::new(ScriptedModel::tool_then_text(PHOTO, "Score: 0.9"));
        let describer = Arc::new(StaticDescriber::failing(DescribeError::NotFound(
            PHOTO.to_string(),
        )));
        let validator = stage(model.clone(), describer);

        let (outcome, path) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert_eq!(outcome, ValidationOutcome::rejected());
        assert_eq!(path, vec!["infer", "act"]);
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn describer_model_failure_is_absorbed() {
        let model = Arc::new(ScriptedModel::tool_then_text(PHOTO, "Score: 0.9"));
        let describer = Arc::new(StaticDescriber::failing(DescribeError::Model(
            ModelError::Transport("connection reset".to_string()),
        )));
        let validator = stage(model.clone(), describer);

        let (outcome, _) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert_eq!(outcome, ValidationOutcome::rejected());
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn unknown_tool_is_reported_back_to_the_model() {
        let mut bogus = photo_tool_reply("call_1", PHOTO);
        bogus.tool_calls[0].name = "delete_everything".to_string();
        let model = Arc::new(ScriptedModel::new([Ok(bogus), Ok(ModelReply::text("Score: 0.1"))]));
        let describer = Arc::new(StaticDescriber::describing("unused"));
        let validator = stage(model.clone(), describer.clone());

        let (outcome, path) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert_eq!(outcome.score, 0.1);
        assert_eq!(path, vec!["infer", "act", "infer"]);
        assert_eq!(describer.calls(), 0);
    }

    #[test]
    fn tool_rounds_are_capped() {
        let replies = (0..10).map(|i| Ok(photo_tool_reply(&format!("call_{}", i), PHOTO)));
        let model = Arc::new(ScriptedModel::new(replies));
        let describer = Arc::new(StaticDescriber::describing("A photo."));
        let validator = stage(model.clone(), describer.clone());

        let (outcome, path) = validator.validate(input(), &ExecutionContext::new()).unwrap();
        assert!(!outcome.validation_result);
        assert_eq!(describer.calls(), 3);
        assert_eq!(model.calls(), 4);
        assert_eq!(path.last(), Some(&"infer"));
    }

    #[test]
    fn stage_without_photo_is_rejected_without_calling_the_model() {
        let model = Arc::new(ScriptedModel::new(Vec::<Result<ModelReply, ModelError>>::new()));
        let validator = stage(model.clone(), Arc::new(StaticDescriber::describing("unused")));

        let out = Stage::run(&validator, &GiveState::default(), &ExecutionContext::new()).unwrap();
        assert_eq!(out.patch.validation_result, Some(false));
        assert_eq!(out.patch.score, Some(0.0));
        assert_eq!(model.calls(), 0);
    }
}
