//! OpenAI chat request → backend generation request.
//!
//! The backend takes a single prompt string, so the conversation is
//! flattened into one `"<Label>: <content>\n"` line per message followed by
//! an open `"Assistant: "` turn.

use std::fmt::Write as _;

use oaibridge_core::{ChatMessage, GenerationOptions, GenerationRequest, ValidationError};

use crate::models::ChatCompletionRequest;

/// Label that opens the turn the model is asked to complete.
const OPEN_TURN: &str = "Assistant: ";

/// Parse a raw request body.
///
/// Body-shape failures (bad JSON, missing `messages`, unknown role) all
/// surface as `MalformedBody`.
pub fn parse_request(body: &[u8]) -> Result<ChatCompletionRequest, ValidationError> {
    serde_json::from_slice(body).map_err(|e| ValidationError::MalformedBody(e.to_string()))
}

/// Flatten a conversation into a single prompt, preserving message order.
pub fn flatten_prompt(messages: &[ChatMessage]) -> Result<String, ValidationError> {
    if messages.is_empty() {
        return Err(ValidationError::EmptyConversation);
    }

    let mut prompt = String::new();
    for message in messages {
        // Writing into a String cannot fail.
        let _ = writeln!(prompt, "{}: {}", message.role.prompt_label(), message.text());
    }
    prompt.push_str(OPEN_TURN);
    Ok(prompt)
}

/// Build the backend request for `request`.
///
/// `default_model` is used when the client names no model (or a blank one).
pub fn build_generation_request(
    request: ChatCompletionRequest,
    default_model: &str,
) -> Result<GenerationRequest, ValidationError> {
    let prompt = flatten_prompt(&request.messages)?;

    if let Some(temperature) = request.temperature {
        check_range("temperature", temperature, 0.0, 2.0)?;
    }
    if let Some(top_p) = request.top_p {
        check_range("top_p", top_p, 0.0, 1.0)?;
    }

    let model = request
        .model
        .as_deref()
        .map(str::trim)
        .filter(|model| !model.is_empty())
        .unwrap_or(default_model);

    let options = GenerationOptions {
        temperature: request.temperature,
        top_p: request.top_p,
        num_predict: request.max_tokens,
        stop: request
            .stop
            .map(crate::models::StopSequences::into_vec)
            .filter(|stops| !stops.is_empty()),
    };

    Ok(GenerationRequest::new(model, prompt)
        .streaming(request.stream.unwrap_or(false))
        .with_options(options))
}

fn check_range(name: &'static str, value: f64, min: f64, max: f64) -> Result<(), ValidationError> {
    if (min..=max).contains(&value) {
        Ok(())
    } else {
        Err(ValidationError::InvalidParameter {
            name,
            reason: format!("{value} is outside [{min}, {max}]"),
        })
    }
}
