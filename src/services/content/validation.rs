//! Validation for content generation requests.

use crate::error::{TutorError, TutorResult, RequestError, ValidationDetail};
use crate::types::{GenerateContentRequest, GenerationConfig, Part};

fn detail(field: impl Into<String>, description: &str) -> ValidationDetail {
    ValidationDetail {
        field: field.into(),
        description: description.to_string(),
    }
}

fn into_result(message: &str, details: Vec<ValidationDetail>) -> TutorResult<()> {
    if details.is_empty() {
        Ok(())
    } else {
        Err(TutorError::Request(RequestError::ValidationError {
            message: message.to_string(),
            details,
        }))
    }
}

/// Validate a generate content request.
pub fn validate_generate_request(request: &GenerateContentRequest) -> TutorResult<()> {
    let mut details = Vec::new();

    if request.contents.is_empty() {
        details.push(detail("contents", "Contents array cannot be empty"));
    }

    for (idx, content) in request.contents.iter().enumerate() {
        if content.parts.is_empty() {
            details.push(detail(format!("contents[{}].parts", idx), "Content must have at least one part"));
        }
        for (part_idx, part) in content.parts.iter().enumerate() {
            check_part(part, &format!("contents[{}].parts[{}]", idx, part_idx), &mut details);
        }
    }

    if let Some(system_instruction) = &request.system_instruction {
        if system_instruction.parts.is_empty() {
            details.push(detail("system_instruction.parts", "System instruction must have at least one part"));
        }
        for (part_idx, part) in system_instruction.parts.iter().enumerate() {
            check_part(part, &format!("system_instruction.parts[{}]", part_idx), &mut details);
        }
    }

    if let Some(config) = &request.generation_config {
        check_generation_config(config, &mut details);
    }

    into_result("Invalid generate content request", details)
}

fn check_part(part: &Part, prefix: &str, details: &mut Vec<ValidationDetail>) {
    match part {
        Part::Text { text } => {
            if text.is_empty() {
                details.push(detail(format!("{}.text", prefix), "Text cannot be empty"));
            }
        }
        Part::InlineData { inline_data } => {
            if inline_data.mime_type.is_empty() {
                details.push(detail(format!("{}.inline_data.mime_type", prefix), "MIME type is required"));
            }
            if inline_data.data.is_empty() {
                details.push(detail(format!("{}.inline_data.data", prefix), "Data cannot be empty"));
            }
        }
    }
}

/// Validate generation configuration.
pub fn validate_generation_config(config: &GenerationConfig) -> TutorResult<()> {
    let mut details = Vec::new();
    check_generation_config(config, &mut details);
    into_result("Invalid generation config", details)
}

fn check_generation_config(config: &GenerationConfig, details: &mut Vec<ValidationDetail>) {
    if config.temperature.is_some_and(|t| !(0.0..=2.0).contains(&t)) {
        details.push(detail("generation_config.temperature", "Temperature must be between 0.0 and 2.0"));
    }

    if config.top_p.is_some_and(|p| !(0.0..=1.0).contains(&p)) {
        details.push(detail("generation_config.top_p", "top_p must be between 0.0 and 1.0"));
    }

    if config.top_k.is_some_and(|k| k < 1) {
        details.push(detail("generation_config.top_k", "top_k must be >= 1"));
    }

    if config.max_output_tokens.is_some_and(|m| m < 1) {
        details.push(detail("generation_config.max_output_tokens", "max_output_tokens must be >= 1"));
    }

    if config.response_schema.is_some()
        && config.response_mime_type.as_deref() != Some("application/json")
    {
        details.push(detail(
            "generation_config.response_schema",
            "response_schema requires response_mime_type application/json",
        ));
    }
}

/// Validate a model name; both `gemini-2.5-flash` and `models/gemini-2.5-flash` are accepted.
pub fn validate_model_name(model: &str) -> TutorResult<()> {
    let mut details = Vec::new();

    let bare = model.strip_prefix("models/").unwrap_or(model);
    if bare.is_empty() {
        details.push(detail("model", "Model name must not be empty"));
    } else if bare.contains('/') {
        details.push(detail(
            "model",
            "Model name must either start with 'models/' or be a simple model name without slashes",
        ));
    }

    into_result("Invalid model name", details)
}
