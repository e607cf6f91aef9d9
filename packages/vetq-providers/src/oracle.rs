use serde_json::Value;

use crate::{Error, Result};
use vetq_config::LlmProviderConfig;

/// Sends one chat completion and returns the JSON object the model answered with.
pub async fn complete(cfg: &LlmProviderConfig, messages: &[Value]) -> Result<Value> {
	let client = crate::client(cfg.timeout_ms)?;
	let url = format!("{}{}", cfg.api_base, cfg.path);
	let body = serde_json::json!({
		"model": cfg.model,
		"temperature": cfg.temperature,
		"messages": messages,
	});
	let res = client
		.post(&url)
		.headers(crate::auth_headers(&cfg.api_key, &cfg.default_headers)?)
		.json(&body)
		.send()
		.await?;
	let json: Value = res.error_for_status()?.json().await?;

	parse_completion(json)
}

/// Accepts an OpenAI-style completion envelope or a bare JSON object.
pub fn parse_completion(json: Value) -> Result<Value> {
	if let Some(content) = json
		.get("choices")
		.and_then(|v| v.as_array())
		.and_then(|arr| arr.first())
		.and_then(|choice| choice.get("message"))
		.and_then(|msg| msg.get("content"))
		.and_then(|c| c.as_str())
	{
		let parsed: Value = serde_json::from_str(strip_code_fence(content))?;

		if !parsed.is_object() {
			return Err(Error::InvalidResponse {
				message: "Oracle content is not a JSON object.".to_string(),
			});
		}

		return Ok(parsed);
	}
	if json.get("choices").is_none() && json.is_object() {
		return Ok(json);
	}

	Err(Error::InvalidResponse { message: "Oracle response is missing JSON content.".to_string() })
}

fn strip_code_fence(content: &str) -> &str {
	let trimmed = content.trim();
	let Some(rest) = trimmed.strip_prefix("```") else { return trimmed };
	// Drop the info string, e.g. "json".
	let body = rest.split_once('\n').map(|(_, body)| body).unwrap_or(rest);

	body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn parses_choice_content_json() {
		let json = json!({
			"choices": [
				{ "message": { "content": "{\"search_input\": \"pipeta\"}" } }
			]
		});
		let parsed = parse_completion(json).expect("Failed to parse completion.");

		assert_eq!(parsed["search_input"], "pipeta");
	}

	#[test]
	fn strips_markdown_fences() {
		let content = "```json\n{\"search_input\": \"power gold\"}\n```";
		let json = json!({ "choices": [{ "message": { "content": content } }] });
		let parsed = parse_completion(json).expect("Failed to parse fenced completion.");

		assert_eq!(parsed["search_input"], "power gold");
	}

	#[test]
	fn accepts_bare_objects() {
		let parsed = parse_completion(json!({ "search_input": "collar" }))
			.expect("Failed to parse bare object.");

		assert_eq!(parsed["search_input"], "collar");
	}

	#[test]
	fn rejects_non_object_content() {
		let json = json!({ "choices": [{ "message": { "content": "[1, 2]" } }] });

		assert!(matches!(parse_completion(json), Err(Error::InvalidResponse { .. })));
		assert!(parse_completion(json!({ "choices": [] })).is_err());
		assert!(parse_completion(json!("text")).is_err());
	}
}
