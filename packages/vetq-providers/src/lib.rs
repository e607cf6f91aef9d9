//! HTTP adapters for the two external calls: the disambiguation oracle and catalog retrieval.

pub mod error;
pub mod oracle;
pub mod retrieval;

pub use error::{Error, Result};

use std::time::Duration;

use reqwest::{
	Client,
	header::{AUTHORIZATION, HeaderMap, HeaderName},
};
use serde_json::{Map, Value};

pub fn auth_headers(api_key: &str, default_headers: &Map<String, Value>) -> Result<HeaderMap> {
	let mut headers = HeaderMap::new();

	headers.insert(AUTHORIZATION, format!("Bearer {api_key}").parse()?);

	for (key, value) in default_headers {
		let Some(raw) = value.as_str() else {
			return Err(Error::InvalidConfig {
				message: "Default header values must be strings.".to_string(),
			});
		};

		headers.insert(HeaderName::from_bytes(key.as_bytes())?, raw.parse()?);
	}

	Ok(headers)
}

fn client(timeout_ms: u64) -> Result<Client> {
	Ok(Client::builder().timeout(Duration::from_millis(timeout_ms)).build()?)
}

#[cfg(test)]
mod tests {
	use serde_json::json;

	use super::*;

	#[test]
	fn default_headers_are_merged() {
		let extra = json!({ "x-tenant": "vet" });
		let headers = auth_headers("secret", extra.as_object().expect("Failed to build map."))
			.expect("Failed to build headers.");

		assert_eq!(headers.get(AUTHORIZATION).map(|v| v.as_bytes()), Some(&b"Bearer secret"[..]));
		assert_eq!(headers.get("x-tenant").map(|v| v.as_bytes()), Some(&b"vet"[..]));
	}

	#[test]
	fn non_string_header_values_are_rejected() {
		let extra = json!({ "x-retries": 3 });
		let err = auth_headers("secret", extra.as_object().expect("Failed to build map."))
			.expect_err("Expected header validation to fail.");

		assert!(matches!(err, Error::InvalidConfig { .. }));
	}
}
