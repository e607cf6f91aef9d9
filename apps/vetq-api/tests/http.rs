use std::sync::Arc;

use axum::{
	Router,
	body::{self, Body},
	http::{Request, StatusCode},
};
use serde_json::{Value, json};
use tower::util::ServiceExt;

use vetq_api::{routes, state::AppState};
use vetq_testkit::{ScriptedOracle, StaticRetrieval};

fn app(oracle: ScriptedOracle, retrieval: StaticRetrieval) -> Router {
	let service = vetq_testkit::service(Arc::new(oracle), Arc::new(retrieval))
		.expect("Failed to build service.");

	routes::router(AppState::from_service(service))
}

fn post(uri: &str, payload: Value) -> Request<Body> {
	Request::builder()
		.method("POST")
		.uri(uri)
		.header("content-type", "application/json")
		.body(Body::from(payload.to_string()))
		.expect("Failed to build request.")
}

async fn json_body(response: axum::response::Response) -> Value {
	let bytes =
		body::to_bytes(response.into_body(), usize::MAX).await.expect("Failed to read body.");

	serde_json::from_slice(&bytes).expect("Failed to parse response body.")
}

#[tokio::test]
async fn health_ok() {
	let app = app(ScriptedOracle::new(), StaticRetrieval::new(Vec::new()));
	let response = app
		.oneshot(
			Request::builder()
				.uri("/health")
				.body(Body::empty())
				.expect("Failed to build request."),
		)
		.await
		.expect("Failed to call /health.");

	assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn blank_search_is_a_bad_request() {
	let app = app(ScriptedOracle::new(), StaticRetrieval::new(Vec::new()));
	let response = app
		.oneshot(post("/v1/query/search", json!({ "query": "  " })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::BAD_REQUEST);

	let body = json_body(response).await;

	assert_eq!(body["error_code"], "invalid_request");
}

#[tokio::test]
async fn retrieval_outage_is_a_bad_gateway() {
	let oracle = ScriptedOracle::new().with_draft(json!({ "search_input": "pipeta" }));
	let app = app(oracle, StaticRetrieval::failing("backend down"));
	let response = app
		.oneshot(post("/v1/query/search", json!({ "query": "pipeta" })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
	assert_eq!(json_body(response).await["error_code"], "retrieval_failed");
}

#[tokio::test]
async fn search_returns_ranked_items() {
	let oracle = ScriptedOracle::new().with_draft(json!({ "search_input": "Power Gold" }));
	let hits = vec![
		vetq_testkit::hit("gold-4-10", "Power Gold 4-10kg").semantic(0.7).keyword(1.0).build(),
	];
	let app = app(oracle, StaticRetrieval::new(hits));
	let response = app
		.oneshot(post("/v1/query/search", json!({ "query": "power gold", "top_k": 4 })))
		.await
		.expect("Failed to call search.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;

	assert_eq!(body["intent"], "SEARCH");
	assert_eq!(body["filter_source"], "oracle");
	assert_eq!(body["items"][0]["id"], "gold-4-10");
	assert_eq!(body["summary"]["query"], "power gold");
}

#[tokio::test]
async fn analyze_returns_the_intent() {
	let app = app(ScriptedOracle::new(), StaticRetrieval::new(Vec::new()));
	let response = app
		.oneshot(post("/v1/query/analyze", json!({ "query": "pipeta nexgard spectra" })))
		.await
		.expect("Failed to call analyze.");

	assert_eq!(response.status(), StatusCode::OK);

	let body = json_body(response).await;
	let entities = body["entities"].as_array().expect("Entities must be an array.");

	assert!(entities.iter().any(|span| span["value"] == "NEXGARD SPECTRA"));
}
