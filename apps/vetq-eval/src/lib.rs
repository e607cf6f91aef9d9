use std::{
	collections::BTreeSet,
	fs,
	path::{Path, PathBuf},
	time::Instant,
};

use clap::Parser;
use color_eyre::eyre;
use serde::{Deserialize, Serialize};
use tracing_subscriber::EnvFilter;

use vetq_domain::{EntityType, Intent, normalize};
use vetq_service::{AnalyzeRequest, QueryService};

#[derive(Debug, Parser)]
#[command(
	version = vetq_cli::VERSION,
	rename_all = "kebab",
	styles = vetq_cli::styles(),
)]
pub struct Args {
	#[arg(long, short = 'c', value_name = "FILE")]
	pub config: PathBuf,
	#[arg(long, short = 'd', value_name = "FILE")]
	pub dataset: PathBuf,
}

#[derive(Debug, Deserialize)]
pub struct EvalDataset {
	pub name: Option<String>,
	pub queries: Vec<EvalQuery>,
}

#[derive(Debug, Deserialize)]
pub struct EvalQuery {
	pub id: Option<String>,
	pub query: String,
	pub expect_intent: Option<Intent>,
	#[serde(default)]
	pub expect_types: Vec<String>,
	#[serde(default)]
	pub expect_values: Vec<String>,
	#[serde(default)]
	pub forbid_types: Vec<String>,
}

#[derive(Debug, Serialize)]
pub struct EvalOutput {
	pub dataset: EvalDatasetInfo,
	pub summary: EvalSummary,
	pub queries: Vec<QueryReport>,
}

#[derive(Debug, Serialize)]
pub struct EvalDatasetInfo {
	pub name: String,
	pub query_count: usize,
}

#[derive(Debug, Serialize)]
pub struct EvalSummary {
	pub passed: usize,
	pub pass_rate: f64,
	/// Share of expected types and values that were found, over the whole dataset.
	pub expectation_recall: f64,
	pub latency_ms_p50: f64,
	pub latency_ms_p95: f64,
}

#[derive(Debug, Serialize)]
pub struct QueryReport {
	pub id: String,
	pub query: String,
	pub intent: Intent,
	#[serde(skip_serializing_if = "Option::is_none")]
	pub intent_matched: Option<bool>,
	pub entities: Vec<String>,
	pub found: Vec<String>,
	pub missing: Vec<String>,
	pub forbidden: Vec<String>,
	pub passed: bool,
	pub latency_ms: f64,
}

pub fn run(args: Args) -> color_eyre::Result<()> {
	let config = vetq_config::load(&args.config)?;
	let filter = EnvFilter::new(config.service.log_level.clone());

	tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();

	let dataset = load_dataset(&args.dataset)?;
	let service = QueryService::new(config);
	let output = evaluate(&service, &dataset)?;
	let json = serde_json::to_string_pretty(&output)?;

	println!("{json}");

	Ok(())
}

pub fn load_dataset(path: &Path) -> color_eyre::Result<EvalDataset> {
	let raw = fs::read_to_string(path)?;
	let dataset: EvalDataset = serde_json::from_str(&raw)?;

	if dataset.queries.is_empty() {
		return Err(eyre::eyre!("Dataset must include at least one query."));
	}

	Ok(dataset)
}

pub fn evaluate(service: &QueryService, dataset: &EvalDataset) -> color_eyre::Result<EvalOutput> {
	let mut queries = Vec::with_capacity(dataset.queries.len());
	let mut expected_total = 0;
	let mut found_total = 0;

	for (idx, item) in dataset.queries.iter().enumerate() {
		let report = eval_query(service, idx, item)?;

		expected_total += report.found.len() + report.missing.len();
		found_total += report.found.len();

		queries.push(report);
	}

	let passed = queries.iter().filter(|report| report.passed).count();
	let mut latencies: Vec<f64> = queries.iter().map(|report| report.latency_ms).collect();

	latencies.sort_by(f64::total_cmp);

	let summary = EvalSummary {
		passed,
		pass_rate: ratio(passed, queries.len()),
		expectation_recall: if expected_total == 0 {
			1.0
		} else {
			ratio(found_total, expected_total)
		},
		latency_ms_p50: percentile(&latencies, 0.50),
		latency_ms_p95: percentile(&latencies, 0.95),
	};

	tracing::info!(
		queries = queries.len(),
		passed,
		pass_rate = summary.pass_rate,
		"Evaluation finished."
	);

	Ok(EvalOutput {
		dataset: EvalDatasetInfo {
			name: dataset.name.clone().unwrap_or_else(|| "unnamed".to_string()),
			query_count: queries.len(),
		},
		summary,
		queries,
	})
}

fn eval_query(
	service: &QueryService,
	idx: usize,
	item: &EvalQuery,
) -> color_eyre::Result<QueryReport> {
	let id = item.id.clone().unwrap_or_else(|| format!("q{}", idx + 1));
	let expect_types = parse_types(&id, &item.expect_types)?;
	let forbid_types = parse_types(&id, &item.forbid_types)?;
	let started = Instant::now();
	let intent = service.analyze(AnalyzeRequest { query: item.query.clone() })?;
	let latency_ms = started.elapsed().as_secs_f64() * 1_000.0;
	let found_types: BTreeSet<EntityType> =
		intent.entities.iter().map(|span| span.entity_type).collect();
	let found_values: BTreeSet<String> =
		intent.entities.iter().map(|span| normalize::normalize_text(&span.value)).collect();
	let mut found = Vec::new();
	let mut missing = Vec::new();

	for ty in &expect_types {
		let label = ty.as_str().to_string();

		if found_types.contains(ty) {
			found.push(label);
		} else {
			missing.push(label);
		}
	}
	for value in &item.expect_values {
		if found_values.contains(&normalize::normalize_text(value)) {
			found.push(value.clone());
		} else {
			missing.push(value.clone());
		}
	}

	let forbidden: Vec<String> = forbid_types
		.iter()
		.filter(|ty| found_types.contains(ty))
		.map(|ty| ty.as_str().to_string())
		.collect();
	let intent_matched = item.expect_intent.map(|expected| expected == intent.intent);
	let passed = missing.is_empty() && forbidden.is_empty() && intent_matched != Some(false);

	Ok(QueryReport {
		id,
		query: item.query.clone(),
		intent: intent.intent,
		intent_matched,
		entities: intent
			.entities
			.iter()
			.map(|span| format!("{}:{}", span.entity_type.as_str(), span.value))
			.collect(),
		found,
		missing,
		forbidden,
		passed,
		latency_ms,
	})
}

fn parse_types(id: &str, raw: &[String]) -> color_eyre::Result<Vec<EntityType>> {
	raw.iter()
		.map(|name| {
			EntityType::parse(name)
				.ok_or_else(|| eyre::eyre!("Query {id} names unknown entity type {name:?}."))
		})
		.collect()
}

fn ratio(part: usize, whole: usize) -> f64 {
	if whole == 0 { 0.0 } else { part as f64 / whole as f64 }
}

fn percentile(values: &[f64], percentile: f64) -> f64 {
	if values.is_empty() {
		return 0.0;
	}

	let clamped = percentile.clamp(0.0, 1.0);
	let pos = clamped * (values.len() as f64 - 1.0);
	let lower = pos.floor() as usize;
	let upper = pos.ceil() as usize;

	if lower == upper {
		values[lower]
	} else {
		let weight = pos - lower as f64;

		values[lower] * (1.0 - weight) + values[upper] * weight
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use vetq_testkit::{ScriptedOracle, StaticRetrieval};

	use super::*;

	fn service() -> QueryService {
		vetq_testkit::service(
			Arc::new(ScriptedOracle::new()),
			Arc::new(StaticRetrieval::new(Vec::new())),
		)
		.expect("Failed to build service.")
	}

	fn dataset(raw: &str) -> EvalDataset {
		serde_json::from_str(raw).expect("Failed to parse dataset.")
	}

	#[test]
	fn reports_found_missing_and_forbidden() {
		let dataset = dataset(
			r#"{
				"name": "smoke",
				"queries": [
					{
						"query": "pipeta nexgard spectra",
						"expect_intent": "SEARCH",
						"expect_types": ["PRODUCT"],
						"expect_values": ["Nexgard Spectra"],
						"forbid_types": ["BRAND"]
					},
					{
						"id": "miss",
						"query": "pipeta nexgard spectra",
						"expect_types": ["DRUG"],
						"forbid_types": ["PRODUCT"]
					}
				]
			}"#,
		);
		let output = evaluate(&service(), &dataset).expect("Failed to evaluate dataset.");
		let first = &output.queries[0];
		let second = &output.queries[1];

		assert_eq!(output.dataset.name, "smoke");
		assert_eq!(first.id, "q1");
		assert!(first.passed, "Unexpected report: {first:?}");
		assert_eq!(first.intent_matched, Some(true));
		assert_eq!(second.missing, vec!["DRUG".to_string()]);
		assert_eq!(second.forbidden, vec!["PRODUCT".to_string()]);
		assert!(!second.passed);
		assert_eq!(output.summary.passed, 1);
		assert_eq!(output.summary.pass_rate, 0.5);
	}

	#[test]
	fn unknown_entity_types_are_errors() {
		let dataset = dataset(r#"{ "queries": [{ "query": "pipeta", "expect_types": ["COLOR"] }] }"#);

		assert!(evaluate(&service(), &dataset).is_err());
	}

	#[test]
	fn percentile_interpolates() {
		assert_eq!(percentile(&[], 0.5), 0.0);
		assert_eq!(percentile(&[1.0, 3.0], 0.5), 2.0);
		assert_eq!(percentile(&[1.0, 2.0, 3.0], 1.0), 3.0);
	}
}
