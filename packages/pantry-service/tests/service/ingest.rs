use std::time::Duration;

use uuid::Uuid;

use pantry_config::Ingest;
use pantry_domain::{JobStatus, staging::ItemOverride};
use pantry_service::{Error, JobView, OverrideItem, StagedItemView, SubmitRequest};
use pantry_testkit::MemoryStore;

use super::{
	CHICKEN_ID, FLOUR_ID, Harness, Latency, RICE_ID, RecordingPublisher, StubExtractor,
	StubResolver, candidate, flour_and_chicken, harness,
};

fn text(content: &str) -> SubmitRequest {
	SubmitRequest { kind: None, content: content.to_string() }
}

async fn submit_and_process(harness: &Harness, content: &str) -> JobView {
	let submitted = harness.service.submit(text(content)).await.expect("Failed to submit job.");

	assert_eq!(submitted.job.status, JobStatus::Pending);

	submitted.processing.await.expect("Processing task panicked.");

	harness.service.get_job(submitted.job.job_id).await.expect("Failed to fetch job.")
}

fn item<'a>(job: &'a JobView, raw_text: &str) -> &'a StagedItemView {
	job.items
		.iter()
		.find(|item| item.raw_text == raw_text)
		.unwrap_or_else(|| panic!("Missing staged item {raw_text:?}."))
}

fn override_for(staged_item_id: Uuid, values: ItemOverride) -> OverrideItem {
	OverrideItem { staged_item_id, values }
}

#[tokio::test]
async fn flour_and_chicken_are_staged_then_committed() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;

	assert_eq!(job.status, JobStatus::Staged);
	assert_eq!(job.items.len(), 2);
	// Listed by raw text, not extraction order.
	assert_eq!(job.items[0].raw_text, "1 lb chicken breast");
	assert_eq!(job.items[1].raw_text, "2 cups flour");
	assert!(job.items.iter().all(|item| !item.needs_review));
	assert_eq!(harness.store.upsert_attempts(), 0);

	let confirmed =
		harness.service.confirm_job(job.job_id, Vec::new()).await.expect("Confirm should succeed.");

	assert_eq!(confirmed.status, JobStatus::Confirmed);
	assert_eq!(confirmed.item_ids.len(), 2);
	assert!(confirmed.skipped.is_empty());

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");
	let flour = pantry
		.items
		.iter()
		.find(|item| item.ingredient_id == FLOUR_ID)
		.expect("Flour should be in the pantry.");
	let chicken = pantry
		.items
		.iter()
		.find(|item| item.ingredient_id == CHICKEN_ID)
		.expect("Chicken should be in the pantry.");

	assert_eq!((flour.quantity, flour.unit.as_str()), (2.0, "cup"));
	assert_eq!((chicken.quantity, chicken.unit.as_str()), (1.0, "lb"));
	assert!(flour.expires_at.is_none());
	assert_eq!(harness.publisher.batches(), vec![confirmed.item_ids.clone()]);

	let job = harness.service.get_job(job.job_id).await.expect("Failed to fetch job.");

	assert_eq!(job.status, JobStatus::Confirmed);
}

#[tokio::test]
async fn unresolved_cilantro_is_staged_for_review() {
	let extractor =
		StubExtractor::Items(vec![candidate("1 bunch cilantro", "cilantro", 1.0, "bunch", 0.9)]);
	let harness = harness(extractor).build();
	let job = submit_and_process(&harness, "1 bunch cilantro").await;

	assert_eq!(job.status, JobStatus::Staged);
	assert_eq!(job.items.len(), 1);
	assert_eq!(job.items[0].ingredient_id, None);
	assert!(job.items[0].needs_review);
	assert_eq!(job.items[0].confidence, 0.9);
	assert_eq!(harness.resolver.calls(), 1);
}

#[tokio::test]
async fn review_flag_follows_threshold() {
	let extractor = StubExtractor::Items(vec![
		candidate("a pinch of rice", "rice", 1.0, "pinch", 0.69),
		candidate("flour, probably", "flour", 1.0, "cup", 0.7),
	]);
	let harness = harness(extractor).build();
	let job = submit_and_process(&harness, "a pinch of rice, flour, probably").await;
	let rice = item(&job, "a pinch of rice");
	let flour = item(&job, "flour, probably");

	assert_eq!(rice.ingredient_id, Some(RICE_ID));
	assert!(rice.needs_review);
	assert!(!flour.needs_review);
}

#[tokio::test]
async fn configured_threshold_is_used() {
	let extractor = StubExtractor::Items(vec![candidate("2 cups flour", "flour", 2.0, "cup", 0.8)]);
	let ingest = Ingest { review_threshold: 0.9, ..Ingest::default() };
	let harness = harness(extractor).ingest(ingest).build();
	let job = submit_and_process(&harness, "2 cups flour").await;

	assert!(job.items[0].needs_review);
}

#[tokio::test]
async fn malformed_candidate_values_are_repaired_and_flagged() {
	let extractor = StubExtractor::Items(vec![
		candidate("-2 cups flour", "flour", -2.0, "cup", 0.95),
		candidate("some rice", "rice", 1.0, "  ", 1.7),
	]);
	let harness = harness(extractor).build();
	let job = submit_and_process(&harness, "-2 cups flour, some rice").await;
	let flour = item(&job, "-2 cups flour");
	let rice = item(&job, "some rice");

	assert_eq!(flour.quantity, 0.0);
	assert!(flour.needs_review);
	assert_eq!(rice.unit, "piece");
	assert_eq!(rice.confidence, 1.0);
	assert!(!rice.needs_review);
}

#[tokio::test]
async fn confirm_rejects_pending_job() {
	let harness = harness(flour_and_chicken()).build();
	let job = harness.service.create_job(text("2 cups flour")).await.expect("Failed to create job.");
	let err = harness
		.service
		.confirm_job(job.job_id, Vec::new())
		.await
		.expect_err("Confirm on a pending job should fail.");
	let message = match err {
		Error::InvalidState { message } => message,
		other => panic!("Expected InvalidState, got {other:?}."),
	};

	assert!(message.contains("staged"));
	assert!(message.contains("pending"));
}

#[tokio::test]
async fn confirm_is_not_idempotent() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;

	harness
		.service
		.confirm_job(job.job_id, Vec::new())
		.await
		.expect("First confirm should succeed.");

	let err = harness
		.service
		.confirm_job(job.job_id, Vec::new())
		.await
		.expect_err("Second confirm should fail.");

	assert!(matches!(err, Error::InvalidState { ref message } if message.contains("confirmed")));
}

#[tokio::test]
async fn confirm_unknown_job_is_not_found() {
	let harness = harness(flour_and_chicken()).build();
	let result = harness.service.confirm_job(Uuid::new_v4(), Vec::new()).await;

	assert!(matches!(result, Err(Error::NotFound { .. })));
	assert!(matches!(harness.service.get_job(Uuid::new_v4()).await, Err(Error::NotFound { .. })));
}

#[tokio::test]
async fn unresolved_item_without_override_is_skipped() {
	let extractor = StubExtractor::Items(vec![
		candidate("2 cups flour", "flour", 2.0, "cup", 0.95),
		candidate("1 bunch cilantro", "cilantro", 1.0, "bunch", 0.9),
	]);
	let harness = harness(extractor).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 bunch cilantro").await;
	let cilantro = item(&job, "1 bunch cilantro");
	let confirmed =
		harness.service.confirm_job(job.job_id, Vec::new()).await.expect("Confirm should succeed.");

	assert_eq!(confirmed.status, JobStatus::Confirmed);
	assert_eq!(confirmed.item_ids.len(), 1);
	assert_eq!(confirmed.skipped, vec![cilantro.staged_item_id]);

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");

	assert_eq!(pantry.items.len(), 1);
	assert_eq!(pantry.items[0].ingredient_id, FLOUR_ID);
}

#[tokio::test]
async fn override_can_supply_missing_ingredient() {
	let extractor =
		StubExtractor::Items(vec![candidate("1 bunch cilantro", "cilantro", 1.0, "bunch", 0.9)]);
	let harness = harness(extractor).build();
	let job = submit_and_process(&harness, "1 bunch cilantro").await;
	let cilantro_id = Uuid::new_v4();
	let overrides = vec![override_for(
		job.items[0].staged_item_id,
		ItemOverride { ingredient_id: Some(cilantro_id), ..ItemOverride::default() },
	)];
	let confirmed =
		harness.service.confirm_job(job.job_id, overrides).await.expect("Confirm should succeed.");
	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");

	assert!(confirmed.skipped.is_empty());
	assert_eq!(pantry.items[0].ingredient_id, cilantro_id);
	assert_eq!((pantry.items[0].quantity, pantry.items[0].unit.as_str()), (1.0, "bunch"));
}

#[tokio::test]
async fn quantity_only_override_keeps_unit_and_ingredient() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let flour = item(&job, "2 cups flour");
	let overrides = vec![override_for(
		flour.staged_item_id,
		ItemOverride { quantity: Some(3.5), ..ItemOverride::default() },
	)];

	harness.service.confirm_job(job.job_id, overrides).await.expect("Confirm should succeed.");

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");
	let flour = pantry
		.items
		.iter()
		.find(|item| item.ingredient_id == FLOUR_ID)
		.expect("Flour should be in the pantry.");

	assert_eq!((flour.quantity, flour.unit.as_str()), (3.5, "cup"));
}

#[tokio::test]
async fn overrides_parse_from_json_with_nulls() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let chicken = item(&job, "1 lb chicken breast");
	let overrides: Vec<OverrideItem> = serde_json::from_value(serde_json::json!([
		{ "staged_item_id": chicken.staged_item_id, "ingredient_id": null, "unit": "kg" }
	]))
	.expect("Failed to parse overrides.");

	harness.service.confirm_job(job.job_id, overrides).await.expect("Confirm should succeed.");

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");
	let chicken = pantry
		.items
		.iter()
		.find(|item| item.ingredient_id == CHICKEN_ID)
		.expect("Chicken should be in the pantry.");

	assert_eq!((chicken.quantity, chicken.unit.as_str()), (1.0, "kg"));
}

#[tokio::test]
async fn invalid_overrides_write_nothing() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let first = job.items[0].staged_item_id;
	let second = job.items[1].staged_item_id;
	let cases = vec![
		vec![override_for(Uuid::new_v4(), ItemOverride::default())],
		vec![
			override_for(first, ItemOverride::default()),
			override_for(first, ItemOverride { quantity: Some(1.0), ..ItemOverride::default() }),
		],
		vec![
			override_for(first, ItemOverride::default()),
			override_for(second, ItemOverride { quantity: Some(-1.0), ..ItemOverride::default() }),
		],
		vec![override_for(
			second,
			ItemOverride { unit: Some(" ".to_string()), ..ItemOverride::default() },
		)],
	];

	for overrides in cases {
		let result = harness.service.confirm_job(job.job_id, overrides).await;

		assert!(matches!(result, Err(Error::InvalidRequest { .. })), "Unexpected {result:?}.");
	}

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");
	let job = harness.service.get_job(job.job_id).await.expect("Failed to fetch job.");

	assert!(pantry.items.is_empty());
	assert_eq!(harness.store.upsert_attempts(), 0);
	assert_eq!(job.status, JobStatus::Staged);
}

#[tokio::test]
async fn extraction_failure_fails_the_job() {
	let harness = harness(StubExtractor::Fail).build();
	let job = submit_and_process(&harness, "2 cups flour").await;

	assert_eq!(job.status, JobStatus::Failed);
	assert!(job.items.is_empty());
	assert!(job.error.as_deref().is_some_and(|error| error.contains("503")));
	assert_eq!(harness.resolver.calls(), 0);
}

#[tokio::test]
async fn extraction_timeout_fails_the_job() {
	let ingest = Ingest { extract_timeout_ms: 20, ..Ingest::default() };
	let harness = harness(StubExtractor::Hang).ingest(ingest).build();
	let job = submit_and_process(&harness, "2 cups flour").await;

	assert_eq!(job.status, JobStatus::Failed);
	assert!(job.error.as_deref().is_some_and(|error| error.contains("timed out")));
}

#[tokio::test]
async fn resolver_timeout_leaves_items_unresolved_for_review() {
	let ingest = Ingest { resolve_timeout_ms: 20, ..Ingest::default() };
	let resolver = StubResolver::pantry_staples().with_latency(Latency::Hang);
	let harness = harness(flour_and_chicken()).resolver(resolver).ingest(ingest).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;

	assert_eq!(job.status, JobStatus::Staged);
	assert_eq!(job.items.len(), 2);
	assert!(job.items.iter().all(|item| item.ingredient_id.is_none() && item.needs_review));
	assert_eq!(harness.resolver.calls(), 2);
}

#[tokio::test]
async fn total_budget_fails_the_job_and_keeps_staged_items() {
	let ingest = Ingest { process_timeout_ms: 250, ..Ingest::default() };
	let resolver =
		StubResolver::pantry_staples().with_latency(Latency::Delay(Duration::from_millis(100)));
	let extractor = StubExtractor::Items(vec![
		candidate("2 cups flour", "flour", 2.0, "cup", 0.95),
		candidate("1 lb chicken breast", "chicken breast", 1.0, "lb", 0.9),
		candidate("1 kg rice", "rice", 1.0, "kg", 0.9),
	]);
	let harness = harness(extractor).resolver(resolver).ingest(ingest).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast, 1 kg rice").await;

	assert_eq!(job.status, JobStatus::Failed);
	assert!(job.error.as_deref().is_some_and(|error| error.contains("Processing timed out")));
	assert!((1..3).contains(&job.items.len()), "Unexpected staged items {:?}.", job.items);
	assert_eq!(harness.store.upsert_attempts(), 0);
}

#[tokio::test]
async fn staged_insert_failure_fails_the_job() {
	let harness =
		harness(flour_and_chicken()).store(MemoryStore::new().with_failing_staged_inserts()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;

	assert_eq!(job.status, JobStatus::Failed);
	assert!(job.items.is_empty());
	assert!(job.error.is_some());
}

#[tokio::test]
async fn failed_upsert_stops_confirm_and_keeps_earlier_writes() {
	let harness =
		harness(flour_and_chicken()).store(MemoryStore::new().with_failing_upserts_after(1)).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let result = harness.service.confirm_job(job.job_id, Vec::new()).await;

	assert!(matches!(result, Err(Error::Storage { .. })));

	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");
	let job = harness.service.get_job(job.job_id).await.expect("Failed to fetch job.");

	assert_eq!(pantry.items.len(), 1);
	assert_eq!(job.status, JobStatus::Staged);
	assert_eq!(harness.publisher.batches(), vec![vec![pantry.items[0].item_id]]);
}

#[tokio::test]
async fn publish_failure_does_not_fail_confirm() {
	let harness = harness(flour_and_chicken()).publisher(RecordingPublisher::failing()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let confirmed =
		harness.service.confirm_job(job.job_id, Vec::new()).await.expect("Confirm should succeed.");

	assert_eq!(confirmed.status, JobStatus::Confirmed);
	assert_eq!(harness.publisher.batches().len(), 1);
}

#[tokio::test]
async fn job_creation_validates_input() {
	let harness = harness(flour_and_chicken()).build();
	let blank = harness.service.create_job(text("   ")).await;
	let unknown_kind = harness
		.service
		.create_job(SubmitRequest {
			kind: Some("receipt_image".to_string()),
			content: "x".to_string(),
		})
		.await;
	let external = harness
		.service
		.create_job(SubmitRequest {
			kind: Some("external_channel".to_string()),
			content: "2 cups flour".to_string(),
		})
		.await
		.expect("External channel jobs should be accepted.");

	assert!(matches!(blank, Err(Error::InvalidRequest { .. })));
	assert!(matches!(unknown_kind, Err(Error::InvalidRequest { .. })));
	assert_eq!(external.kind, "external_channel");
	assert_eq!(external.status, "pending");
}

#[tokio::test]
async fn editing_a_staged_item_marks_it_reviewed() {
	let extractor =
		StubExtractor::Items(vec![candidate("1 bunch cilantro", "cilantro", 1.0, "bunch", 0.9)]);
	let harness = harness(extractor).resolver(StubResolver::new(&[])).build();
	let job = submit_and_process(&harness, "1 bunch cilantro").await;
	let staged_item_id = job.items[0].staged_item_id;
	let quantity_only = harness
		.service
		.update_staged_item(
			job.job_id,
			staged_item_id,
			ItemOverride { quantity: Some(2.0), ..ItemOverride::default() },
		)
		.await
		.expect("Edit should succeed.");

	assert_eq!(quantity_only.quantity, 2.0);
	assert!(quantity_only.needs_review);

	let cilantro_id = Uuid::new_v4();
	let resolved = harness
		.service
		.update_staged_item(
			job.job_id,
			staged_item_id,
			ItemOverride { ingredient_id: Some(cilantro_id), ..ItemOverride::default() },
		)
		.await
		.expect("Edit should succeed.");

	assert_eq!(resolved.ingredient_id, Some(cilantro_id));
	assert_eq!(resolved.quantity, 2.0);
	assert!(!resolved.needs_review);

	let confirmed =
		harness.service.confirm_job(job.job_id, Vec::new()).await.expect("Confirm should succeed.");

	assert_eq!(confirmed.item_ids.len(), 1);
}

#[tokio::test]
async fn edits_require_a_staged_job_and_a_matching_item() {
	let harness = harness(flour_and_chicken()).build();
	let job = submit_and_process(&harness, "2 cups flour, 1 lb chicken breast").await;
	let staged_item_id = job.items[0].staged_item_id;
	let unknown_item = harness
		.service
		.update_staged_item(job.job_id, Uuid::new_v4(), ItemOverride::default())
		.await;
	let invalid = harness
		.service
		.update_staged_item(
			job.job_id,
			staged_item_id,
			ItemOverride { quantity: Some(f64::NAN), ..ItemOverride::default() },
		)
		.await;

	assert!(matches!(unknown_item, Err(Error::NotFound { .. })));
	assert!(matches!(invalid, Err(Error::InvalidRequest { .. })));

	harness.service.confirm_job(job.job_id, Vec::new()).await.expect("Confirm should succeed.");

	let after_confirm = harness
		.service
		.update_staged_item(job.job_id, staged_item_id, ItemOverride::default())
		.await;

	assert!(matches!(
		after_confirm,
		Err(Error::InvalidState { ref message }) if message.contains("must be staged to edit")
	));
}
