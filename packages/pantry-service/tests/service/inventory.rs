use uuid::Uuid;

use pantry_service::{AddItemRequest, Error};

use super::{FLOUR_ID, RICE_ID, flour_and_chicken, harness};

fn add(
	ingredient_id: Option<Uuid>,
	name: Option<&str>,
	quantity: f64,
	unit: &str,
) -> AddItemRequest {
	AddItemRequest {
		name: name.map(str::to_string),
		ingredient_id: ingredient_id.map(|id| id.to_string()),
		quantity,
		unit: unit.to_string(),
		expires_at: None,
	}
}

#[tokio::test]
async fn repeated_adds_replace_the_same_row() {
	let harness = harness(flour_and_chicken()).build();
	let first =
		harness.service.add_item(add(Some(FLOUR_ID), None, 2.0, "cup")).await.expect("Add failed.");
	let second =
		harness.service.add_item(add(Some(FLOUR_ID), None, 500.0, "g")).await.expect("Add failed.");
	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");

	assert_eq!(pantry.items.len(), 1);
	assert_eq!(second.item_id, first.item_id);
	assert_eq!((pantry.items[0].quantity, pantry.items[0].unit.as_str()), (500.0, "g"));
	assert_eq!(harness.publisher.batches(), vec![vec![first.item_id], vec![first.item_id]]);
}

#[tokio::test]
async fn add_by_name_goes_through_the_resolver() {
	let harness = harness(flour_and_chicken()).build();
	let item =
		harness.service.add_item(add(None, Some(" rice "), 1.0, "kg")).await.expect("Add failed.");

	assert_eq!(item.ingredient_id, RICE_ID);
	assert_eq!(harness.resolver.calls(), 1);
}

#[tokio::test]
async fn ingredient_id_takes_precedence_over_name() {
	let harness = harness(flour_and_chicken()).build();
	let item = harness
		.service
		.add_item(add(Some(FLOUR_ID), Some("rice"), 1.0, "kg"))
		.await
		.expect("Add failed.");

	assert_eq!(item.ingredient_id, FLOUR_ID);
	assert_eq!(harness.resolver.calls(), 0);
}

#[tokio::test]
async fn blank_ingredient_id_falls_back_to_name() {
	let harness = harness(flour_and_chicken()).build();
	let mut req = add(None, Some("flour"), 2.0, "cup");

	req.ingredient_id = Some("  ".to_string());

	let item = harness.service.add_item(req).await.expect("Add failed.");

	assert_eq!(item.ingredient_id, FLOUR_ID);
	assert_eq!(harness.resolver.calls(), 1);
}

#[tokio::test]
async fn unresolvable_name_is_a_provider_error() {
	let harness = harness(flour_and_chicken()).build();
	let result = harness.service.add_item(add(None, Some("dragon fruit"), 1.0, "piece")).await;

	assert!(matches!(result, Err(Error::Provider { .. })));
	assert!(harness.publisher.batches().is_empty());
}

#[tokio::test]
async fn add_validates_before_writing() {
	let harness = harness(flour_and_chicken()).build();
	let mut bad_expiry = add(Some(FLOUR_ID), None, 1.0, "cup");

	bad_expiry.expires_at = Some("next tuesday".to_string());

	let mut bad_id = add(None, None, 1.0, "cup");

	bad_id.ingredient_id = Some("flour".to_string());

	let cases = vec![
		add(Some(FLOUR_ID), None, 0.0, "cup"),
		add(Some(FLOUR_ID), None, f64::INFINITY, "cup"),
		add(Some(FLOUR_ID), None, 1.0, "  "),
		add(None, None, 1.0, "cup"),
		add(None, Some(" "), 1.0, "cup"),
		bad_expiry,
		bad_id,
	];

	for req in cases {
		let result = harness.service.add_item(req).await;

		assert!(matches!(result, Err(Error::InvalidRequest { .. })), "Unexpected {result:?}.");
	}

	assert_eq!(harness.store.upsert_attempts(), 0);
	assert_eq!(harness.resolver.calls(), 0);
}

#[tokio::test]
async fn expiration_is_parsed_and_kept() {
	let harness = harness(flour_and_chicken()).build();
	let mut req = add(Some(FLOUR_ID), None, 1.0, "bag");

	req.expires_at = Some("2026-12-01T00:00:00Z".to_string());

	let item = harness.service.add_item(req).await.expect("Add failed.");
	let expires_at = item.expires_at.expect("Expiration should be stored.");

	assert_eq!(expires_at.unix_timestamp(), 1_796_083_200);
}

#[tokio::test]
async fn delete_removes_row_and_reports_missing_rows() {
	let harness = harness(flour_and_chicken()).build();
	let item =
		harness.service.add_item(add(Some(FLOUR_ID), None, 1.0, "cup")).await.expect("Add failed.");

	harness.service.delete_item(item.item_id).await.expect("Delete failed.");

	let again = harness.service.delete_item(item.item_id).await;
	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");

	assert!(matches!(again, Err(Error::NotFound { .. })));
	assert!(pantry.items.is_empty());
}

#[tokio::test]
async fn reset_clears_everything_and_publishes_an_empty_batch() {
	let harness = harness(flour_and_chicken()).build();

	for ingredient_id in [FLOUR_ID, RICE_ID] {
		harness
			.service
			.add_item(add(Some(ingredient_id), None, 1.0, "cup"))
			.await
			.expect("Add failed.");
	}

	let removed = harness.service.reset().await.expect("Reset failed.");
	let pantry = harness.service.list_items().await.expect("Failed to list pantry.");

	assert_eq!(removed, 2);
	assert!(pantry.items.is_empty());
	assert_eq!(harness.publisher.batches().last(), Some(&Vec::new()));
}
