use std::{
	collections::HashMap,
	future,
	sync::{Mutex, MutexGuard},
};

use uuid::Uuid;

use pantry_storage::{
	BoxFuture, Error, InventoryStore, JobStore, Result,
	models::{IngestionJob, JobTransition, PantryItem, PantryUpsert, StagedItem},
};

#[derive(Default)]
struct State {
	pantry: Vec<PantryItem>,
	jobs: HashMap<Uuid, IngestionJob>,
	staged: Vec<StagedItem>,
	upserts: usize,
	fail_upserts_after: Option<usize>,
	fail_staged_inserts: bool,
}

/// In-process stand-in for the Postgres stores.
///
/// Mirrors the constraints the schema enforces: one pantry row per ingredient, staged items must
/// reference an existing job, and job transitions only apply while the job has the expected
/// status.
#[derive(Default)]
pub struct MemoryStore {
	state: Mutex<State>,
}
impl MemoryStore {
	pub fn new() -> Self {
		Self::default()
	}

	/// Lets the first `n` pantry upserts succeed and fails every later one.
	pub fn with_failing_upserts_after(self, n: usize) -> Self {
		self.lock().fail_upserts_after = Some(n);

		self
	}

	pub fn with_failing_staged_inserts(self) -> Self {
		self.lock().fail_staged_inserts = true;

		self
	}

	/// Upsert attempts seen so far, failed ones included.
	pub fn upsert_attempts(&self) -> usize {
		self.lock().upserts
	}

	/// Seeds a job directly, bypassing the service.
	pub fn put_job(&self, job: IngestionJob) {
		self.lock().jobs.insert(job.job_id, job);
	}

	pub fn put_staged_item(&self, item: StagedItem) {
		self.lock().staged.push(item);
	}

	fn lock(&self) -> MutexGuard<'_, State> {
		self.state.lock().unwrap_or_else(|err| err.into_inner())
	}
}

impl InventoryStore for MemoryStore {
	fn upsert_pantry_item<'a>(&'a self, upsert: &'a PantryUpsert) -> BoxFuture<'a, Result<PantryItem>> {
		let result = upsert_locked(&mut self.lock(), upsert);

		Box::pin(future::ready(result))
	}

	fn delete_pantry_item(&self, item_id: Uuid) -> BoxFuture<'_, Result<()>> {
		let mut state = self.lock();
		let before = state.pantry.len();

		state.pantry.retain(|item| item.item_id != item_id);

		let result = if state.pantry.len() == before {
			Err(Error::NotFound(format!("Pantry item {item_id}.")))
		} else {
			Ok(())
		};

		Box::pin(future::ready(result))
	}

	fn delete_all_pantry_items(&self) -> BoxFuture<'_, Result<u64>> {
		let mut state = self.lock();
		let removed = state.pantry.len() as u64;

		state.pantry.clear();

		Box::pin(future::ready(Ok(removed)))
	}

	fn list_pantry_items(&self) -> BoxFuture<'_, Result<Vec<PantryItem>>> {
		let mut items = self.lock().pantry.clone();

		items.sort_by(|a, b| a.added_at.cmp(&b.added_at).then(a.item_id.cmp(&b.item_id)));

		Box::pin(future::ready(Ok(items)))
	}
}

impl JobStore for MemoryStore {
	fn insert_job<'a>(&'a self, job: &'a IngestionJob) -> BoxFuture<'a, Result<()>> {
		let mut state = self.lock();
		let result = if state.jobs.contains_key(&job.job_id) {
			Err(Error::Conflict(format!("Job {} already exists.", job.job_id)))
		} else {
			state.jobs.insert(job.job_id, job.clone());

			Ok(())
		};

		Box::pin(future::ready(result))
	}

	fn get_job(&self, job_id: Uuid) -> BoxFuture<'_, Result<Option<IngestionJob>>> {
		let job = self.lock().jobs.get(&job_id).cloned();

		Box::pin(future::ready(Ok(job)))
	}

	fn transition_job<'a>(
		&'a self,
		transition: &'a JobTransition,
	) -> BoxFuture<'a, Result<Option<IngestionJob>>> {
		let mut state = self.lock();
		let job = match state.jobs.get_mut(&transition.job_id) {
			Some(job) if job.status == transition.from => {
				job.status = transition.to.to_string();
				job.error = transition.error.clone();
				job.updated_at = transition.at;

				Some(job.clone())
			},
			_ => None,
		};

		Box::pin(future::ready(Ok(job)))
	}

	fn insert_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<()>> {
		let mut state = self.lock();
		let result = if state.fail_staged_inserts {
			Err(injected_failure("staged item insert"))
		} else if !state.jobs.contains_key(&item.job_id) {
			Err(Error::InvalidArgument(format!("Job {} does not exist.", item.job_id)))
		} else {
			state.staged.push(item.clone());

			Ok(())
		};

		Box::pin(future::ready(result))
	}

	fn list_staged_items(&self, job_id: Uuid) -> BoxFuture<'_, Result<Vec<StagedItem>>> {
		let mut items = self
			.lock()
			.staged
			.iter()
			.filter(|item| item.job_id == job_id)
			.cloned()
			.collect::<Vec<_>>();

		items.sort_by(|a, b| {
			a.raw_text.cmp(&b.raw_text).then(a.staged_item_id.cmp(&b.staged_item_id))
		});

		Box::pin(future::ready(Ok(items)))
	}

	fn update_staged_item<'a>(&'a self, item: &'a StagedItem) -> BoxFuture<'a, Result<StagedItem>> {
		let mut state = self.lock();
		let result = state
			.staged
			.iter_mut()
			.find(|row| row.staged_item_id == item.staged_item_id && row.job_id == item.job_id)
			.map(|row| {
				row.ingredient_id = item.ingredient_id;
				row.quantity = item.quantity;
				row.unit = item.unit.clone();
				row.needs_review = item.needs_review;
				row.updated_at = item.updated_at;

				row.clone()
			})
			.ok_or_else(|| Error::NotFound(format!("Staged item {}.", item.staged_item_id)));

		Box::pin(future::ready(result))
	}
}

fn upsert_locked(state: &mut State, upsert: &PantryUpsert) -> Result<PantryItem> {
	state.upserts += 1;

	if let Some(limit) = state.fail_upserts_after
		&& state.upserts > limit
	{
		return Err(injected_failure("pantry upsert"));
	}
	if let Some(row) = state.pantry.iter_mut().find(|row| row.ingredient_id == upsert.ingredient_id)
	{
		row.quantity = upsert.quantity;
		row.unit = upsert.unit.clone();
		row.expires_at = upsert.expires_at;
		row.updated_at = upsert.now;

		return Ok(row.clone());
	}

	let row = PantryItem {
		item_id: upsert.item_id,
		ingredient_id: upsert.ingredient_id,
		quantity: upsert.quantity,
		unit: upsert.unit.clone(),
		expires_at: upsert.expires_at,
		added_at: upsert.now,
		updated_at: upsert.now,
	};

	state.pantry.push(row.clone());

	Ok(row)
}

fn injected_failure(operation: &str) -> Error {
	Error::Sqlx(sqlx::Error::Protocol(format!("Injected {operation} failure.")))
}
