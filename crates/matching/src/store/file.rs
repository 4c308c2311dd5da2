// Copyright 2025 itscheems
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

use std::{
	fs,
	path::{Path, PathBuf},
	sync::Mutex,
};

use tracing::info;

use super::{BackorderStore, CategoryQueue, StoreError, queue_slot};
use crate::types::{BackorderEntry, PendingBackorder};
use hemolink_sdk::{BloodCategory, SequenceNumber};

/// File-backed implementation of the Backorder Queue Store
///
/// One JSON file per category under a data directory, rewritten under the
/// category lock on every mutation and reloaded on open, so queues survive
/// process restarts. Write volume is a handful of entries per category,
/// which makes whole-file rewrites the simplest durable representation.
pub struct FileBackorderStore {
	dir: PathBuf,
	queues: [Mutex<CategoryQueue>; 8],
}

impl FileBackorderStore {
	/// Open the store, loading any queue state persisted earlier
	pub fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
		let dir = dir.as_ref().to_path_buf();
		fs::create_dir_all(&dir)
			.map_err(|e| StoreError::Load(format!("{}: {e}", dir.display())))?;

		let mut loaded = 0usize;
		let mut queues = Vec::with_capacity(BloodCategory::ALL.len());
		for category in BloodCategory::ALL {
			let path = queue_path(&dir, category);
			let queue = match fs::read(&path) {
				Ok(bytes) => {
					loaded += 1;
					serde_json::from_slice(&bytes)
						.map_err(|e| StoreError::Load(format!("{}: {e}", path.display())))?
				}
				Err(e) if e.kind() == std::io::ErrorKind::NotFound => CategoryQueue::default(),
				Err(e) => return Err(StoreError::Load(format!("{}: {e}", path.display()))),
			};
			queues.push(Mutex::new(queue));
		}
		let queues: [Mutex<CategoryQueue>; 8] = queues
			.try_into()
			.unwrap_or_else(|_| unreachable!("exactly 8 category queues"));

		info!(
			target: "backorder_store",
			dir = %dir.display(),
			loaded_files = loaded,
			"Backorder store opened"
		);

		Ok(Self { dir, queues })
	}

	fn queue(&self, category: BloodCategory) -> &Mutex<CategoryQueue> {
		&self.queues[queue_slot(category)]
	}

	/// Persist one category's queue; called with the category lock held
	fn persist(&self, category: BloodCategory, queue: &CategoryQueue) -> Result<(), StoreError> {
		let path = queue_path(&self.dir, category);
		let bytes = serde_json::to_vec_pretty(queue)
			.map_err(|e| StoreError::Persist(format!("{}: {e}", path.display())))?;
		fs::write(&path, bytes)
			.map_err(|e| StoreError::Persist(format!("{}: {e}", path.display())))
	}
}

fn queue_path(dir: &Path, category: BloodCategory) -> PathBuf {
	dir.join(format!("backorders-{}.json", category.id()))
}

impl BackorderStore for FileBackorderStore {
	fn append(
		&self,
		category: BloodCategory,
		pending: PendingBackorder,
	) -> Result<SequenceNumber, StoreError> {
		let mut queue = self.queue(category).lock().unwrap();
		let seq = queue.append(category, pending)?;
		self.persist(category, &queue)?;
		Ok(seq)
	}

	fn scan_all(&self, category: BloodCategory) -> Result<Vec<BackorderEntry>, StoreError> {
		Ok(self.queue(category).lock().unwrap().snapshot())
	}

	fn remove(&self, category: BloodCategory, seq: SequenceNumber) -> Result<bool, StoreError> {
		let mut queue = self.queue(category).lock().unwrap();
		let removed = queue.remove(seq);
		if removed {
			self.persist(category, &queue)?;
		}
		Ok(removed)
	}

	fn update_remaining(
		&self,
		category: BloodCategory,
		seq: SequenceNumber,
		remaining: u32,
	) -> Result<bool, StoreError> {
		let mut queue = self.queue(category).lock().unwrap();
		let updated = queue.update_remaining(seq, remaining);
		if updated {
			self.persist(category, &queue)?;
		}
		Ok(updated)
	}

	fn len(&self, category: BloodCategory) -> usize {
		self.queue(category).lock().unwrap().len()
	}
}
