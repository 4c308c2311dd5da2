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

mod file;
mod memory;

use std::collections::VecDeque;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::types::{BackorderEntry, PendingBackorder};
pub use file::FileBackorderStore;
use hemolink_sdk::{BloodCategory, SequenceNumber};
pub use memory::MemoryBackorderStore;

/// Error types for backorder store operations
#[derive(Debug, Error)]
pub enum StoreError {
	#[error("Duplicate request already queued as sequence {0}")]
	Duplicate(SequenceNumber),
	#[error("Failed to load queue state: {0}")]
	Load(String),
	#[error("Failed to persist queue state: {0}")]
	Persist(String),
}

/// Backorder Queue Store trait - one durable FIFO per blood category
///
/// Entries keep insertion order per category; categories are fully
/// independent and may be mutated concurrently. All mutations of a single
/// category's queue are serialized relative to each other, which preserves
/// both FIFO order and the dedup invariant.
///
/// Entries are addressed by their per-category sequence id. The sweeper
/// processes queues strictly in FIFO order, so removing the head sequence
/// is exactly a pop-front; survivors keep their relative order either way.
pub trait BackorderStore: Send + Sync {
	/// Append a backorder, assigning the next per-category sequence id
	///
	/// Dedup rule: when an existing entry of the same category matches the
	/// pending one on (units, expire-after-days, reason, eligible set), the
	/// append is rejected with [`StoreError::Duplicate`] carrying the
	/// sequence id of the entry already queued. No mutation happens in that
	/// case.
	fn append(
		&self,
		category: BloodCategory,
		pending: PendingBackorder,
	) -> Result<SequenceNumber, StoreError>;

	/// Read-only snapshot of a category's queue in FIFO order
	fn scan_all(&self, category: BloodCategory) -> Result<Vec<BackorderEntry>, StoreError>;

	/// Remove an entry; returns false when the sequence id is not queued
	fn remove(&self, category: BloodCategory, seq: SequenceNumber) -> Result<bool, StoreError>;

	/// Reduce an entry's remaining units in place, keeping its queue slot
	fn update_remaining(
		&self,
		category: BloodCategory,
		seq: SequenceNumber,
		remaining: u32,
	) -> Result<bool, StoreError>;

	/// Number of entries queued for a category
	fn len(&self, category: BloodCategory) -> usize;
}

/// One category's queue state, shared by the store implementations
///
/// `next_seq` only ever grows; sequence ids are never reused even after
/// entries are removed.
#[derive(Debug, Default, Serialize, Deserialize)]
pub(crate) struct CategoryQueue {
	entries: VecDeque<BackorderEntry>,
	next_seq: SequenceNumber,
}

impl CategoryQueue {
	pub(crate) fn append(
		&mut self,
		category: BloodCategory,
		pending: PendingBackorder,
	) -> Result<SequenceNumber, StoreError> {
		if let Some(existing) = self
			.entries
			.iter()
			.find(|entry| entry.matches_pending(&pending))
		{
			return Err(StoreError::Duplicate(existing.sequence));
		}

		self.next_seq += 1;
		let seq = self.next_seq;
		self.entries.push_back(pending.into_entry(seq, category));
		Ok(seq)
	}

	pub(crate) fn remove(&mut self, seq: SequenceNumber) -> bool {
		match self.entries.iter().position(|entry| entry.sequence == seq) {
			Some(position) => {
				self.entries.remove(position);
				true
			}
			None => false,
		}
	}

	pub(crate) fn update_remaining(&mut self, seq: SequenceNumber, remaining: u32) -> bool {
		match self
			.entries
			.iter_mut()
			.find(|entry| entry.sequence == seq)
		{
			Some(entry) => {
				entry.units = remaining;
				true
			}
			None => false,
		}
	}

	pub(crate) fn snapshot(&self) -> Vec<BackorderEntry> {
		self.entries.iter().cloned().collect()
	}

	pub(crate) fn len(&self) -> usize {
		self.entries.len()
	}
}

/// Queue slot for a category inside the fixed 8-queue array
pub(crate) fn queue_slot(category: BloodCategory) -> usize {
	usize::from(category.id()) - 1
}
