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

use std::sync::Mutex;

use super::{BackorderStore, CategoryQueue, StoreError, queue_slot};
use crate::types::{BackorderEntry, PendingBackorder};
use hemolink_sdk::{BloodCategory, SequenceNumber};

/// In-memory implementation of the Backorder Queue Store
///
/// One mutex per category queue: mutations of a single category are
/// serialized while distinct categories proceed concurrently. Not durable;
/// suitable for development and testing.
pub struct MemoryBackorderStore {
	queues: [Mutex<CategoryQueue>; 8],
}

impl MemoryBackorderStore {
	pub fn new() -> Self {
		Self {
			queues: std::array::from_fn(|_| Mutex::new(CategoryQueue::default())),
		}
	}

	fn queue(&self, category: BloodCategory) -> &Mutex<CategoryQueue> {
		&self.queues[queue_slot(category)]
	}
}

impl Default for MemoryBackorderStore {
	fn default() -> Self {
		Self::new()
	}
}

impl BackorderStore for MemoryBackorderStore {
	fn append(
		&self,
		category: BloodCategory,
		pending: PendingBackorder,
	) -> Result<SequenceNumber, StoreError> {
		self.queue(category).lock().unwrap().append(category, pending)
	}

	fn scan_all(&self, category: BloodCategory) -> Result<Vec<BackorderEntry>, StoreError> {
		Ok(self.queue(category).lock().unwrap().snapshot())
	}

	fn remove(&self, category: BloodCategory, seq: SequenceNumber) -> Result<bool, StoreError> {
		Ok(self.queue(category).lock().unwrap().remove(seq))
	}

	fn update_remaining(
		&self,
		category: BloodCategory,
		seq: SequenceNumber,
		remaining: u32,
	) -> Result<bool, StoreError> {
		Ok(self
			.queue(category)
			.lock()
			.unwrap()
			.update_remaining(seq, remaining))
	}

	fn len(&self, category: BloodCategory) -> usize {
		self.queue(category).lock().unwrap().len()
	}
}

#[cfg(test)]
mod tests {
	use std::collections::BTreeSet;

	use chrono::NaiveDate;

	use super::*;

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn pending(units: u32, reason: Option<&str>) -> PendingBackorder {
		PendingBackorder {
			branch: 1,
			units,
			created_on: date(2026, 8, 1),
			expire_after_days: 7,
			reason: reason.map(str::to_string),
			eligible: BTreeSet::from([10, 20]),
		}
	}

	#[test]
	fn test_append_assigns_monotonic_sequences() {
		let store = MemoryBackorderStore::new();
		let category = BloodCategory::APositive;

		let first = store.append(category, pending(1, None)).unwrap();
		let second = store.append(category, pending(2, None)).unwrap();
		assert!(second > first);

		// Sequence ids survive removal of earlier entries
		assert!(store.remove(category, first).unwrap());
		let third = store.append(category, pending(3, None)).unwrap();
		assert!(third > second);
	}

	#[test]
	fn test_append_rejects_duplicates() {
		let store = MemoryBackorderStore::new();
		let category = BloodCategory::ONegative;

		let seq = store.append(category, pending(5, Some("surgery"))).unwrap();
		let result = store.append(category, pending(5, Some("surgery")));

		assert!(matches!(result, Err(StoreError::Duplicate(s)) if s == seq));
		assert_eq!(store.len(category), 1);
	}

	#[test]
	fn test_duplicate_check_is_per_category() {
		let store = MemoryBackorderStore::new();

		store
			.append(BloodCategory::APositive, pending(5, None))
			.unwrap();
		// Same fields in another category are not duplicates
		store
			.append(BloodCategory::BNegative, pending(5, None))
			.unwrap();

		assert_eq!(store.len(BloodCategory::APositive), 1);
		assert_eq!(store.len(BloodCategory::BNegative), 1);
	}

	#[test]
	fn test_scan_preserves_fifo_order() {
		let store = MemoryBackorderStore::new();
		let category = BloodCategory::AbPositive;

		for units in 1..=4 {
			store.append(category, pending(units, None)).unwrap();
		}

		let entries = store.scan_all(category).unwrap();
		let units: Vec<u32> = entries.iter().map(|entry| entry.units).collect();
		assert_eq!(units, vec![1, 2, 3, 4]);
	}

	#[test]
	fn test_remove_mid_queue_preserves_order() {
		let store = MemoryBackorderStore::new();
		let category = BloodCategory::BPositive;

		let seqs: Vec<_> = (1..=3)
			.map(|units| store.append(category, pending(units, None)).unwrap())
			.collect();

		assert!(store.remove(category, seqs[1]).unwrap());
		assert!(!store.remove(category, seqs[1]).unwrap());

		let remaining: Vec<_> = store
			.scan_all(category)
			.unwrap()
			.iter()
			.map(|entry| entry.sequence)
			.collect();
		assert_eq!(remaining, vec![seqs[0], seqs[2]]);
	}

	#[test]
	fn test_update_remaining_in_place() {
		let store = MemoryBackorderStore::new();
		let category = BloodCategory::OPositive;

		let seq = store.append(category, pending(5, None)).unwrap();
		assert!(store.update_remaining(category, seq, 2).unwrap());

		let entries = store.scan_all(category).unwrap();
		assert_eq!(entries[0].units, 2);
		assert_eq!(entries[0].sequence, seq);
	}
}
