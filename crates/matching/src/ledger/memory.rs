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
	collections::{BTreeSet, HashMap},
	sync::atomic::{AtomicU64, Ordering},
};

use chrono::NaiveDate;
use dashmap::DashMap;

use super::{InventoryLedger, LedgerError, StockView};
use crate::types::InventoryRecord;
use hemolink_sdk::{BloodCategory, Branch, BranchId, DonationId, DonorId, LocationId};

/// In-memory implementation of the Inventory Ledger
///
/// Records live in a concurrent map keyed by donation id; a decrement
/// takes exclusive access to its one entry, which serializes concurrent
/// decrements per record without a global lock. The branch directory is
/// immutable reference data fixed at construction.
///
/// Characteristics:
/// - No durability; the donation-intake path owns the system of record
/// - Availability scans the full map (stock volumes are small)
/// - `record_donation` is the external write path, not part of the
///   [`InventoryLedger`] trait the matching core consumes
pub struct MemoryInventoryLedger {
	/// Donation rows indexed by donation id
	records: DashMap<DonationId, InventoryRecord>,
	/// Branch id -> location id, from the reference branch dataset
	branch_locations: HashMap<BranchId, LocationId>,
	/// Next donation id to assign
	next_donation: AtomicU64,
}

impl MemoryInventoryLedger {
	pub fn new(branches: impl IntoIterator<Item = Branch>) -> Self {
		Self {
			records: DashMap::new(),
			branch_locations: branches
				.into_iter()
				.map(|branch| (branch.id, branch.location))
				.collect(),
			next_donation: AtomicU64::new(1),
		}
	}

	/// Record a donation (external donation-intake write path)
	///
	/// A donation by the same donor at the same branch on the same date
	/// increments the existing row instead of creating a second one.
	/// Returns the donation id the units were booked under.
	pub fn record_donation(
		&self,
		branch: BranchId,
		donor: DonorId,
		category: BloodCategory,
		units: u32,
		donation_date: NaiveDate,
	) -> Result<DonationId, LedgerError> {
		if !self.branch_locations.contains_key(&branch) {
			return Err(LedgerError::UnknownBranch(branch));
		}

		let existing = self.records.iter().find_map(|record| {
			(record.branch == branch && record.donor == donor && record.donation_date == donation_date)
				.then_some(record.donation)
		});

		if let Some(donation) = existing {
			if let Some(mut record) = self.records.get_mut(&donation) {
				record.units += units;
				return Ok(donation);
			}
		}

		let donation = self.next_donation.fetch_add(1, Ordering::Relaxed);
		self.records.insert(
			donation,
			InventoryRecord {
				donation,
				branch,
				donor,
				category,
				units,
				donation_date,
			},
		);
		Ok(donation)
	}

	/// Current unit count of a record (testing and reporting)
	pub fn units(&self, donation: DonationId) -> Option<u32> {
		self.records.get(&donation).map(|record| record.units)
	}
}

impl InventoryLedger for MemoryInventoryLedger {
	fn available(
		&self,
		eligible: &BTreeSet<LocationId>,
		category: BloodCategory,
	) -> Result<Vec<StockView>, LedgerError> {
		let mut rows: Vec<(NaiveDate, StockView)> = self
			.records
			.iter()
			.filter(|record| record.units > 0 && record.category == category)
			.filter(|record| {
				self.branch_locations
					.get(&record.branch)
					.is_some_and(|location| eligible.contains(location))
			})
			.map(|record| {
				(
					record.donation_date,
					StockView {
						donation: record.donation,
						branch: record.branch,
						donor: record.donor,
						units: record.units,
					},
				)
			})
			.collect();

		// Oldest stock first; donation id breaks date ties
		rows.sort_by_key(|(date, view)| (*date, view.donation));

		Ok(rows.into_iter().map(|(_, view)| view).collect())
	}

	fn decrement(&self, donation: DonationId, amount: u32) -> Result<u32, LedgerError> {
		let mut record = self
			.records
			.get_mut(&donation)
			.ok_or(LedgerError::UnknownRecord(donation))?;

		let taken = record.units.min(amount);
		record.units -= taken;
		Ok(taken)
	}
}

#[cfg(test)]
mod tests {
	use std::sync::Arc;

	use super::*;

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn branch(id: BranchId, location: LocationId) -> Branch {
		Branch {
			id,
			name: format!("branch_{id}"),
			location,
		}
	}

	fn test_ledger() -> MemoryInventoryLedger {
		MemoryInventoryLedger::new([branch(1, 10), branch(2, 20), branch(3, 30)])
	}

	#[test]
	fn test_available_filters_location_and_category() {
		let ledger = test_ledger();
		ledger
			.record_donation(1, 100, BloodCategory::APositive, 5, date(2026, 8, 1))
			.unwrap();
		ledger
			.record_donation(2, 101, BloodCategory::APositive, 5, date(2026, 8, 1))
			.unwrap();
		ledger
			.record_donation(1, 102, BloodCategory::ONegative, 5, date(2026, 8, 1))
			.unwrap();

		let eligible = BTreeSet::from([10]);
		let rows = ledger
			.available(&eligible, BloodCategory::APositive)
			.unwrap();

		assert_eq!(rows.len(), 1);
		assert_eq!(rows[0].branch, 1);
		assert_eq!(rows[0].donor, 100);
	}

	#[test]
	fn test_available_orders_oldest_stock_first() {
		let ledger = test_ledger();
		let newer = ledger
			.record_donation(1, 100, BloodCategory::BPositive, 2, date(2026, 8, 10))
			.unwrap();
		let older = ledger
			.record_donation(2, 101, BloodCategory::BPositive, 2, date(2026, 8, 1))
			.unwrap();

		let eligible = BTreeSet::from([10, 20]);
		let rows = ledger
			.available(&eligible, BloodCategory::BPositive)
			.unwrap();

		assert_eq!(rows[0].donation, older);
		assert_eq!(rows[1].donation, newer);
	}

	#[test]
	fn test_decrement_clamps_to_available() {
		let ledger = test_ledger();
		let donation = ledger
			.record_donation(1, 100, BloodCategory::OPositive, 3, date(2026, 8, 1))
			.unwrap();

		assert_eq!(ledger.decrement(donation, 5).unwrap(), 3);
		assert_eq!(ledger.units(donation), Some(0));
		assert_eq!(ledger.decrement(donation, 1).unwrap(), 0);
	}

	#[test]
	fn test_same_day_donation_merges() {
		let ledger = test_ledger();
		let first = ledger
			.record_donation(1, 100, BloodCategory::OPositive, 3, date(2026, 8, 1))
			.unwrap();
		let second = ledger
			.record_donation(1, 100, BloodCategory::OPositive, 2, date(2026, 8, 1))
			.unwrap();

		assert_eq!(first, second);
		assert_eq!(ledger.units(first), Some(5));

		let next_day = ledger
			.record_donation(1, 100, BloodCategory::OPositive, 1, date(2026, 8, 2))
			.unwrap();
		assert_ne!(first, next_day);
	}

	#[test]
	fn test_unknown_branch_rejected() {
		let ledger = test_ledger();
		let result = ledger.record_donation(42, 100, BloodCategory::OPositive, 3, date(2026, 8, 1));
		assert!(matches!(result, Err(LedgerError::UnknownBranch(42))));
	}

	#[test]
	fn test_concurrent_decrements_never_oversell() {
		let ledger = Arc::new(test_ledger());
		let donation = ledger
			.record_donation(1, 100, BloodCategory::OPositive, 100, date(2026, 8, 1))
			.unwrap();

		let handles: Vec<_> = (0..8)
			.map(|_| {
				let ledger = ledger.clone();
				std::thread::spawn(move || {
					let mut taken = 0u32;
					for _ in 0..25 {
						taken += ledger.decrement(donation, 1).unwrap();
					}
					taken
				})
			})
			.collect();

		let total: u32 = handles.into_iter().map(|h| h.join().unwrap()).sum();

		// 8 threads asked for 200 units total; only 100 existed
		assert_eq!(total, 100);
		assert_eq!(ledger.units(donation), Some(0));
	}
}
