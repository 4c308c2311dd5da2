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

use std::collections::BTreeSet;

use chrono::{Days, NaiveDate};
use hemolink_sdk::{BloodCategory, BranchId, DonationId, DonorId, LocationId, SequenceNumber};
use serde::{Deserialize, Serialize};

/// One donation row in the inventory ledger
///
/// Created and incremented by the external donation-intake path; the
/// matching core only reads and decrements it. The unit count is never
/// negative: a decrement that would overshoot is clamped to what is
/// available.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InventoryRecord {
	/// Ledger row identifier
	pub donation: DonationId,
	/// Branch holding the units
	pub branch: BranchId,
	/// Donor the units came from
	pub donor: DonorId,
	/// Blood category of the stock
	pub category: BloodCategory,
	/// Units currently available
	pub units: u32,
	/// Date the donation was recorded
	pub donation_date: NaiveDate,
}

/// A queued request awaiting future supply
///
/// Lives inside exactly one category's FIFO queue. `units` is reduced in
/// place when the sweeper partially fulfills the entry; the entry is
/// removed once `units` reaches zero or the entry's age exceeds
/// `expire_after_days`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackorderEntry {
	/// Per-category monotonic sequence id (idempotency/auditing, not ordering)
	pub sequence: SequenceNumber,
	/// Branch that issued the request
	pub branch: BranchId,
	/// Requested blood category
	pub category: BloodCategory,
	/// Units still outstanding (> 0 while the entry is queued)
	pub units: u32,
	/// Date the entry was created
	pub created_on: NaiveDate,
	/// Days after which the entry expires
	pub expire_after_days: u32,
	/// Optional free-form reason carried over from the request
	pub reason: Option<String>,
	/// Eligible-location set snapshot taken when the request arrived
	///
	/// The sweeper re-matches against this stored set; it is never
	/// recomputed.
	pub eligible: BTreeSet<LocationId>,
}

impl BackorderEntry {
	/// Whether the entry's age exceeds its expiry window on the given day
	pub fn expired_by(&self, today: NaiveDate) -> bool {
		match self
			.created_on
			.checked_add_days(Days::new(u64::from(self.expire_after_days)))
		{
			Some(deadline) => today > deadline,
			None => false,
		}
	}

	/// Exact-field duplicate check used by the append dedup rule
	///
	/// Two requests are duplicates when units, expiry window, reason, and
	/// the eligible-location snapshot all match. Creation date and branch
	/// do not participate, mirroring the original duplicate semantics.
	pub fn matches_pending(&self, pending: &PendingBackorder) -> bool {
		self.units == pending.units
			&& self.expire_after_days == pending.expire_after_days
			&& self.reason == pending.reason
			&& self.eligible == pending.eligible
	}
}

/// A backorder about to be appended, before the store assigns a sequence id
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PendingBackorder {
	/// Branch that issued the request
	pub branch: BranchId,
	/// Units to defer
	pub units: u32,
	/// Date the entry is created
	pub created_on: NaiveDate,
	/// Days after which the entry expires
	pub expire_after_days: u32,
	/// Optional free-form reason
	pub reason: Option<String>,
	/// Eligible-location set snapshot
	pub eligible: BTreeSet<LocationId>,
}

impl PendingBackorder {
	/// Materialize the entry with its store-assigned sequence id
	pub fn into_entry(self, sequence: SequenceNumber, category: BloodCategory) -> BackorderEntry {
		BackorderEntry {
			sequence,
			branch: self.branch,
			category,
			units: self.units,
			created_on: self.created_on,
			expire_after_days: self.expire_after_days,
			reason: self.reason,
			eligible: self.eligible,
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn entry(units: u32, created_on: NaiveDate, expire_after_days: u32) -> BackorderEntry {
		BackorderEntry {
			sequence: 1,
			branch: 10,
			category: BloodCategory::APositive,
			units,
			created_on,
			expire_after_days,
			reason: None,
			eligible: BTreeSet::from([1, 2]),
		}
	}

	#[test]
	fn test_expiry_boundary() {
		let e = entry(3, date(2026, 8, 1), 7);

		// Deadline day itself is still alive; expiry starts the day after
		assert!(!e.expired_by(date(2026, 8, 8)));
		assert!(e.expired_by(date(2026, 8, 9)));
	}

	#[test]
	fn test_duplicate_ignores_creation_date() {
		let e = entry(3, date(2026, 8, 1), 7);
		let pending = PendingBackorder {
			branch: 99,
			units: 3,
			created_on: date(2026, 8, 5),
			expire_after_days: 7,
			reason: None,
			eligible: BTreeSet::from([1, 2]),
		};

		assert!(e.matches_pending(&pending));
	}

	#[test]
	fn test_duplicate_requires_same_eligible_set() {
		let e = entry(3, date(2026, 8, 1), 7);
		let pending = PendingBackorder {
			branch: 10,
			units: 3,
			created_on: date(2026, 8, 1),
			expire_after_days: 7,
			reason: None,
			eligible: BTreeSet::from([1, 2, 3]),
		};

		assert!(!e.matches_pending(&pending));
	}
}
