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

mod memory;

use std::collections::BTreeSet;

use thiserror::Error;

use hemolink_sdk::{BloodCategory, BranchId, DonationId, DonorId, LocationId};
pub use memory::MemoryInventoryLedger;

/// Error types for inventory ledger operations
#[derive(Debug, Error)]
pub enum LedgerError {
	#[error("Unknown inventory record: {0}")]
	UnknownRecord(DonationId),
	#[error("Unknown branch: {0}")]
	UnknownBranch(BranchId),
	#[error("Inventory storage error: {0}")]
	Storage(String),
}

/// One availability row returned by [`InventoryLedger::available`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StockView {
	/// Ledger row the units can be taken from
	pub donation: DonationId,
	/// Branch holding the units
	pub branch: BranchId,
	/// Donor the units came from (notification recipient)
	pub donor: DonorId,
	/// Units currently available (> 0)
	pub units: u32,
}

/// Inventory Ledger trait - per-branch, per-category unit counts
///
/// The ledger is the sole contended resource of the matching core.
/// Decrements are serialized per record, never globally, so unrelated
/// branches and categories proceed without contention. Record creation
/// belongs to the external donation-intake path; the core only reads
/// and decrements.
pub trait InventoryLedger: Send + Sync {
	/// Stock available within the eligible location set for a category
	///
	/// Returns only records with units > 0 whose branch sits inside the
	/// eligible set and whose category matches. The order is deterministic
	/// and stable: earliest donation date first, then lowest donation id,
	/// so the oldest stock is consumed first.
	fn available(
		&self,
		eligible: &BTreeSet<LocationId>,
		category: BloodCategory,
	) -> Result<Vec<StockView>, LedgerError>;

	/// Atomically remove up to `amount` units from one record
	///
	/// Removes `min(current, amount)` and returns the amount actually
	/// removed. Two concurrent decrements of the same record never jointly
	/// remove more units than were present, and the count never goes
	/// negative.
	fn decrement(&self, donation: DonationId, amount: u32) -> Result<u32, LedgerError>;
}
