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

use serde::{Deserialize, Serialize};

/// Identifier of a reference location (district)
pub type LocationId = u32;

/// Identifier of a hospital branch
pub type BranchId = u32;

/// Identifier of a registered donor
pub type DonorId = u32;

/// Identifier of a single donation row in the inventory ledger
pub type DonationId = u64;

/// Per-category monotonic sequence number assigned to backorder entries
pub type SequenceNumber = u64;

/// Blood category (blood group), one of 8 fixed values
///
/// Categories are identified by a stable integer id in the 1..=8 range.
/// The enumeration is closed: reference data may not add categories at
/// runtime, and any id outside the range is a validation error at the
/// intake boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum BloodCategory {
	OPositive,
	ONegative,
	APositive,
	ANegative,
	BPositive,
	BNegative,
	AbPositive,
	AbNegative,
}

impl BloodCategory {
	/// All categories in stable id order
	pub const ALL: [BloodCategory; 8] = [
		BloodCategory::OPositive,
		BloodCategory::ONegative,
		BloodCategory::APositive,
		BloodCategory::ANegative,
		BloodCategory::BPositive,
		BloodCategory::BNegative,
		BloodCategory::AbPositive,
		BloodCategory::AbNegative,
	];

	/// Stable integer id (1..=8)
	pub fn id(self) -> u8 {
		match self {
			BloodCategory::OPositive => 1,
			BloodCategory::ONegative => 2,
			BloodCategory::APositive => 3,
			BloodCategory::ANegative => 4,
			BloodCategory::BPositive => 5,
			BloodCategory::BNegative => 6,
			BloodCategory::AbPositive => 7,
			BloodCategory::AbNegative => 8,
		}
	}

	/// Resolve a category from its stable id
	pub fn from_id(id: u8) -> Option<Self> {
		Self::ALL.get(id.checked_sub(1)? as usize).copied()
	}

	/// Human-readable group name (e.g. "O+")
	pub fn group_name(self) -> &'static str {
		match self {
			BloodCategory::OPositive => "O+",
			BloodCategory::ONegative => "O-",
			BloodCategory::APositive => "A+",
			BloodCategory::ANegative => "A-",
			BloodCategory::BPositive => "B+",
			BloodCategory::BNegative => "B-",
			BloodCategory::AbPositive => "AB+",
			BloodCategory::AbNegative => "AB-",
		}
	}
}

impl std::fmt::Display for BloodCategory {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.write_str(self.group_name())
	}
}

/// Error returned when a category id is outside the fixed enumeration
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown blood category id: {0} (expected 1..=8)")]
pub struct UnknownCategory(pub u8);

impl TryFrom<u8> for BloodCategory {
	type Error = UnknownCategory;

	fn try_from(id: u8) -> Result<Self, Self::Error> {
		Self::from_id(id).ok_or(UnknownCategory(id))
	}
}

impl From<BloodCategory> for u8 {
	fn from(category: BloodCategory) -> u8 {
		category.id()
	}
}

/// Reference location (district) with its coordinates
///
/// Immutable reference data owned by the external geography dataset.
/// The matching core only reads locations.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Location {
	/// Location identifier
	pub id: LocationId,
	/// Parent region (city) identifier
	pub region: u32,
	/// Latitude in decimal degrees
	pub latitude: f64,
	/// Longitude in decimal degrees
	pub longitude: f64,
}

/// Hospital branch holding inventory and issuing requests
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Branch {
	/// Branch identifier
	pub id: BranchId,
	/// Branch display name
	pub name: String,
	/// Location the branch sits at
	pub location: LocationId,
}

/// An incoming blood-unit request as received from the intake endpoint
///
/// The category is carried as its raw integer id: the intake endpoint
/// validates request shape, while category range, unit count, and origin
/// validation are the matching engine's responsibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRequest {
	/// Branch requesting the units
	pub branch: BranchId,
	/// Raw blood category id (must be within 1..=8)
	pub category: u8,
	/// Units requested
	pub units: u32,
	/// Location the proximity search starts from
	pub origin: LocationId,
	/// Days after which a queued request expires
	pub expire_after_days: u32,
	/// Optional free-form reason attached to the request
	pub reason: Option<String>,
}

/// Definite outcome of one matching pass
///
/// The engine always returns one of these within a single pass; there is
/// no polling or waiting state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum MatchOutcome {
	/// Entire request satisfied from one inventory record
	Fulfilled {
		/// Inventory record the units were taken from
		donation: DonationId,
		/// Units removed
		units: u32,
	},
	/// Part of the request satisfied; the remainder was queued
	PartiallyFulfilled {
		/// Inventory record the units were taken from
		donation: DonationId,
		/// Units removed now
		taken: u32,
		/// Units deferred into the backorder queue
		queued: u32,
		/// Sequence id of the backorder entry
		sequence: SequenceNumber,
	},
	/// No eligible stock; the full request was queued
	Queued {
		/// Sequence id of the backorder entry
		sequence: SequenceNumber,
	},
	/// An identical request is already waiting in the queue
	AlreadyQueued,
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_category_ids_round_trip() {
		for category in BloodCategory::ALL {
			assert_eq!(BloodCategory::from_id(category.id()), Some(category));
		}
	}

	#[test]
	fn test_category_id_bounds() {
		assert!(BloodCategory::from_id(0).is_none());
		assert!(BloodCategory::from_id(9).is_none());
		assert_eq!(BloodCategory::from_id(1), Some(BloodCategory::OPositive));
		assert_eq!(BloodCategory::from_id(8), Some(BloodCategory::AbNegative));
	}

	#[test]
	fn test_category_serializes_as_id() {
		let json = serde_json::to_string(&BloodCategory::APositive).unwrap();
		assert_eq!(json, "3");

		let category: BloodCategory = serde_json::from_str("5").unwrap();
		assert_eq!(category, BloodCategory::BPositive);

		assert!(serde_json::from_str::<BloodCategory>("9").is_err());
	}

	#[test]
	fn test_outcome_status_tag() {
		let outcome = MatchOutcome::Queued { sequence: 7 };
		let json = serde_json::to_string(&outcome).unwrap();
		assert!(json.contains("\"status\":\"queued\""));
	}
}
