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

use std::{collections::BTreeSet, sync::Arc};

use chrono::{NaiveDate, Utc};
use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::{
	geo::{LocationIndex, SEARCH_RADIUS_METERS},
	ledger::{InventoryLedger, LedgerError, StockView},
	notify::{Notification, NotifySender},
	store::{BackorderStore, StoreError},
	types::PendingBackorder,
};
use hemolink_sdk::{BloodCategory, DonationId, LocationId, MatchOutcome, MatchRequest};

/// Error types for matching operations
///
/// Statuses (fulfilled / partially fulfilled / queued / duplicate) are
/// not errors; they are [`MatchOutcome`] variants. Errors are rejected
/// requests (validation, before any state mutation) and storage failures
/// fatal for the single operation.
#[derive(Debug, Error)]
pub enum EngineError {
	#[error("Validation error: {0}")]
	Validation(String),
	#[error(transparent)]
	Ledger(#[from] LedgerError),
	#[error("Backorder store error: {0}")]
	Store(StoreError),
}

/// Units taken from one inventory record during a matching pass
#[derive(Debug, Clone)]
pub(crate) struct Fill {
	pub donation: DonationId,
	pub taken: u32,
}

/// Matching Engine - one synchronous pass per incoming request
///
/// For each request the engine resolves the eligible location set,
/// queries the inventory ledger, decrements what is available from a
/// single record, and defers any remainder into the category's backorder
/// queue (subject to the dedup rule). It always returns a definite
/// outcome within one pass; there is no polling or waiting.
///
/// Both live requests and the sweeper go through the same ledger and
/// store disciplines; there is no separate sweeper-only path. Donor
/// notifications are pushed onto a bounded queue and never block
/// fulfillment.
pub struct MatchEngine {
	index: Arc<LocationIndex>,
	ledger: Arc<dyn InventoryLedger>,
	store: Arc<dyn BackorderStore>,
	notify: NotifySender,
}

impl MatchEngine {
	pub fn new(
		index: Arc<LocationIndex>,
		ledger: Arc<dyn InventoryLedger>,
		store: Arc<dyn BackorderStore>,
		notify: NotifySender,
	) -> Self {
		Self {
			index,
			ledger,
			store,
			notify,
		}
	}

	/// Process one incoming request dated today
	pub fn submit(&self, request: &MatchRequest) -> Result<MatchOutcome, EngineError> {
		self.submit_at(request, Utc::now().date_naive())
	}

	/// Process one incoming request with an explicit creation date
	pub fn submit_at(
		&self,
		request: &MatchRequest,
		today: NaiveDate,
	) -> Result<MatchOutcome, EngineError> {
		let category = BloodCategory::from_id(request.category).ok_or_else(|| {
			EngineError::Validation(format!(
				"blood category must be within 1..=8, got {}",
				request.category
			))
		})?;

		if request.units == 0 {
			return Err(EngineError::Validation(
				"requested units must be positive".to_string(),
			));
		}

		let eligible = self
			.index
			.nearby(request.origin, SEARCH_RADIUS_METERS)
			.map_err(|e| EngineError::Validation(e.to_string()))?;

		debug!(
			target: "engine",
			branch = request.branch,
			category = %category,
			units = request.units,
			eligible = eligible.len(),
			"Matching request"
		);

		let fill = self.fill_from_stock(&eligible, category, request.units)?;

		match fill {
			None => {
				let pending = PendingBackorder {
					branch: request.branch,
					units: request.units,
					created_on: today,
					expire_after_days: request.expire_after_days,
					reason: request.reason.clone(),
					eligible,
				};
				match self.store.append(category, pending) {
					Ok(sequence) => {
						info!(
							target: "engine",
							branch = request.branch,
							category = %category,
							units = request.units,
							sequence,
							"No eligible stock; request queued"
						);
						Ok(MatchOutcome::Queued { sequence })
					}
					Err(StoreError::Duplicate(sequence)) => {
						info!(
							target: "engine",
							branch = request.branch,
							category = %category,
							sequence,
							"Identical request already queued"
						);
						Ok(MatchOutcome::AlreadyQueued)
					}
					Err(e) => Err(EngineError::Store(e)),
				}
			}
			Some(fill) if fill.taken == request.units => {
				info!(
					target: "engine",
					branch = request.branch,
					category = %category,
					units = fill.taken,
					donation = fill.donation,
					"Request fully fulfilled"
				);
				Ok(MatchOutcome::Fulfilled {
					donation: fill.donation,
					units: fill.taken,
				})
			}
			Some(fill) => {
				let queued = request.units - fill.taken;
				let pending = PendingBackorder {
					branch: request.branch,
					units: queued,
					created_on: today,
					expire_after_days: request.expire_after_days,
					reason: request.reason.clone(),
					eligible,
				};
				// A duplicate here means the remainder is already waiting;
				// the partial fulfillment stands either way.
				let sequence = match self.store.append(category, pending) {
					Ok(sequence) | Err(StoreError::Duplicate(sequence)) => sequence,
					Err(e) => return Err(EngineError::Store(e)),
				};
				info!(
					target: "engine",
					branch = request.branch,
					category = %category,
					taken = fill.taken,
					queued,
					sequence,
					"Request partially fulfilled; remainder queued"
				);
				Ok(MatchOutcome::PartiallyFulfilled {
					donation: fill.donation,
					taken: fill.taken,
					queued,
					sequence,
				})
			}
		}
	}

	/// Take up to `units` from the first qualifying inventory record
	///
	/// Walks the ledger's deterministic availability order and decrements
	/// the first record that still has stock at decrement time (a row can
	/// race to empty between the availability read and the decrement).
	/// Units always come from a single record; the caller queues whatever
	/// is left. Sends the donor notification for the portion taken.
	pub(crate) fn fill_from_stock(
		&self,
		eligible: &BTreeSet<LocationId>,
		category: BloodCategory,
		units: u32,
	) -> Result<Option<Fill>, EngineError> {
		let stock = self.ledger.available(eligible, category)?;

		for row in stock {
			let taken = self.ledger.decrement(row.donation, units)?;
			if taken == 0 {
				continue;
			}

			self.notify_match(&row, category, taken);
			return Ok(Some(Fill {
				donation: row.donation,
				taken,
			}));
		}

		Ok(None)
	}

	pub(crate) fn store(&self) -> &dyn BackorderStore {
		self.store.as_ref()
	}

	/// Queue the fire-and-forget donor notification
	fn notify_match(&self, stock: &StockView, category: BloodCategory, taken: u32) {
		let notification = Notification {
			id: Uuid::new_v4(),
			recipient: stock.donor,
			subject: "Your blood donation was matched".to_string(),
			body: format!(
				"{taken} unit(s) of {category} from your donation were issued to branch {}.",
				stock.branch
			),
		};

		if let Err(e) = self.notify.try_send(notification) {
			// Best-effort: fulfillment already happened and stands
			warn!(
				target: "engine",
				donor = stock.donor,
				error = %e,
				"Dropping donor notification"
			);
		}
	}
}

#[cfg(test)]
mod tests {
	use chrono::NaiveDate;

	use super::*;
	use crate::{
		ledger::MemoryInventoryLedger,
		notify::{NotifyQueue, NotifyReceiver},
		store::MemoryBackorderStore,
	};
	use hemolink_sdk::{Branch, Location};

	fn date(y: i32, m: u32, d: u32) -> NaiveDate {
		NaiveDate::from_ymd_opt(y, m, d).unwrap()
	}

	fn location(id: u32, latitude: f64) -> Location {
		Location {
			id,
			region: 1,
			latitude,
			longitude: 29.0,
		}
	}

	struct Harness {
		engine: MatchEngine,
		ledger: Arc<MemoryInventoryLedger>,
		store: Arc<MemoryBackorderStore>,
		receiver: NotifyReceiver,
	}

	// Locations 1 and 2 are ~33 km apart; location 3 is ~111 km from 1.
	// Branch 1 sits at location 1, branch 2 at location 2, branch 3 at 3.
	fn harness() -> Harness {
		let index = Arc::new(LocationIndex::new([
			location(1, 41.0),
			location(2, 41.3),
			location(3, 42.0),
		]));
		let ledger = Arc::new(MemoryInventoryLedger::new([
			Branch {
				id: 1,
				name: "central".to_string(),
				location: 1,
			},
			Branch {
				id: 2,
				name: "north".to_string(),
				location: 2,
			},
			Branch {
				id: 3,
				name: "far".to_string(),
				location: 3,
			},
		]));
		let store = Arc::new(MemoryBackorderStore::new());
		let (sender, receiver) = NotifyQueue::new(64).split();
		let engine = MatchEngine::new(index, ledger.clone(), store.clone(), sender);
		Harness {
			engine,
			ledger,
			store,
			receiver,
		}
	}

	fn request(category: u8, units: u32) -> MatchRequest {
		MatchRequest {
			branch: 1,
			category,
			units,
			origin: 1,
			expire_after_days: 7,
			reason: None,
		}
	}

	#[test]
	fn test_invalid_category_rejected_before_mutation() {
		let h = harness();

		let result = h.engine.submit_at(&request(9, 1), date(2026, 8, 1));
		assert!(matches!(result, Err(EngineError::Validation(_))));
		assert_eq!(h.store.len(BloodCategory::OPositive), 0);
	}

	#[test]
	fn test_zero_units_rejected() {
		let h = harness();

		let result = h.engine.submit_at(&request(3, 0), date(2026, 8, 1));
		assert!(matches!(result, Err(EngineError::Validation(_))));
	}

	#[test]
	fn test_unknown_origin_rejected() {
		let h = harness();
		let mut req = request(3, 1);
		req.origin = 404;

		let result = h.engine.submit_at(&req, date(2026, 8, 1));
		assert!(matches!(result, Err(EngineError::Validation(_))));
	}

	#[test]
	fn test_stock_outside_radius_is_not_taken() {
		let h = harness();
		// Only branch 3 (~111 km away) has stock
		let donation = h
			.ledger
			.record_donation(3, 100, BloodCategory::APositive, 5, date(2026, 8, 1))
			.unwrap();

		let outcome = h.engine.submit_at(&request(3, 5), date(2026, 8, 1)).unwrap();
		assert!(matches!(outcome, MatchOutcome::Queued { .. }));
		assert_eq!(h.ledger.units(donation), Some(5));
	}

	#[test]
	fn test_full_fulfillment_notifies_donor() {
		let h = harness();
		h.ledger
			.record_donation(2, 100, BloodCategory::APositive, 5, date(2026, 8, 1))
			.unwrap();

		let outcome = h.engine.submit_at(&request(3, 5), date(2026, 8, 10)).unwrap();
		assert!(matches!(outcome, MatchOutcome::Fulfilled { units: 5, .. }));

		let notification = h.receiver.try_recv().unwrap();
		assert_eq!(notification.recipient, 100);
	}

	#[test]
	fn test_partial_fulfillment_queues_remainder() {
		let h = harness();
		let donation = h
			.ledger
			.record_donation(1, 100, BloodCategory::OPositive, 2, date(2026, 8, 1))
			.unwrap();

		let outcome = h.engine.submit_at(&request(1, 5), date(2026, 8, 10)).unwrap();
		match outcome {
			MatchOutcome::PartiallyFulfilled { taken, queued, .. } => {
				assert_eq!(taken, 2);
				assert_eq!(queued, 3);
			}
			other => panic!("expected partial fulfillment, got {other:?}"),
		}

		assert_eq!(h.ledger.units(donation), Some(0));
		let entries = h.store.scan_all(BloodCategory::OPositive).unwrap();
		assert_eq!(entries.len(), 1);
		assert_eq!(entries[0].units, 3);
	}

	#[test]
	fn test_oldest_stock_consumed_first() {
		let h = harness();
		let newer = h
			.ledger
			.record_donation(1, 100, BloodCategory::BPositive, 5, date(2026, 8, 5))
			.unwrap();
		let older = h
			.ledger
			.record_donation(2, 101, BloodCategory::BPositive, 5, date(2026, 8, 1))
			.unwrap();

		let outcome = h.engine.submit_at(&request(5, 5), date(2026, 8, 10)).unwrap();
		match outcome {
			MatchOutcome::Fulfilled { donation, .. } => assert_eq!(donation, older),
			other => panic!("expected fulfillment, got {other:?}"),
		}
		assert_eq!(h.ledger.units(newer), Some(5));
	}

	#[test]
	fn test_duplicate_request_reported() {
		let h = harness();

		let first = h.engine.submit_at(&request(6, 2), date(2026, 8, 1)).unwrap();
		assert!(matches!(first, MatchOutcome::Queued { .. }));

		let second = h.engine.submit_at(&request(6, 2), date(2026, 8, 2)).unwrap();
		assert_eq!(second, MatchOutcome::AlreadyQueued);
		assert_eq!(h.store.len(BloodCategory::BNegative), 1);
	}
}
