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
	sync::{
		Arc,
		atomic::{AtomicBool, Ordering},
	},
	thread::{self, JoinHandle},
	time::{Duration, Instant},
};

use chrono::{NaiveDate, Utc};
use tracing::{error, info, warn};

use crate::engine::{EngineError, MatchEngine};
use hemolink_sdk::BloodCategory;

/// Configuration for the sweep scheduler
#[derive(Debug, Clone)]
pub struct SweepSchedulerConfig {
	/// Interval between sweeps (seconds)
	pub sweep_interval_secs: u64,
}

impl Default for SweepSchedulerConfig {
	fn default() -> Self {
		Self {
			sweep_interval_secs: 86_400, // daily
		}
	}
}

/// Counters from one sweep pass over all category queues
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SweepReport {
	/// Entries dropped because their age exceeded the expiry window
	pub expired: usize,
	/// Entries fully satisfied and removed
	pub fulfilled: usize,
	/// Entries partially satisfied and reduced in place
	pub reduced: usize,
	/// Categories whose processing failed and was skipped
	pub failed_categories: usize,
}

/// Expiry & Reconciliation Sweeper
///
/// One `run_sweep` pass walks every category queue in FIFO order,
/// retiring expired entries and re-matching the rest against current
/// inventory through the same engine path live requests use. The
/// re-match runs against each entry's stored eligible-location snapshot,
/// never a recomputed one.
///
/// A pass is idempotent: with no intervening inventory change, running
/// it again mutates nothing. Categories are processed independently; a
/// failure in one category is counted and logged while the remaining
/// categories still run.
pub struct Sweeper {
	engine: Arc<MatchEngine>,
}

impl Sweeper {
	pub fn new(engine: Arc<MatchEngine>) -> Self {
		Self { engine }
	}

	/// Run one sweep pass dated today
	pub fn run_sweep(&self) -> SweepReport {
		self.run_sweep_at(Utc::now().date_naive())
	}

	/// Run one sweep pass with an explicit date
	pub fn run_sweep_at(&self, today: NaiveDate) -> SweepReport {
		let start = Instant::now();
		let mut report = SweepReport::default();

		for category in BloodCategory::ALL {
			if let Err(e) = self.sweep_category(category, today, &mut report) {
				report.failed_categories += 1;
				error!(
					target: "sweeper",
					category = %category,
					error = %e,
					"Category sweep failed; continuing with remaining categories"
				);
			}
		}

		info!(
			target: "sweeper",
			expired = report.expired,
			fulfilled = report.fulfilled,
			reduced = report.reduced,
			failed_categories = report.failed_categories,
			duration_ms = start.elapsed().as_millis(),
			"Sweep complete"
		);

		report
	}

	fn sweep_category(
		&self,
		category: BloodCategory,
		today: NaiveDate,
		report: &mut SweepReport,
	) -> Result<(), EngineError> {
		let store = self.engine.store();
		let entries = store.scan_all(category).map_err(EngineError::Store)?;

		for entry in entries {
			if entry.expired_by(today) {
				store
					.remove(category, entry.sequence)
					.map_err(EngineError::Store)?;
				info!(
					target: "sweeper",
					category = %category,
					sequence = entry.sequence,
					created_on = %entry.created_on,
					"Expired backorder dropped"
				);
				report.expired += 1;
				continue;
			}

			match self
				.engine
				.fill_from_stock(&entry.eligible, category, entry.units)?
			{
				None => {}
				Some(fill) if fill.taken == entry.units => {
					store
						.remove(category, entry.sequence)
						.map_err(EngineError::Store)?;
					info!(
						target: "sweeper",
						category = %category,
						sequence = entry.sequence,
						units = entry.units,
						"Backorder fully fulfilled"
					);
					report.fulfilled += 1;
				}
				Some(fill) => {
					store
						.update_remaining(category, entry.sequence, entry.units - fill.taken)
						.map_err(EngineError::Store)?;
					info!(
						target: "sweeper",
						category = %category,
						sequence = entry.sequence,
						taken = fill.taken,
						remaining = entry.units - fill.taken,
						"Backorder partially fulfilled"
					);
					report.reduced += 1;
				}
			}
		}

		Ok(())
	}
}

/// Sweep Scheduler - runs the sweeper on a fixed interval
///
/// Background thread with the same lifecycle discipline as the other
/// workers: named thread, shutdown flag, graceful join. The sleep is
/// sliced so shutdown does not wait out a whole (potentially daily)
/// interval.
pub struct SweepScheduler {
	thread_handle: Option<JoinHandle<()>>,
	shutdown: Arc<AtomicBool>,
}

impl SweepScheduler {
	pub fn start(sweeper: Sweeper, config: SweepSchedulerConfig) -> Self {
		let shutdown = Arc::new(AtomicBool::new(false));
		let shutdown_clone = shutdown.clone();

		let thread_handle = thread::Builder::new()
			.name("sweep-scheduler".to_string())
			.spawn(move || {
				info!(target: "sweeper", "Sweep scheduler started");
				Self::run_schedule_loop(&sweeper, &config, &shutdown_clone);
				info!(target: "sweeper", "Sweep scheduler stopped");
			})
			.expect("Failed to spawn sweep scheduler thread");

		Self {
			thread_handle: Some(thread_handle),
			shutdown,
		}
	}

	fn run_schedule_loop(
		sweeper: &Sweeper,
		config: &SweepSchedulerConfig,
		shutdown: &Arc<AtomicBool>,
	) {
		let interval = Duration::from_secs(config.sweep_interval_secs);
		let mut last_run = Instant::now();

		loop {
			if shutdown.load(Ordering::Relaxed) {
				break;
			}

			if last_run.elapsed() >= interval {
				sweeper.run_sweep();
				last_run = Instant::now();
			}

			thread::sleep(Duration::from_millis(250));
		}
	}

	pub fn shutdown(mut self) {
		info!(target: "sweeper", "Shutting down sweep scheduler");
		self.shutdown.store(true, Ordering::Relaxed);

		if let Some(handle) = self.thread_handle.take()
			&& let Err(e) = handle.join()
		{
			warn!(target: "sweeper", error = ?e, "Sweep scheduler thread panicked");
		}
	}
}

impl Drop for SweepScheduler {
	fn drop(&mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		if let Some(handle) = self.thread_handle.take() {
			let _ = handle.join();
		}
	}
}
