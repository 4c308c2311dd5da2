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

//! Matching service entry point
//!
//! This binary wires up all components of the request matcher:
//! - Location Index (distance eligibility)
//! - Inventory Ledger (available stock, atomic decrements)
//! - Backorder Store (durable per-category FIFO queues)
//! - Notify Worker (fire-and-forget donor notifications)
//! - Sweep Scheduler (periodic expiry and reconciliation)

use std::{fs, path::Path, sync::Arc};

use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Deserialize;
use tokio::signal;
use tracing::info;

use hemolink_matching::{
	FileBackorderStore, LocationIndex, LogNotifier, MatchEngine, MemoryInventoryLedger,
	NotifyQueue, NotifyWorker, SweepScheduler, SweepSchedulerConfig, Sweeper,
	config::MatchingConfig,
};
use hemolink_sdk::{Branch, Location};

/// One seeded donation row from the optional inventory file
#[derive(Debug, Deserialize)]
struct SeedDonation {
	branch: u32,
	donor: u32,
	category: hemolink_sdk::BloodCategory,
	units: u32,
	donation_date: NaiveDate,
}

fn load_json<T: serde::de::DeserializeOwned>(path: &str) -> Result<T> {
	let bytes = fs::read(Path::new(path)).with_context(|| format!("Failed to read {path}"))?;
	serde_json::from_slice(&bytes).with_context(|| format!("Failed to parse {path}"))
}

#[tokio::main]
async fn main() -> Result<()> {
	// Initialize logging first
	hemolink_matching::logging::init_logging()?;

	// Load configuration
	let config = MatchingConfig::from_env();

	info!(target: "server", "Starting Hemolink Matching Service");
	info!(target: "server", "Data directory: {}", config.data_dir);
	info!(target: "server", "Sweep interval: {}s", config.sweep_interval_secs);
	info!(target: "server", "Notify queue size: {}", config.notify_queue_size);

	// Phase 1: Load reference data
	info!(target: "server", "Loading reference data...");
	let locations: Vec<Location> = load_json(&config.locations_file)?;
	let branches: Vec<Branch> = load_json(&config.branches_file)?;
	info!(
		target: "server",
		locations = locations.len(),
		branches = branches.len(),
		"Reference data loaded"
	);
	let index = Arc::new(LocationIndex::new(locations));

	// Phase 2: Initialize Inventory Ledger
	info!(target: "server", "Initializing inventory ledger...");
	let ledger = Arc::new(MemoryInventoryLedger::new(branches));
	if let Some(path) = &config.inventory_file {
		let seed: Vec<SeedDonation> = load_json(path)?;
		let count = seed.len();
		for row in seed {
			ledger
				.record_donation(row.branch, row.donor, row.category, row.units, row.donation_date)
				.with_context(|| format!("Failed to seed donation from {path}"))?;
		}
		info!(target: "server", donations = count, "Inventory seeded");
	}

	// Phase 3: Open Backorder Store
	info!(target: "server", "Opening backorder store...");
	let store = Arc::new(
		FileBackorderStore::open(&config.data_dir)
			.with_context(|| format!("Failed to open backorder store in {}", config.data_dir))?,
	);

	// Phase 4: Start Notify Worker
	info!(target: "server", "Starting notify worker...");
	let (notify_sender, notify_receiver) = NotifyQueue::new(config.notify_queue_size).split();
	let notify_worker = NotifyWorker::start(notify_receiver, Box::new(LogNotifier));

	// Phase 5: Create Matching Engine
	info!(target: "server", "Creating matching engine...");
	let engine = Arc::new(MatchEngine::new(index, ledger, store, notify_sender));

	// Phase 6: Start Sweep Scheduler
	info!(target: "server", "Starting sweep scheduler...");
	let sweeper = Sweeper::new(engine);
	let scheduler = SweepScheduler::start(
		sweeper,
		SweepSchedulerConfig {
			sweep_interval_secs: config.sweep_interval_secs,
		},
	);

	// Wait for shutdown signal
	signal::ctrl_c().await.context("Failed to listen for ctrl-c")?;
	info!(target: "server", "Shutting down...");

	// Graceful shutdown: stop scheduling new sweeps, then drain notifications
	scheduler.shutdown();
	notify_worker.shutdown();

	info!(target: "server", "Shutdown complete");
	Ok(())
}
