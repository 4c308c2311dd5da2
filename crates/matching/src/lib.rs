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

//! Hemolink Matching Engine
//!
//! This crate matches incoming blood-unit requests against distributed
//! branch inventory using geographic proximity, and defers unmet demand
//! into durable per-category backorder queues that a periodic sweep
//! reconciles against fresh supply.
//!
//! Architecture:
//! - Geo-proximity resolver over the read-only location dataset
//! - Inventory ledger with per-record atomic decrements
//! - One FIFO backorder queue per blood category, with dedup on append
//! - Synchronous matching engine returning a definite outcome per request
//! - Expiry & reconciliation sweeper running on a fixed schedule
//! - Bounded notification queue consumed by a separate worker

pub mod config;
pub mod engine;
pub mod geo;
pub mod ledger;
pub mod logging;
pub mod notify;
pub mod store;
pub mod sweeper;
pub mod types;

pub use engine::{EngineError, MatchEngine};
pub use geo::{LocationIndex, SEARCH_RADIUS_METERS, haversine_meters};
pub use ledger::{InventoryLedger, LedgerError, MemoryInventoryLedger, StockView};
pub use notify::{
	LogNotifier, Notification, Notifier, NotifyError, NotifyQueue, NotifyReceiver, NotifySender,
	NotifyWorker,
};
pub use store::{BackorderStore, FileBackorderStore, MemoryBackorderStore, StoreError};
pub use sweeper::{SweepReport, SweepScheduler, SweepSchedulerConfig, Sweeper};
pub use types::*;
