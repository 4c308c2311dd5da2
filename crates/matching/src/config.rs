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

use std::env;

use serde::{Deserialize, Serialize};

// Logging configuration constants
/// Default log level (can be overridden by RUST_LOG environment variable)
pub const DEFAULT_LOG_LEVEL: &str = "info";

/// Default log directory component name
pub const LOG_COMPONENT_NAME: &str = "matching";

/// Default console output enabled (can be overridden by LOG_TO_CONSOLE environment variable)
pub const DEFAULT_LOG_TO_CONSOLE: bool = false;

// Service configuration constants
/// Default backorder data directory (can be overridden by HEMOLINK_DATA_DIR)
pub const DEFAULT_DATA_DIR: &str = "data/backorders";

/// Default reference file with location coordinates (can be overridden by HEMOLINK_LOCATIONS_FILE)
pub const DEFAULT_LOCATIONS_FILE: &str = "data/locations.json";

/// Default reference file with branch records (can be overridden by HEMOLINK_BRANCHES_FILE)
pub const DEFAULT_BRANCHES_FILE: &str = "data/branches.json";

/// Default interval between sweep passes in seconds (can be overridden by HEMOLINK_SWEEP_INTERVAL_SECS)
pub const DEFAULT_SWEEP_INTERVAL_SECS: u64 = 86_400;

/// Default notification queue capacity (can be overridden by HEMOLINK_NOTIFY_QUEUE_SIZE)
pub const DEFAULT_NOTIFY_QUEUE_SIZE: usize = 1_024;

/// Matching service configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchingConfig {
	/// Directory holding the per-category backorder queue files
	pub data_dir: String,
	/// JSON file with the location directory (ids, coordinates)
	pub locations_file: String,
	/// JSON file with the branch directory (ids, home locations)
	pub branches_file: String,
	/// Optional JSON file with seed donations loaded into the ledger at startup
	pub inventory_file: Option<String>,
	/// Interval between sweep passes (seconds)
	pub sweep_interval_secs: u64,
	/// Notification queue capacity
	pub notify_queue_size: usize,
}

impl Default for MatchingConfig {
	fn default() -> Self {
		Self {
			data_dir: DEFAULT_DATA_DIR.to_string(),
			locations_file: DEFAULT_LOCATIONS_FILE.to_string(),
			branches_file: DEFAULT_BRANCHES_FILE.to_string(),
			inventory_file: None,
			sweep_interval_secs: DEFAULT_SWEEP_INTERVAL_SECS,
			notify_queue_size: DEFAULT_NOTIFY_QUEUE_SIZE,
		}
	}
}

impl MatchingConfig {
	/// Load configuration from environment variables with defaults
	pub fn from_env() -> Self {
		dotenv::dotenv().ok();

		let defaults = Self::default();

		let data_dir = env::var("HEMOLINK_DATA_DIR").unwrap_or(defaults.data_dir);
		let locations_file = env::var("HEMOLINK_LOCATIONS_FILE").unwrap_or(defaults.locations_file);
		let branches_file = env::var("HEMOLINK_BRANCHES_FILE").unwrap_or(defaults.branches_file);
		let inventory_file = env::var("HEMOLINK_INVENTORY_FILE").ok();

		let sweep_interval_secs = env::var("HEMOLINK_SWEEP_INTERVAL_SECS")
			.ok()
			.and_then(|v| v.parse().ok())
			.unwrap_or(DEFAULT_SWEEP_INTERVAL_SECS);

		let notify_queue_size = env::var("HEMOLINK_NOTIFY_QUEUE_SIZE")
			.ok()
			.and_then(|v| v.parse().ok())
			.unwrap_or(DEFAULT_NOTIFY_QUEUE_SIZE);

		Self {
			data_dir,
			locations_file,
			branches_file,
			inventory_file,
			sweep_interval_secs,
			notify_queue_size,
		}
	}

	/// Load configuration from file, with environment variables taking precedence
	#[allow(dead_code)]
	pub fn from_file(path: &str) -> Result<Self, config::ConfigError> {
		let cfg = config::Config::builder()
			.add_source(config::File::with_name(path))
			.add_source(config::Environment::with_prefix("HEMOLINK"))
			.build()?;

		cfg.try_deserialize()
	}
}
