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

use std::collections::{BTreeSet, HashMap};

use hemolink_sdk::{Location, LocationId};

/// Proximity radius shared by the matching engine and the sweeper
pub const SEARCH_RADIUS_METERS: f64 = 50_000.0;

/// Mean Earth radius used by the haversine formula
const EARTH_RADIUS_METERS: f64 = 6_371_000.0;

/// Error returned when the search origin is not in the reference set
#[derive(Debug, Clone, thiserror::Error)]
#[error("Unknown origin location: {0}")]
pub struct UnknownLocation(pub LocationId);

/// Read-only index over the reference location dataset
///
/// Built once at startup from the external geography dataset. Lookups and
/// proximity queries are pure functions over the indexed set; the core
/// never mutates reference locations.
pub struct LocationIndex {
	locations: HashMap<LocationId, Location>,
}

impl LocationIndex {
	pub fn new(locations: impl IntoIterator<Item = Location>) -> Self {
		Self {
			locations: locations
				.into_iter()
				.map(|location| (location.id, location))
				.collect(),
		}
	}

	/// Look up a reference location by id
	pub fn get(&self, id: LocationId) -> Option<&Location> {
		self.locations.get(&id)
	}

	/// Number of indexed locations
	pub fn len(&self) -> usize {
		self.locations.len()
	}

	pub fn is_empty(&self) -> bool {
		self.locations.is_empty()
	}

	/// Locations within `radius_meters` of the origin, inclusive
	///
	/// Computes the great-circle distance from the origin to every
	/// candidate location and keeps those with distance <= radius. The
	/// origin itself is always part of the result. Returns an error when
	/// the origin is not in the reference set; callers must reject such
	/// requests before any state mutation.
	pub fn nearby(
		&self,
		origin: LocationId,
		radius_meters: f64,
	) -> Result<BTreeSet<LocationId>, UnknownLocation> {
		let origin = self.locations.get(&origin).ok_or(UnknownLocation(origin))?;

		Ok(self
			.locations
			.values()
			.filter(|candidate| haversine_meters(origin, candidate) <= radius_meters)
			.map(|candidate| candidate.id)
			.collect())
	}
}

/// Great-circle distance between two locations via the haversine formula
pub fn haversine_meters(a: &Location, b: &Location) -> f64 {
	let lat_a = a.latitude.to_radians();
	let lat_b = b.latitude.to_radians();
	let d_lat = (b.latitude - a.latitude).to_radians();
	let d_lon = (b.longitude - a.longitude).to_radians();

	let h = (d_lat / 2.0).sin().powi(2) + lat_a.cos() * lat_b.cos() * (d_lon / 2.0).sin().powi(2);

	2.0 * EARTH_RADIUS_METERS * h.sqrt().asin()
}

#[cfg(test)]
mod tests {
	use super::*;

	fn location(id: LocationId, latitude: f64, longitude: f64) -> Location {
		Location {
			id,
			region: 1,
			latitude,
			longitude,
		}
	}

	// One degree of latitude is roughly 111.2 km everywhere.
	#[test]
	fn test_haversine_known_distance() {
		let a = location(1, 41.0, 29.0);
		let b = location(2, 42.0, 29.0);

		let distance = haversine_meters(&a, &b);
		assert!((distance - 111_195.0).abs() < 500.0, "got {distance}");
	}

	#[test]
	fn test_nearby_filters_by_radius() {
		// ~0.3 degrees latitude apart is ~33 km; 1 degree is ~111 km
		let index = LocationIndex::new([
			location(1, 41.0, 29.0),
			location(2, 41.3, 29.0),
			location(3, 42.0, 29.0),
		]);

		let eligible = index.nearby(1, SEARCH_RADIUS_METERS).unwrap();
		assert_eq!(eligible, BTreeSet::from([1, 2]));
	}

	#[test]
	fn test_nearby_includes_origin() {
		let index = LocationIndex::new([location(7, 41.0, 29.0)]);

		let eligible = index.nearby(7, 0.0).unwrap();
		assert!(eligible.contains(&7));
	}

	#[test]
	fn test_radius_boundary_is_inclusive() {
		let a = location(1, 41.0, 29.0);
		let b = location(2, 41.5, 29.0);
		let exact = haversine_meters(&a, &b);

		let index = LocationIndex::new([a, b]);
		let eligible = index.nearby(1, exact).unwrap();
		assert!(eligible.contains(&2));
	}

	#[test]
	fn test_unknown_origin_rejected() {
		let index = LocationIndex::new([location(1, 41.0, 29.0)]);

		let result = index.nearby(404, SEARCH_RADIUS_METERS);
		assert!(matches!(result, Err(UnknownLocation(404))));
	}
}
