//! Demo location manager
//!
//! Locations are client-only records: they are validated here, kept as one
//! JSON array in the local store and never sent to the backend.

use chrono::{DateTime, Utc};
use log::{debug, info};
use serde::{Deserialize, Serialize};

use crate::error::Error;
use crate::storage::{keys, LocalStore};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LocationType {
    #[default]
    Intersection,
    Highway,
    Bridge,
    Tunnel,
    Roundabout,
    Custom,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrafficLevel {
    Light,
    #[default]
    Normal,
    Moderate,
    Heavy,
}

/// A monitored point on the map
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Location {
    /// Creation time in epoch milliseconds, unique within the list
    pub id: i64,
    pub name: String,
    pub address: String,
    pub latitude: f64,
    pub longitude: f64,
    #[serde(rename = "type", default)]
    pub location_type: LocationType,
    #[serde(default)]
    pub priority: Priority,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub capacity: String,
    #[serde(default)]
    pub current_traffic: TrafficLevel,
    pub date_added: DateTime<Utc>,
    pub last_updated: DateTime<Utc>,
}

impl Location {
    /// Coordinates formatted to six decimals, as shown in the location list
    pub fn coordinates_label(&self) -> String {
        format!("{:.6}, {:.6}", self.latitude, self.longitude)
    }
}

/// Location form contents, before validation
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LocationDraft {
    pub name: String,
    pub address: String,
    pub latitude: String,
    pub longitude: String,
    #[serde(rename = "type")]
    pub location_type: LocationType,
    pub priority: Priority,
    pub description: String,
    pub capacity: String,
    pub current_traffic: TrafficLevel,
}

impl LocationDraft {
    pub fn new(
        name: impl Into<String>,
        address: impl Into<String>,
        latitude: impl Into<String>,
        longitude: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            address: address.into(),
            latitude: latitude.into(),
            longitude: longitude.into(),
            ..Default::default()
        }
    }

    /// Check the form and return the parsed `(latitude, longitude)`
    pub fn validate(&self) -> Result<(f64, f64), Error> {
        if self.name.trim().is_empty() {
            return Err(Error::validation("Location name is required"));
        }
        if self.address.trim().is_empty() {
            return Err(Error::validation("Address is required"));
        }
        if self.latitude.trim().is_empty() || self.longitude.trim().is_empty() {
            return Err(Error::validation(
                "Both latitude and longitude are required",
            ));
        }

        let latitude = parse_coordinate(&self.latitude, 90.0)
            .ok_or_else(|| Error::validation("Latitude must be between -90 and 90"))?;
        let longitude = parse_coordinate(&self.longitude, 180.0)
            .ok_or_else(|| Error::validation("Longitude must be between -180 and 180"))?;

        Ok((latitude, longitude))
    }

    fn into_location(
        self,
        id: i64,
        coordinates: (f64, f64),
        date_added: DateTime<Utc>,
        now: DateTime<Utc>,
    ) -> Location {
        Location {
            id,
            name: self.name,
            address: self.address,
            latitude: coordinates.0,
            longitude: coordinates.1,
            location_type: self.location_type,
            priority: self.priority,
            description: self.description,
            capacity: self.capacity,
            current_traffic: self.current_traffic,
            date_added,
            last_updated: now,
        }
    }
}

impl From<&Location> for LocationDraft {
    fn from(location: &Location) -> Self {
        Self {
            name: location.name.clone(),
            address: location.address.clone(),
            latitude: location.latitude.to_string(),
            longitude: location.longitude.to_string(),
            location_type: location.location_type,
            priority: location.priority,
            description: location.description.clone(),
            capacity: location.capacity.clone(),
            current_traffic: location.current_traffic,
        }
    }
}

fn parse_coordinate(raw: &str, limit: f64) -> Option<f64> {
    let value = raw.trim().parse::<f64>().ok()?;
    (-limit..=limit).contains(&value).then_some(value)
}

/// Client-side CRUD over the stored location list.
///
/// Every mutation is written to the store before it becomes visible. Other
/// processes sharing the store are not locked out: the last writer wins.
pub struct LocationManager {
    store: LocalStore,
    locations: Vec<Location>,
}

impl LocationManager {
    /// Load the saved list from `store`
    pub fn load(store: LocalStore) -> Result<Self, Error> {
        let locations = store
            .get_json::<Vec<Location>>(keys::LOCATIONS)?
            .unwrap_or_default();
        debug!("Loaded {} saved locations", locations.len());
        Ok(Self { store, locations })
    }

    /// Re-read the list, picking up writes made elsewhere
    pub fn reload(&mut self) -> Result<(), Error> {
        self.locations = self
            .store
            .get_json::<Vec<Location>>(keys::LOCATIONS)?
            .unwrap_or_default();
        Ok(())
    }

    pub fn list(&self) -> &[Location] {
        &self.locations
    }

    pub fn get(&self, id: i64) -> Option<&Location> {
        self.locations.iter().find(|l| l.id == id)
    }

    /// Form contents for editing an existing location
    pub fn draft_for(&self, id: i64) -> Option<LocationDraft> {
        self.get(id).map(LocationDraft::from)
    }

    pub fn add(&mut self, draft: LocationDraft) -> Result<Location, Error> {
        let coordinates = draft.validate()?;
        let now = Utc::now();
        let location = draft.into_location(self.next_id(now), coordinates, now, now);

        let mut updated = self.locations.clone();
        updated.push(location.clone());
        self.commit(updated)?;
        info!("Location added: {}", location.name);
        Ok(location)
    }

    /// Replace a location's fields, keeping its id and creation date
    pub fn update(&mut self, id: i64, draft: LocationDraft) -> Result<Location, Error> {
        let coordinates = draft.validate()?;
        let existing = self
            .get(id)
            .ok_or_else(|| Error::general(format!("Location {} not found", id)))?;
        let location = draft.into_location(id, coordinates, existing.date_added, Utc::now());

        let updated = self
            .locations
            .iter()
            .map(|l| if l.id == id { location.clone() } else { l.clone() })
            .collect();
        self.commit(updated)?;
        info!("Location updated: {}", location.name);
        Ok(location)
    }

    /// Returns whether a location was removed
    pub fn delete(&mut self, id: i64) -> Result<bool, Error> {
        if self.get(id).is_none() {
            return Ok(false);
        }
        let updated = self
            .locations
            .iter()
            .filter(|l| l.id != id)
            .cloned()
            .collect();
        self.commit(updated)?;
        info!("Location {} deleted", id);
        Ok(true)
    }

    fn next_id(&self, now: DateTime<Utc>) -> i64 {
        let newest = self.locations.iter().map(|l| l.id).max().unwrap_or(i64::MIN);
        now.timestamp_millis().max(newest.saturating_add(1))
    }

    fn commit(&mut self, locations: Vec<Location>) -> Result<(), Error> {
        self.store.set_json(keys::LOCATIONS, &locations)?;
        self.locations = locations;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_test::assert_ok;

    fn draft(latitude: &str, longitude: &str) -> LocationDraft {
        LocationDraft::new("Main St & 1st Ave", "1 Main St", latitude, longitude)
    }

    fn message(result: Result<(f64, f64), Error>) -> String {
        result.unwrap_err().to_string()
    }

    #[test]
    fn rejects_out_of_range_latitude() {
        assert_eq!(
            message(draft("91", "0").validate()),
            "Latitude must be between -90 and 90"
        );
        assert_eq!(
            message(draft("-90.5", "0").validate()),
            "Latitude must be between -90 and 90"
        );
    }

    #[test]
    fn rejects_out_of_range_or_garbage_longitude() {
        assert_eq!(
            message(draft("0", "180.01").validate()),
            "Longitude must be between -180 and 180"
        );
        assert_eq!(
            message(draft("0", "west").validate()),
            "Longitude must be between -180 and 180"
        );
    }

    #[test]
    fn rejects_nan_coordinates() {
        assert!(draft("NaN", "0").validate().is_err());
    }

    #[test]
    fn checks_required_fields_first() {
        let mut d = draft("45", "-122");
        d.name = "  ".to_string();
        assert_eq!(message(d.validate()), "Location name is required");

        let mut d = draft("45", "-122");
        d.address.clear();
        assert_eq!(message(d.validate()), "Address is required");

        assert_eq!(
            message(draft("", "-122").validate()),
            "Both latitude and longitude are required"
        );
    }

    #[test]
    fn accepts_boundary_coordinates() {
        assert_eq!(draft("90", "-180").validate().unwrap(), (90.0, -180.0));
        assert_eq!(draft(" 45.0 ", "-122.0").validate().unwrap(), (45.0, -122.0));
    }

    #[test]
    fn saved_location_survives_reload_unchanged() {
        let store = LocalStore::memory();
        let mut manager = LocationManager::load(store.clone()).unwrap();

        let mut d = draft("45.0", "-122.0");
        d.location_type = LocationType::Bridge;
        d.priority = Priority::High;
        d.current_traffic = TrafficLevel::Heavy;
        let added = assert_ok!(manager.add(d));

        let reloaded = LocationManager::load(store).unwrap();
        assert_eq!(reloaded.list(), &[added.clone()]);
        assert_eq!(reloaded.list()[0].latitude, 45.0);
        assert_eq!(reloaded.list()[0].longitude, -122.0);
        assert_eq!(added.coordinates_label(), "45.000000, -122.000000");
    }

    #[test]
    fn invalid_draft_is_not_stored() {
        let store = LocalStore::memory();
        let mut manager = LocationManager::load(store.clone()).unwrap();

        assert!(matches!(
            manager.add(draft("91", "0")),
            Err(Error::Validation(_))
        ));
        assert!(manager.list().is_empty());
        assert_eq!(store.get(keys::LOCATIONS).unwrap(), None);
    }

    #[test]
    fn ids_are_unique_even_within_one_millisecond() {
        let mut manager = LocationManager::load(LocalStore::memory()).unwrap();
        let a = manager.add(draft("1", "1")).unwrap();
        let b = manager.add(draft("2", "2")).unwrap();
        assert!(b.id > a.id);
    }

    #[test]
    fn update_keeps_id_and_creation_date() {
        let store = LocalStore::memory();
        let mut manager = LocationManager::load(store.clone()).unwrap();
        let original = manager.add(draft("10", "20")).unwrap();

        let mut edit = manager.draft_for(original.id).unwrap();
        assert_eq!(edit.latitude, "10");
        edit.name = "Renamed".to_string();
        edit.latitude = "11.5".to_string();
        let updated = manager.update(original.id, edit).unwrap();

        assert_eq!(updated.id, original.id);
        assert_eq!(updated.date_added, original.date_added);
        assert!(updated.last_updated >= original.last_updated);
        assert_eq!(updated.latitude, 11.5);

        let reloaded = LocationManager::load(store).unwrap();
        assert_eq!(reloaded.get(original.id).unwrap().name, "Renamed");
    }

    #[test]
    fn update_of_unknown_location_fails() {
        let mut manager = LocationManager::load(LocalStore::memory()).unwrap();
        assert!(manager.update(42, draft("1", "1")).is_err());
    }

    #[test]
    fn delete_removes_and_persists() {
        let store = LocalStore::memory();
        let mut manager = LocationManager::load(store.clone()).unwrap();
        let keep = manager.add(draft("1", "1")).unwrap();
        let removed = manager.add(draft("2", "2")).unwrap();

        assert!(manager.delete(removed.id).unwrap());
        assert!(!manager.delete(removed.id).unwrap());

        let reloaded = LocationManager::load(store).unwrap();
        assert_eq!(reloaded.list().len(), 1);
        assert_eq!(reloaded.list()[0].id, keep.id);
    }

    #[test]
    fn reads_records_written_by_the_browser_app() {
        let store = LocalStore::memory();
        store
            .set(
                keys::LOCATIONS,
                r#"[{"id":1717171717171,"name":"Bridge St","address":"River Rd",
                    "latitude":47.6,"longitude":-122.3,"type":"bridge","priority":"low",
                    "description":"","capacity":"","currentTraffic":"light",
                    "dateAdded":"2024-05-31T16:08:37.171Z","lastUpdated":"2024-05-31T16:08:37.171Z"}]"#,
            )
            .unwrap();

        let manager = LocationManager::load(store).unwrap();
        let location = &manager.list()[0];
        assert_eq!(location.location_type, LocationType::Bridge);
        assert_eq!(location.current_traffic, TrafficLevel::Light);
    }

    #[test]
    fn reload_picks_up_other_writers() {
        let store = LocalStore::memory();
        let mut first = LocationManager::load(store.clone()).unwrap();
        let mut second = LocationManager::load(store).unwrap();

        second.add(draft("3", "3")).unwrap();
        assert!(first.list().is_empty());
        first.reload().unwrap();
        assert_eq!(first.list().len(), 1);
    }
}
