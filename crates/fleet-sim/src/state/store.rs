//! In-memory state store using DashMap.

use dashmap::DashMap;
use fleet_core::{Telemetry, Zone};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::RwLock;

use crate::error::SinkError;
use crate::sink::TelemetrySink;

/// Latest telemetry per drone plus the operator's zones.
pub struct FleetState {
    latest: DashMap<String, Telemetry>,
    zones: DashMap<String, Zone>,
    active_zone: RwLock<Option<String>>,
    updates: AtomicU64,
}

impl Default for FleetState {
    fn default() -> Self {
        Self::new()
    }
}

impl FleetState {
    pub fn new() -> Self {
        Self {
            latest: DashMap::new(),
            zones: DashMap::new(),
            active_zone: RwLock::new(None),
            updates: AtomicU64::new(0),
        }
    }

    /// Store a telemetry record, replacing the previous one for that drone.
    pub fn record(&self, telemetry: &Telemetry) {
        self.latest
            .insert(telemetry.drone_id.clone(), telemetry.clone());
        self.updates.fetch_add(1, Ordering::Relaxed);
    }

    pub fn latest(&self, drone_id: &str) -> Option<Telemetry> {
        self.latest.get(drone_id).map(|r| r.value().clone())
    }

    /// Latest telemetry of every drone, ordered by drone id.
    pub fn all_latest(&self) -> Vec<Telemetry> {
        let mut all: Vec<Telemetry> = self.latest.iter().map(|r| r.value().clone()).collect();
        all.sort_by(|a, b| a.drone_id.cmp(&b.drone_id));
        all
    }

    pub fn remove_drone(&self, drone_id: &str) -> Option<Telemetry> {
        self.latest.remove(drone_id).map(|(_, t)| t)
    }

    /// Total records stored since creation.
    pub fn update_count(&self) -> u64 {
        self.updates.load(Ordering::Relaxed)
    }

    // ========== ZONES ==========

    /// Register a zone and make it active.
    ///
    /// Returns false (and changes nothing) if a zone with the same id exists.
    pub fn add_zone(&self, zone: Zone) -> bool {
        let zone_id = zone.id.clone();
        if self.zones.contains_key(&zone_id) {
            return false;
        }
        self.zones.insert(zone_id.clone(), zone);
        if let Ok(mut active) = self.active_zone.write() {
            *active = Some(zone_id);
        }
        true
    }

    /// Delete a zone, clearing the active selection if it pointed at it.
    pub fn remove_zone(&self, zone_id: &str) -> Option<Zone> {
        let removed = self.zones.remove(zone_id).map(|(_, zone)| zone);
        if removed.is_some() {
            if let Ok(mut active) = self.active_zone.write() {
                if active.as_deref() == Some(zone_id) {
                    *active = None;
                }
            }
        }
        removed
    }

    pub fn zone(&self, zone_id: &str) -> Option<Zone> {
        self.zones.get(zone_id).map(|r| r.value().clone())
    }

    /// All zones, oldest first.
    pub fn zones(&self) -> Vec<Zone> {
        let mut zones: Vec<Zone> = self.zones.iter().map(|r| r.value().clone()).collect();
        zones.sort_by(|a, b| a.created_at.cmp(&b.created_at).then(a.id.cmp(&b.id)));
        zones
    }

    pub fn set_active_zone(&self, zone_id: &str) -> bool {
        if !self.zones.contains_key(zone_id) {
            return false;
        }
        match self.active_zone.write() {
            Ok(mut active) => {
                *active = Some(zone_id.to_string());
                true
            }
            Err(_) => false,
        }
    }

    pub fn active_zone(&self) -> Option<Zone> {
        let zone_id = self.active_zone.read().ok()?.clone()?;
        self.zone(&zone_id)
    }

    pub fn clear_zones(&self) {
        self.zones.clear();
        if let Ok(mut active) = self.active_zone.write() {
            *active = None;
        }
    }
}

impl TelemetrySink for FleetState {
    fn publish(&self, telemetry: &Telemetry) -> Result<(), SinkError> {
        self.record(telemetry);
        Ok(())
    }
}
