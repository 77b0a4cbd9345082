use bincode::{Decode, Encode};
use std::collections::HashSet;
use std::sync::Arc;
use std::time::SystemTime;

use super::error::{PersistOp, RegistryError};
use super::vehicle::{BillingPolicy, Elapsed, Vehicle, VehicleId};
use crate::clock::Clock;
use crate::storage::KeyValueStore;

/// Storage key holding the registry snapshot
pub const SNAPSHOT_KEY: &str = "vehicles";

/// Storage key an undecodable snapshot is copied to before it gets overwritten
pub const CORRUPT_SNAPSHOT_KEY: &str = "vehicles.corrupted";

/// Refuse to decode snapshots claiming more than this many bytes of payload
const SNAPSHOT_LIMIT: usize = 64 * 1024 * 1024;

/// Persisted form of the registry
#[derive(Debug, Clone, PartialEq, Eq, Decode)]
struct Snapshot {
    next_id: u64,
    vehicles: Vec<Vehicle>,
}

/// Borrowed view of the registry, encoded identically to `Snapshot`
#[derive(Encode)]
struct SnapshotRef<'a> {
    next_id: u64,
    vehicles: &'a [Vehicle],
}

impl Snapshot {
    fn from_bytes(bytes: &[u8]) -> Result<Self, String> {
        let config = bincode::config::standard().with_limit::<SNAPSHOT_LIMIT>();
        let (mut snapshot, read): (Snapshot, usize) =
            bincode::decode_from_slice(bytes, config).map_err(|e| e.to_string())?;

        if read != bytes.len() {
            return Err(format!(
                "{} trailing bytes after snapshot",
                bytes.len() - read
            ));
        }

        let mut seen = HashSet::with_capacity(snapshot.vehicles.len());
        for vehicle in &snapshot.vehicles {
            if !seen.insert(vehicle.id()) {
                return Err(format!("duplicate vehicle id {}", vehicle.id()));
            }
        }

        // Never hand out an id that is already parked
        if let Some(max_id) = snapshot.vehicles.iter().map(|v| v.id().0).max()
            && snapshot.next_id <= max_id
        {
            log::warn!(
                "Snapshot next_id {} not above highest id {}, repairing",
                snapshot.next_id,
                max_id
            );
            snapshot.next_id = max_id
                .checked_add(1)
                .ok_or_else(|| format!("vehicle id {} leaves no room for new ids", max_id))?;
        }

        Ok(snapshot)
    }
}

/// One row of the live listing
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParkedVehicle {
    /// Current position (unstable across removals)
    pub position: usize,
    pub vehicle: Vehicle,
    pub elapsed: Elapsed,
    pub cost: u64,
}

/// Live price of a parked vehicle, without removing it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Quote {
    pub position: usize,
    pub vehicle: Vehicle,
    pub elapsed: Elapsed,
    pub cost: u64,
    pub as_of: SystemTime,
}

/// Final bill for a vehicle that left the lot
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Receipt {
    pub vehicle: Vehicle,
    pub elapsed: Elapsed,
    pub cost: u64,
    pub exit_time: SystemTime,
}

/// Totals for the lot as of one instant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct LotStats {
    pub parked: usize,
    pub accrued: u64,
}

/// The set of vehicles currently parked, in arrival order
///
/// Every successful `register`/`remove` writes the full snapshot back to the
/// store before returning. Write failures never undo the in-memory change;
/// they are logged and kept in `persistence_fault` until a later save succeeds.
pub struct Registry {
    vehicles: Vec<Vehicle>,
    /// Next id to assign (monotonic counter, survives restarts)
    next_id: u64,
    store: Arc<dyn KeyValueStore>,
    clock: Arc<dyn Clock>,
    policy: BillingPolicy,
    fault: Option<RegistryError>,
}

impl Registry {
    /// Open the registry, restoring whatever snapshot the store holds
    /// A missing or unreadable snapshot yields an empty registry, never an error
    pub fn open(store: Arc<dyn KeyValueStore>, clock: Arc<dyn Clock>) -> Self {
        let mut registry = Registry {
            vehicles: Vec::new(),
            next_id: 1,
            store,
            clock,
            policy: BillingPolicy::default(),
            fault: None,
        };
        registry.restore();
        registry
    }

    /// Replace the rate card used for quotes, listings and receipts
    pub fn with_policy(mut self, policy: BillingPolicy) -> Self {
        self.policy = policy;
        self
    }

    fn restore(&mut self) {
        let bytes = match self.store.get(SNAPSHOT_KEY) {
            Ok(Some(bytes)) => bytes,
            Ok(None) => {
                log::info!("No registry snapshot found, starting with an empty lot");
                return;
            }
            Err(e) => {
                log::warn!("Failed to read registry snapshot, starting empty: {:#}", e);
                self.fault = Some(RegistryError::persistence(PersistOp::Load, format!("{:#}", e)));
                return;
            }
        };

        match Snapshot::from_bytes(&bytes) {
            Ok(snapshot) => {
                self.vehicles = snapshot.vehicles;
                self.next_id = snapshot.next_id;
                log::debug!("Restored {} parked vehicles", self.vehicles.len());
            }
            Err(reason) => {
                log::warn!(
                    "Registry snapshot corrupted, backing up to {:?} and starting empty: {}",
                    CORRUPT_SNAPSHOT_KEY,
                    reason
                );
                if let Err(backup_err) = self.store.set(CORRUPT_SNAPSHOT_KEY, &bytes) {
                    log::error!("Failed to backup corrupted snapshot: {:#}", backup_err);
                }
                self.fault = Some(RegistryError::persistence(PersistOp::Decode, reason));
            }
        }
    }

    /// Write the full snapshot to the store
    pub fn persist(&mut self) -> Result<(), RegistryError> {
        let snapshot = SnapshotRef {
            next_id: self.next_id,
            vehicles: &self.vehicles,
        };

        let result = bincode::encode_to_vec(&snapshot, bincode::config::standard())
            .map_err(|e| RegistryError::persistence(PersistOp::Save, e))
            .and_then(|bytes| {
                self.store
                    .set(SNAPSHOT_KEY, &bytes)
                    .map_err(|e| RegistryError::persistence(PersistOp::Save, format!("{:#}", e)))
            });

        match result {
            Ok(()) => {
                log::debug!("Saved {} parked vehicles", self.vehicles.len());
                self.fault = None;
                Ok(())
            }
            Err(e) => {
                self.fault = Some(e.clone());
                Err(e)
            }
        }
    }

    /// Persist after a mutation; failure is reported but never rolls back
    fn commit(&mut self) {
        if let Err(e) = self.persist() {
            log::error!("{}; in-memory registry remains authoritative", e);
        }
    }

    /// Park a new vehicle, stamped with the current time
    pub fn register(
        &mut self,
        plate: &str,
        brand: &str,
        model: &str,
        color: &str,
    ) -> Result<Vehicle, RegistryError> {
        let fields = [
            ("plate", plate.trim()),
            ("brand", brand.trim()),
            ("model", model.trim()),
            ("color", color.trim()),
        ];

        let blank: Vec<&'static str> = fields
            .iter()
            .filter(|(_, value)| value.is_empty())
            .map(|(name, _)| *name)
            .collect();
        if !blank.is_empty() {
            return Err(RegistryError::Validation { fields: blank });
        }

        let [plate, brand, model, color] = fields.map(|(_, value)| value.to_string());

        if self.vehicles.iter().any(|v| v.plate() == plate) {
            log::warn!("Plate {} is already parked, registering another entry", plate);
        }

        let next_id = self
            .next_id
            .checked_add(1)
            .ok_or(RegistryError::IdsExhausted)?;
        let id = VehicleId(self.next_id);
        self.next_id = next_id;

        let vehicle = Vehicle::new(id, plate, brand, model, color, self.clock.now());
        self.vehicles.push(vehicle.clone());
        log::info!("Registered {} ({}) as {}", vehicle.plate(), vehicle.model(), id);

        self.commit();
        Ok(vehicle)
    }

    /// Every parked vehicle with its live elapsed time and cost
    pub fn list(&self) -> Vec<ParkedVehicle> {
        let now = self.clock.now();
        self.vehicles
            .iter()
            .enumerate()
            .map(|(position, vehicle)| ParkedVehicle {
                position,
                vehicle: vehicle.clone(),
                elapsed: vehicle.elapsed(now),
                cost: vehicle.cost_with(&self.policy, now),
            })
            .collect()
    }

    /// Live price for the vehicle at `position`
    pub fn quote(&self, position: usize) -> Result<Quote, RegistryError> {
        let vehicle = self.get(position).ok_or(RegistryError::PositionOutOfRange {
            position,
            len: self.vehicles.len(),
        })?;

        let now = self.clock.now();
        Ok(Quote {
            position,
            vehicle: vehicle.clone(),
            elapsed: vehicle.elapsed(now),
            cost: vehicle.cost_with(&self.policy, now),
            as_of: now,
        })
    }

    /// Live price for the vehicle with the given id
    pub fn quote_id(&self, id: VehicleId) -> Result<Quote, RegistryError> {
        let position = self
            .position_of(id)
            .ok_or(RegistryError::UnknownVehicle(id))?;
        self.quote(position)
    }

    /// Bill and evict the vehicle at `position`
    pub fn remove(&mut self, position: usize) -> Result<Receipt, RegistryError> {
        let len = self.vehicles.len();
        if position >= len {
            return Err(RegistryError::PositionOutOfRange { position, len });
        }

        let exit_time = self.clock.now();
        let vehicle = self.vehicles.remove(position);
        let receipt = Receipt {
            elapsed: vehicle.elapsed(exit_time),
            cost: vehicle.cost_with(&self.policy, exit_time),
            vehicle,
            exit_time,
        };
        log::info!(
            "Checked out {} ({}) after {}, charged {}",
            receipt.vehicle.plate(),
            receipt.vehicle.id(),
            receipt.elapsed,
            receipt.cost
        );

        self.commit();
        Ok(receipt)
    }

    /// Bill and evict the vehicle with the given id
    pub fn remove_id(&mut self, id: VehicleId) -> Result<Receipt, RegistryError> {
        let position = self
            .position_of(id)
            .ok_or(RegistryError::UnknownVehicle(id))?;
        self.remove(position)
    }

    /// Current position of a vehicle
    pub fn position_of(&self, id: VehicleId) -> Option<usize> {
        self.vehicles.iter().position(|v| v.id() == id)
    }

    pub fn get(&self, position: usize) -> Option<&Vehicle> {
        self.vehicles.get(position)
    }

    /// Parked vehicles in arrival order
    pub fn vehicles(&self) -> &[Vehicle] {
        &self.vehicles
    }

    pub fn len(&self) -> usize {
        self.vehicles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.vehicles.is_empty()
    }

    /// Last storage failure, cleared by the next successful save
    pub fn persistence_fault(&self) -> Option<&RegistryError> {
        self.fault.as_ref()
    }

    /// Occupancy and total fees accrued so far
    pub fn stats(&self) -> LotStats {
        let now = self.clock.now();
        LotStats {
            parked: self.vehicles.len(),
            accrued: self
                .vehicles
                .iter()
                .map(|v| v.cost_with(&self.policy, now))
                .fold(0u64, u64::saturating_add),
        }
    }
}
