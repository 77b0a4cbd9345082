use std::sync::{Arc, Mutex, MutexGuard};

use super::error::RegistryError;
use super::registry::{LotStats, ParkedVehicle, Quote, Receipt, Registry};
use super::vehicle::{Vehicle, VehicleId};

/// Cloneable handle for driving one registry from several threads
///
/// Each operation, including the snapshot write that follows a mutation,
/// runs under a single lock, so the store only ever sees whole operations.
#[derive(Clone)]
pub struct SharedRegistry {
    inner: Arc<Mutex<Registry>>,
}

impl SharedRegistry {
    pub fn new(registry: Registry) -> Self {
        SharedRegistry {
            inner: Arc::new(Mutex::new(registry)),
        }
    }

    /// Lock the registry for a multi-step sequence (e.g. quote then remove)
    /// Registry methods never panic mid-mutation, so a poisoned lock is safe to reuse
    pub fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(|e| e.into_inner())
    }

    pub fn register(
        &self,
        plate: &str,
        brand: &str,
        model: &str,
        color: &str,
    ) -> Result<Vehicle, RegistryError> {
        self.lock().register(plate, brand, model, color)
    }

    pub fn list(&self) -> Vec<ParkedVehicle> {
        self.lock().list()
    }

    pub fn quote(&self, position: usize) -> Result<Quote, RegistryError> {
        self.lock().quote(position)
    }

    pub fn quote_id(&self, id: VehicleId) -> Result<Quote, RegistryError> {
        self.lock().quote_id(id)
    }

    pub fn remove(&self, position: usize) -> Result<Receipt, RegistryError> {
        self.lock().remove(position)
    }

    pub fn remove_id(&self, id: VehicleId) -> Result<Receipt, RegistryError> {
        self.lock().remove_id(id)
    }

    pub fn stats(&self) -> LotStats {
        self.lock().stats()
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::SystemClock;
    use crate::storage::MemoryStore;
    use std::collections::HashSet;
    use std::thread;

    #[test]
    fn test_concurrent_registers_all_persisted() {
        let store = Arc::new(MemoryStore::new());
        let shared = SharedRegistry::new(Registry::open(store.clone(), Arc::new(SystemClock)));

        let handles: Vec<_> = (0..8)
            .map(|t| {
                let shared = shared.clone();
                thread::spawn(move || {
                    for i in 0..25 {
                        shared
                            .register(&format!("P{}-{}", t, i), "Brand", "Model", "Color")
                            .unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        assert_eq!(shared.len(), 200);

        let ids: HashSet<_> = shared.list().iter().map(|p| p.vehicle.id()).collect();
        assert_eq!(ids.len(), 200);

        let reopened = Registry::open(store, Arc::new(SystemClock));
        assert_eq!(reopened.len(), 200);
    }

    #[test]
    fn test_concurrent_removals_never_double_bill() {
        let store = Arc::new(MemoryStore::new());
        let shared = SharedRegistry::new(Registry::open(store, Arc::new(SystemClock)));
        for i in 0..50 {
            shared.register(&format!("P{}", i), "b", "m", "c").unwrap();
        }

        let handles: Vec<_> = (0..4)
            .map(|_| {
                let shared = shared.clone();
                thread::spawn(move || {
                    let mut billed = Vec::new();
                    while let Ok(receipt) = shared.remove(0) {
                        billed.push(receipt.vehicle.id());
                    }
                    billed
                })
            })
            .collect();

        let mut all = Vec::new();
        for handle in handles {
            all.extend(handle.join().unwrap());
        }

        assert!(shared.is_empty());
        assert_eq!(all.len(), 50);
        assert_eq!(all.iter().collect::<HashSet<_>>().len(), 50);
    }
}
