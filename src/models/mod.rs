pub mod error;
pub mod registry;
pub mod shared;
pub mod vehicle;

pub use error::{PersistOp, RegistryError};
pub use registry::{
    CORRUPT_SNAPSHOT_KEY, LotStats, ParkedVehicle, Quote, Receipt, Registry, SNAPSHOT_KEY,
};
pub use shared::SharedRegistry;
pub use vehicle::{BillingPolicy, Elapsed, Vehicle, VehicleId};
