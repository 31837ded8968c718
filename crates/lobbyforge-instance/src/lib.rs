//! Game instance tier for Lobbyforge: the registry of world/town/arena
//! servers, the provisioning contract, and placement policy.
//!
//! - [`InstanceRegistry`] — request → instance records with instance-id
//!   and map-name indexes, waiting/running lists, and per-instance chat
//!   channels.
//! - [`Provisioner`] — the external boot-a-server contract;
//!   [`MockProvisioner`] records requests for tests and the demo.
//! - [`Placement`] — outcome of putting a player on a map: joined a live
//!   instance, joined a booting one, or triggered a new registration.

mod error;
mod instance;
mod provision;
mod registry;

pub use error::InstanceError;
pub use instance::{GameInstance, InstanceConfig, InstanceState, launch_args};
pub use provision::{MockProvisioner, ProvisionRequest, Provisioner};
pub use registry::{
    InstanceInfo, InstanceRegistry, Placement, ReadyInstance, Unregistered, occupancy,
};
