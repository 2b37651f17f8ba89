//! Client-side mirror of server-authoritative game data.
//!
//! Every domain (backpack, operators, stages, player) follows the same
//! pattern: request functions encode parameters and hand them to a
//! [`MessageSink`](network_client::MessageSink); response handlers registered
//! with the [`Dispatcher`](network_client::Dispatcher) decode the payload,
//! apply it to a local cache as full snapshot or incremental merge, and only
//! then publish a [`SyncEvent`].
//!
//! [`GameSync`] wires all of it together for one server session.

pub mod cache;
pub mod events;
pub mod inventory;
pub mod lookup;
mod model;
pub mod profile;
pub mod roster;
pub mod session;
pub mod stage;

pub use cache::{ApplyReport, GroupedCache, KeyedCache, Record, SingleRecordCache};
pub use events::{Notifier, SyncEvent};
pub use inventory::{InventoryModel, ItemRecord};
pub use lookup::{ConfigTables, ItemGroupLookup, LookupError, StageGroupLookup};
pub use model::SyncPhase;
pub use profile::{PlayerProfile, ProfileModel};
pub use roster::{ItemCost, OperatorRecord, RosterModel, SkillRecord};
pub use session::GameSync;
pub use stage::{StageModel, StageRecord};

pub type ItemId = i32;
pub type BackpackTypeId = i32;
pub type OperatorId = i32;
pub type StageId = i32;
pub type ChapterId = i32;
pub type PlayerId = i32;
