pub mod guard;
pub mod policy;

pub use guard::{fault_channel, FaultGuard, StageFault};
pub use policy::FaultPolicy;
