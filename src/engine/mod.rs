pub mod pipeline;
pub mod stage;
pub mod state;

pub use pipeline::Pipeline;
pub use stage::{Stage, StageEnv};
pub use state::StageState;
