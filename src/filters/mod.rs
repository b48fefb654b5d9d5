//! Signal-processing stages: fan-out and fan-in plus per-sample transforms.

pub mod channel_selector;
pub mod edge_finder;
pub mod inverter;
pub mod merger;
pub mod multiplexer;
pub mod outlier_buster;
pub mod schmitt_trigger;
pub mod splitter;

pub use channel_selector::ChannelSelector;
pub use edge_finder::EdgeFinder;
pub use inverter::Inverter;
pub use merger::Merger;
pub use multiplexer::Multiplexer;
pub use outlier_buster::OutlierBuster;
pub use schmitt_trigger::SchmittTrigger;
pub use splitter::Splitter;
