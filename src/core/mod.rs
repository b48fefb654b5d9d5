pub mod sample;
pub mod stream;
pub mod transform;

pub use sample::{ChannelList, Edge, Sample, Value};
pub use stream::{sample_stream, Liveness, StreamReader, StreamWriter};
pub use transform::{process_batch, Outputs, Transform};
