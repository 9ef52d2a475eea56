pub mod data_stream;
pub(crate) mod json;

pub use data_stream::{DataStreamWriter, StreamClosed, StreamPart};
pub(crate) use json::*;
