mod body;
mod protocol_adapter;

pub use body::*;
pub use protocol_adapter::*;
