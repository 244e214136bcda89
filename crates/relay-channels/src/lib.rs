pub mod error;
pub mod sink;

pub use error::ChannelError;
pub use sink::ChatSink;
