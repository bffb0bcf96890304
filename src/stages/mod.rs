//! Demo source and sink stages used by the default configuration and the
//! test suite. Neither is core: they exist to give the factory something
//! concrete to wire up end to end.

pub mod sink;
pub mod source;

pub use sink::LogSink;
pub use source::TickerSource;
