//! Transaction primitives: the data model and stage contract that every
//! source, processor, buffer and sink is built on.

pub mod close;
pub mod message;
pub mod response;
pub mod stage;
pub mod transaction;

pub use close::CloseSignal;
pub use message::Message;
pub use response::{ErrorBatch, Response};
pub use stage::{Consumer, Producer, Stage, TRANSACTION_CHAN_CAPACITY};
pub use transaction::Transaction;
