//! Port traits defining external boundaries.
//!
//! The harness only ever talks to the outside world through a [`Transport`].
//! Implementations live in `src/adapters/`.

pub mod transport;

pub use transport::{Request, Response, RpcFault, Transport, TransportFuture};
