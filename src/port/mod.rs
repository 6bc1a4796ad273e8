//! Serial link abstraction.
//!
//! Provides the `SerialLink` / `LinkOpener` traits with hardware and mock
//! implementations, plus port enumeration.

pub mod discovery;
pub mod error;
pub mod mock;
pub mod sync_port;
pub mod traits;

pub use discovery::{list_ports, PortInfo};
pub use error::LinkError;
pub use mock::{MockLink, MockOpener};
pub use sync_port::{HardwareLink, HardwareOpener};
pub use traits::*;
