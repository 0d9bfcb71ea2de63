//! Door controller access.
//!
//! - `traits`: the device control boundary (`DeviceConnector`, `DeviceControl`)
//! - `protocol`: the line-JSON implementation over a serial port
//! - `session`: the zero-or-one open session the controller owns
//! - `mock`: in-memory controller for tests

pub mod error;
pub mod mock;
pub mod protocol;
pub mod session;
pub mod traits;

pub use error::{DeviceError, DeviceResult};
pub use mock::{DeviceCall, MockConnector, MockDoorDevice};
pub use protocol::{SerialDoorConnector, SerialDoorDevice};
pub use session::DeviceSession;
pub use traits::{DeviceConnector, DeviceControl, DoorConfigMap, DoorState, DoorStates};
