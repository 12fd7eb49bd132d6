//! Harness entity model.

pub mod cable;
pub mod colors;
pub mod component;
pub mod connector;
pub mod input;
pub mod mate;
pub mod numbers;
pub mod partnumber;

pub use cable::{Cable, CableCategory, Connection, PinRef, Wire, WireRef, SHIELD_ID};
pub use colors::{MultiColor, SingleColor};
pub use component::{BomCategory, CableMetric, Component, ConnectorMetric, QtyMultiplier};
pub use connector::{Connector, Loop, Pin, Side};
pub use input::HarnessInput;
pub use mate::{ArrowDirection, Mate};
pub use numbers::NumberAndUnit;
pub use partnumber::{PartNumberInfo, PartNumberList};
