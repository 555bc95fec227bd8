//! Interactive point tester.
//!
//! Moves a probe around the field with the arrow keys and reports which zones
//! contain it, next to a character map of the field. Membership is exact
//! predicate evaluation, not the cached hull.

mod driver;
mod map;
mod panel;
mod state;
mod width;

pub use driver::{DriverResult, ProbeDriver, ProbeDriverError};
pub use map::FieldMap;
pub use panel::ProbePanel;
pub use state::{MAX_STEP, MIN_STEP, ProbeKey, ProbeState, STEP_FACTOR};
pub use width::{display_width, pad_to};
