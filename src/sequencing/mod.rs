pub mod event;
pub mod notes;
pub mod pattern;
pub mod time;

pub use event::{extract_events, EventEncoder, SequencerEvent};
pub use pattern::{Cell, Pattern, PatternError, DEFAULT_VELOCITY};
pub use time::{TransportTime, STEPS_PER_BAR, STEPS_PER_BEAT};
