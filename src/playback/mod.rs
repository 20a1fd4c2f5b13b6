pub mod clock;
pub mod heartbeat;
pub mod simulator;
pub mod types;

pub use clock::{Clock, TokioClock};
pub use heartbeat::{HeartbeatBuilder, HeartbeatRequest, PLAYBACK_SPEED};
pub use simulator::PlaybackSimulator;
pub use types::*;
