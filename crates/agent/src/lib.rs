//! Tutoring session orchestration
//!
//! Features:
//! - Step reveal state machine with paced, cancellable animation
//! - Whiteboard rendering glue over the math typesetting capability
//! - The session orchestrator tying recognition, the model boundary and
//!   speech output together
//! - Broadcast session events for UI consumers

pub mod events;
pub mod reveal;
pub mod session;
pub mod whiteboard;

pub use events::SessionEvent;
pub use reveal::{RevealController, RevealEvent};
pub use session::TutorSession;
pub use whiteboard::{MountContent, MountPoint, WhiteboardRenderer};
