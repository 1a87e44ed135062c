//! Embassy async tasks

pub mod heartbeat;
pub mod link;

pub use heartbeat::heartbeat_task;
pub use link::link_task;
