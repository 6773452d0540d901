pub mod bootstrap;
pub mod status;

pub use bootstrap::Bisector;
pub use status::{session_status, Decision, SessionStatus};
