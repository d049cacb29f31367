pub mod bus;
pub use bus::{EntityChange, NotificationBus, RealtimeEvent};
pub mod presence;
pub use presence::PresenceTracker;
pub mod socket;
