//! Audio/video call signaling: device checks, the media channel seam, and
//! the shared call session record both clients coordinate through.

pub mod coordinator;
pub mod device;
pub mod rtc;

pub use coordinator::{CallCoordinator, CallSignal, CallState};
pub use device::SystemDevices;
pub use rtc::RtcChannel;
