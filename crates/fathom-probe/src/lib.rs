//! RTT probe channel: a dedicated UDP ping/echo loop, a ring-buffered RTT
//! sample store, and the windowed min/max queries the rest of the workspace
//! reads from it.

pub mod channel;
pub mod echo;
pub mod socket;
pub mod store;

pub use channel::ProbeChannel;
pub use echo::run_echo_responder;
pub use socket::{DatagramSocket, UdpDatagramSocket};
pub use store::{RttStore, PING_PERIOD_US, RTPROP_WINDOW_SLOTS, STORE_SIZE};
