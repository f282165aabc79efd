//! Delivery-rate estimator (component B): groups packet arrivals into
//! frames, maintains a sliding throughput window, and publishes an atomic
//! [`fathom_core::ReportSnapshot`] alongside the RTT pair read from the
//! probe channel.

pub mod estimator;
pub mod ring;
pub mod trace;

pub use estimator::{DeliveryRateEstimator, CYCLE_WINDOW_US, REPORT_PERIOD_US};
pub use ring::{FrameRecord, FrameRing};
pub use trace::Trace;
