//! IPC to the decision service.
//!
//! The transport trait is the seam between the verdict logic and the
//! socket; production uses a fresh Unix stream socket per check.

pub mod channel;

pub use channel::{ChannelConfig, ChannelState, DecisionTransport, UnixDecisionChannel};
