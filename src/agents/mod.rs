//! Background agents
//!
//! Provides the polling agent that keeps a view of an endpoint up to date
//! through the authenticated client.

mod poller;

pub use poller::{PollCallback, PollConfig, PollError, PollSnapshot, PollStatus, PollingAgent};
