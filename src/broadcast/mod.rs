pub mod hub;

pub use hub::{BroadcastHub, PublishReport, Subscription};
