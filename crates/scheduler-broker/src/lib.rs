//! Broker transport, wire codec, and reply matching for SchedulerGodX
//! (spec.md §4.1, §4.2).

pub mod channel;
pub mod codec;
pub mod reply_matcher;

pub use channel::{BrokerChannel, Delivery};
pub use reply_matcher::{ReplyMatcher, TransactionalFetch};
