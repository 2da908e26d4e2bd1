//! Status resolution from feed messages.

mod service;

pub use service::{
    DEFAULT_HISTORY_LIMIT, DEFAULT_SIGNAL_WINDOW, ResolveOutcome, Resolver, ResolverConfig,
};
