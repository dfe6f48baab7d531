pub use self::dedup::DedupCache;
pub use self::dispatcher::{DEFAULT_DISPATCH_WORKERS, Dispatcher, DispatcherContext};
pub use self::notifier::{Notifier, NotifyJob};
pub use self::sink::SinkError;

mod dedup;
mod dispatcher;
mod notifier;
mod script;
mod sink;
