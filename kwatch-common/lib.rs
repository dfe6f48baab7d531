pub use self::backoff::{RetrySchedule, ThrottleBackoff};

pub mod logging;

mod backoff;
