use std::time::Duration;

use time::OffsetDateTime;

pub trait TimeProvider: Clone + Send + Sync + 'static {
    type Sleep<'a>: Future<Output = ()> + Send + 'a
    where
        Self: 'a;

    fn now(&self) -> OffsetDateTime;
    fn sleep<'a>(&'a self, duration: Duration) -> Self::Sleep<'a>;

    /// Milliseconds since the Unix epoch, the unit durable storage uses.
    fn now_millis(&self) -> i64 {
        (self.now().unix_timestamp_nanos() / 1_000_000) as i64
    }
}
