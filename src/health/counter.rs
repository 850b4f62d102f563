/// Common surface shared by the periodic and threshold counters (§4.J).
/// `healthy()` is a constant-time read; `start`/`stop` govern whichever
/// background rollover (if any) the concrete counter drives.
pub trait HealthCounter: Send + Sync {
    fn name(&self) -> &str;
    fn healthy(&self) -> bool;
    fn notify_event(&self);
    fn reset(&self, value: i64);
    fn start(&self);
    /// Non-draining: stops the background rollover (if any) without
    /// waiting on or flushing anything in flight.
    fn stop(&self);
}
