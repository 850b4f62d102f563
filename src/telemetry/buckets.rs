// Bucket boundaries for the latency histogram (§4.D), in milliseconds.
// Monotonically increasing, roughly geometric — matches the wire schema the
// upstream telemetry/usage endpoint expects so a raw bucket index recorded
// here means the same thing on the server side.
pub const BUCKET_COUNT: usize = 23;

const BUCKET_BOUNDS_MS: [f64; BUCKET_COUNT] = [
    1.0, 1.5, 2.3, 3.4, 5.2, 7.8, 11.7, 17.6, 26.4, 39.6, 59.4, 89.2, 133.8, 200.8, 301.2, 451.8,
    677.8, 1016.6, 1524.9, 2287.4, 3431.1, 5146.6, 7719.9,
];

/// Index of the smallest bucket whose upper bound is `>= millis`. Values
/// past the last bound collapse into the final (overflow) bucket. Monotonic
/// and total over `[0, inf)`.
pub fn bucket_of(millis: f64) -> usize {
    for (idx, bound) in BUCKET_BOUNDS_MS.iter().enumerate() {
        if millis <= *bound {
            return idx;
        }
    }
    BUCKET_COUNT - 1
}
