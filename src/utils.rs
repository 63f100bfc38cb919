mod stats;

pub use stats::{percentage, percentile, round_one_decimal};
