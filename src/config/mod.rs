mod duration;

pub use duration::{parse_duration_to_secs, parse_interval};
