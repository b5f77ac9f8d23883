pub mod fuzz;
pub mod locate;
pub mod matcher;
pub mod normalize;

pub use locate::{locate_span, LocateStep};
pub use matcher::{find_best_match, Haystack, Matcher, MatcherStats, DEFAULT_MIN_SCORE};
pub use normalize::normalize;
