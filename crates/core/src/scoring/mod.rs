pub mod alpha;
pub mod engine;
pub mod normalize;

pub use alpha::time_of_day_multiplier;
pub use engine::{score_trip, CarScore, ScoreBoard, StationContribution, TripPlan};
pub use normalize::normalize_scores;
