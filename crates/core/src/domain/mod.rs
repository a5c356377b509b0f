pub mod station;
pub mod trip;

/// Cars per train on the line.
pub const TOTAL_CARS: usize = 10;

/// Seated capacity of one car.
pub const SEATS_PER_CAR: f64 = 54.0;

/// Total capacity of one car at 100% congestion.
pub const MAX_CAPACITY: f64 = 160.0;

/// Per-car car-number helper: cars are numbered from 1.
pub fn car_numbers() -> impl Iterator<Item = usize> {
    1..=TOTAL_CARS
}
