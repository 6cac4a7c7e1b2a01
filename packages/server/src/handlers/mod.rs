pub mod sighting;
pub mod uploads;
