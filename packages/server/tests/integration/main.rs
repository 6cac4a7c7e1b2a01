mod sightings;
mod uploads;
