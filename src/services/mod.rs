pub mod destination;
pub mod enrichment;
pub mod locations;
pub mod trips;
pub mod weather;
