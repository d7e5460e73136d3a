//! Resolve free-text city/region/country fields against a gazetteer and write the
//! normalized location back onto records.

pub mod config;
pub mod constants;
pub mod error;
pub mod gazetteer;
pub mod location;
pub mod logging;
pub mod observability;

pub use error::{LocationError, Result};
pub use gazetteer::{GazetteerStore, InMemoryGazetteer, Location, LocationLevel};
pub use location::{
    EventRecord, LocationQuery, LocationResolver, LocationService, RecordFixer, ResolutionErrors,
};
