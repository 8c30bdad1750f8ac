//! Upstream data providers: geocoding, spatial search, administrative
//! statistics, and the simulated safety feed.

pub mod demographics;
pub mod geocode;
pub mod poi;
pub mod safety;
pub mod spatial;
pub mod transit;

pub use demographics::{Demographics, IbgeClient};
pub use geocode::{Geocoder, NominatimGeocoder};
pub use poi::PoiProvider;
pub use safety::SafetyProvider;
pub use spatial::{OverpassClient, SpatialSearch};
pub use transit::TransitProvider;
