pub mod ttl_map;

pub use ttl_map::BoundedTtlMap;
