pub mod catalog;
pub mod historical;

pub use catalog::load_plant_catalog;
pub use historical::load_historical_data;
