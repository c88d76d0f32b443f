pub mod country;

pub use country::{name_key, normalize, NormalizedCountry, RawCountry};
