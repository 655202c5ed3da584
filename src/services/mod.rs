pub mod cache;

pub use cache::{PriceCache, DEFAULT_TTL};
