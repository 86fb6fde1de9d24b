pub mod coincap;
pub mod coingecko;
pub mod coinmarketcap;
mod util;
