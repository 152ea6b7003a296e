pub mod config;
pub mod database;
pub mod model;
pub mod play;
pub mod state;
pub mod traits;
pub mod util;

#[cfg(test)]
mod test_utils;
