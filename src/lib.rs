pub mod cli;
pub mod controller;
pub mod input;
pub mod models;
pub mod provider;
pub mod render;
pub mod services;

#[cfg(test)]
pub(crate) mod testing;
