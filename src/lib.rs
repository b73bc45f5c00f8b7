// Library exports for Pinboard
// This allows integration tests and external code to use Pinboard modules

pub mod auth;
pub mod config;
pub mod db;
pub mod error;
pub mod extractors;
pub mod pagination;
pub mod repositories;
pub mod response;
pub mod routes;
pub mod services;
pub mod state;
pub mod uploads;

#[cfg(test)]
mod test_support;
