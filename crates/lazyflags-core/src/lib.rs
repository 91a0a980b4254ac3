pub mod cache;
pub mod clock;
pub mod doctor;
pub mod fetcher;
pub mod fixture;
pub mod matrix;
pub mod model;
pub mod service;
pub mod settings;
#[cfg(test)]
pub(crate) mod test_support;
