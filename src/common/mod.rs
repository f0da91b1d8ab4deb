mod data_loader;
pub mod helpers;

pub use data_loader::DataLoader;
