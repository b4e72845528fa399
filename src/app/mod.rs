pub mod driver;
pub mod headless;
