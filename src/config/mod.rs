//! Configuration module

mod site;

pub use site::ApiConfig;
pub use site::SiteConfig;
