//! Configuration sections for `pavo.toml`.

pub mod build;
pub mod routes;
pub mod serve;
pub mod static_paths;

pub use build::BuildSection;
pub use routes::{HeaderRule, RedirectRule, RewriteRule, RoutesSection};
pub use serve::ServeSection;
pub use static_paths::StaticPathsSection;
