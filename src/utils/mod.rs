//! Small shared utilities.

pub mod html;
pub mod mime;
pub mod path;

pub use path::{is_contained_in, normalize_path};
