mod r#trait;
mod key;
mod registry;

pub use r#trait::{Consumer, PluginFuture, Producer};
pub use key::{pascal_to_snake, plugin_key};
pub use registry::{Capability, PluginRegistry};
