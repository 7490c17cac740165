//! Project manifest (`plugkit.toml`): schema and loading

mod loader;
mod schema;

pub use loader::{Config, MANIFEST_FILE};
pub use schema::{
    Author, BuildSection, ConfigSchema, DeviceSection, HostSection, LinksSection, PluginSection,
    ProjectType, RegistrySection, SdkSection, UpdateSection,
};
