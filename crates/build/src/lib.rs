//! Build pipeline for PlugKit plugin packages
//!
//! The pipeline is a short task chain: dex the compiled classes, compile
//! resources when the project has any, then stitch the outputs into the
//! distributable artifact. The host dependency, update feed, and host
//! decompilation live here too. All heavy lifting (dexing, resource
//! linking, bytecode conversion, decompilation) is delegated to external
//! tools; this crate decides what to run and in what order.

pub mod classfile;
pub mod dex;
pub mod host;
pub mod package;
pub mod resources;
pub mod sources;
pub mod updater;

use plugkit_core::config::Config;
use plugkit_core::error::Result;
use plugkit_sdk::AndroidSdk;

pub use dex::{DexOutput, ENTRY_POINT_DESCRIPTOR};
pub use host::HostArtifacts;
pub use package::{Artifact, PluginManifest};
pub use updater::UpdateInfo;

/// Run the full build: dex, resources, package.
pub fn build_project(config: &Config, sdk: &AndroidSdk) -> Result<Artifact> {
    let dex_output = dex::compile_dex(config, sdk)?;
    let res_apk = resources::compile_resources(config, sdk)?;

    package::assemble(
        config,
        &dex_output.dex_file,
        dex_output.entry_point.as_deref(),
        res_apk.as_deref(),
    )
}
