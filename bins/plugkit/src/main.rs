//! PlugKit CLI
//!
//! Builds plugin packages for the PlugKit framework and deploys them to
//! a connected device.

use anyhow::Result;
use clap::{Parser, Subcommand};
use plugkit_build::{dex, host, package, resources, sources, updater};
use plugkit_cli::output::{format_duration, format_size, short_digest, Status};
use plugkit_cli::progress;
use plugkit_core::cache::ArtifactCache;
use plugkit_core::config::Config;
use plugkit_core::error::{exit_codes, Error, ErrorCode};
use plugkit_sdk::AndroidSdk;
use std::path::{Path, PathBuf};

#[derive(Parser)]
#[command(name = "plugkit")]
#[command(about = "Build and deploy PlugKit plugins")]
#[command(version)]
struct Cli {
    /// Project manifest path (defaults to ./plugkit.toml)
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase output verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, global = true)]
    quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    no_color: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the plugin package (dex, resources, package)
    Build,

    /// Compile classes to dex and locate the entry-point class
    Dex,

    /// Compile and link resources
    Resources,

    /// Download the host APK and convert it to a compile-time jar
    #[command(name = "fetch-host")]
    FetchHost,

    /// Build and push to the connected device, then relaunch
    Deploy {
        /// Start the target activity waiting for a debugger
        #[arg(long)]
        wait_for_debugger: bool,
    },

    /// Remove the deployed artifact from the device
    Uninstall,

    /// Decompile the host APK for reading
    #[command(name = "gen-sources")]
    GenSources,

    /// Aggregate module metadata into updater.json
    #[command(name = "updater-json")]
    UpdaterJson {
        /// Output path
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Diagnose the environment
    Doctor {
        /// Output as JSON
        #[arg(long)]
        json: bool,
    },

    /// Remove build outputs
    Clean {
        /// Also clear the host artifact cache
        #[arg(long)]
        cache: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    if cli.no_color {
        owo_colors::set_override(false);
    }

    init_tracing(cli.verbose);

    let config_path = cli.config.as_deref();

    let exit_code = match cli.command {
        Commands::Build => run_build(config_path),
        Commands::Dex => run_dex(config_path),
        Commands::Resources => run_resources(config_path),
        Commands::FetchHost => run_fetch_host(config_path, cli.quiet),
        Commands::Deploy { wait_for_debugger } => run_deploy(config_path, cli.quiet, wait_for_debugger),
        Commands::Uninstall => run_uninstall(config_path),
        Commands::GenSources => run_gen_sources(config_path, cli.quiet),
        Commands::UpdaterJson { output } => run_updater_json(config_path, output),
        Commands::Doctor { json } => run_doctor(config_path, json),
        Commands::Clean { cache } => run_clean(config_path, cache),
    };

    std::process::exit(exit_code);
}

fn init_tracing(verbose: u8) {
    let default = match verbose {
        0 => "warn",
        1 => "info",
        _ => "debug",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn exit_code_for(err: &Error) -> i32 {
    match err.code {
        ErrorCode::CommandNotFound => exit_codes::COMMAND_NOT_FOUND,
        code => match code.code() / 1000 {
            3 => exit_codes::CONFIG_ERROR,
            6 | 7 => exit_codes::BUILD_ERROR,
            8 => exit_codes::DEVICE_ERROR,
            _ => exit_codes::FAILURE,
        },
    }
}

fn fail(err: &Error) -> i32 {
    Status::error(&err.to_string());
    exit_code_for(err)
}

fn load_config(path: Option<&Path>) -> Result<Config, Error> {
    Config::load(path)
}

fn load_sdk(config: &Config) -> Result<AndroidSdk, Error> {
    AndroidSdk::locate(&config.schema.sdk)
}

fn run_build(config_path: Option<&Path>) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let sdk = match load_sdk(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    Status::info(&format!("Building {}...", config.schema.plugin.name));
    let started = std::time::Instant::now();

    Status::step(1, 3, "Compiling dex");
    let dex_output = match dex::compile_dex(&config, &sdk) {
        Ok(d) => d,
        Err(e) => return fail(&e),
    };

    Status::step(2, 3, "Compiling resources");
    let res_apk = match resources::compile_resources(&config, &sdk) {
        Ok(r) => r,
        Err(e) => return fail(&e),
    };

    Status::step(3, 3, "Assembling package");
    match package::assemble(
        &config,
        &dex_output.dex_file,
        dex_output.entry_point.as_deref(),
        res_apk.as_deref(),
    ) {
        Ok(artifact) => {
            let size = std::fs::metadata(&artifact.path).map(|m| m.len()).unwrap_or(0);
            Status::success(&format!(
                "Made {} ({}, sha256 {}) in {}",
                artifact.path.display(),
                format_size(size),
                short_digest(&artifact.sha256),
                format_duration(started.elapsed())
            ));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_dex(config_path: Option<&Path>) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let sdk = match load_sdk(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match dex::compile_dex(&config, &sdk) {
        Ok(output) => {
            Status::success(&format!("Compiled dex to {}", output.dex_file.display()));
            if let Some(entry) = output.entry_point {
                Status::info(&format!("Entry-point class: {}", entry));
            }
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_resources(config_path: Option<&Path>) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let sdk = match load_sdk(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    match resources::compile_resources(&config, &sdk) {
        Ok(Some(res_apk)) => {
            Status::success(&format!("Linked resources to {}", res_apk.display()));
            exit_codes::SUCCESS
        }
        Ok(None) => {
            Status::info("No resources to compile");
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn fetch_host(config: &Config, quiet: bool) -> Result<host::HostArtifacts, Error> {
    let cache = ArtifactCache::new()?;
    let version = host::resolve_version(&config.schema.host.version, &config.schema.registry)?;

    if quiet {
        host::ensure_host(version, &cache, &config.schema.registry, |_, _| {})
    } else {
        let bar = progress::download_bar(&format!("host-{}.apk", version));
        let result = host::ensure_host(version, &cache, &config.schema.registry, |done, total| {
            if let Some(total) = total {
                bar.set_length(total);
            }
            bar.set_position(done);
        });
        bar.finish_and_clear();
        result
    }
}

fn run_fetch_host(config_path: Option<&Path>, quiet: bool) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    match fetch_host(&config, quiet) {
        Ok(host) => {
            Status::success(&format!("Host {} ready", host.version));
            println!("{}", host.jar.display());
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_deploy(config_path: Option<&Path>, _quiet: bool, wait_for_debugger: bool) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let sdk = match load_sdk(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let artifact = match plugkit_build::build_project(&config, &sdk) {
        Ok(a) => a,
        Err(e) => return fail(&e),
    };

    let adb = match sdk.adb() {
        Ok(path) => plugkit_device::Adb::new(path),
        Err(e) => return fail(&e),
    };

    match plugkit_device::deploy(&adb, &config, &artifact.path, wait_for_debugger) {
        Ok(deployment) => {
            Status::success(&format!(
                "Deployed {} to {}",
                artifact.path.display(),
                deployment.serial
            ));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_uninstall(config_path: Option<&Path>) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };
    let sdk = match load_sdk(&config) {
        Ok(s) => s,
        Err(e) => return fail(&e),
    };

    let artifact = artifact_path(&config);

    let adb = match sdk.adb() {
        Ok(path) => plugkit_device::Adb::new(path),
        Err(e) => return fail(&e),
    };

    match plugkit_device::uninstall(&adb, &config, &artifact) {
        Ok(deployment) => {
            Status::success(&format!(
                "Deleted {} from {}",
                deployment.remote_path, deployment.serial
            ));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

/// Where the build writes this project's artifact
fn artifact_path(config: &Config) -> PathBuf {
    use plugkit_core::config::ProjectType;

    match config.schema.plugin.project_type {
        ProjectType::Injector => config.output_dir().join(package::INJECTOR_DEX),
        _ => config
            .output_dir()
            .join(format!("{}.zip", config.schema.plugin.name)),
    }
}

fn run_gen_sources(config_path: Option<&Path>, quiet: bool) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let host = match fetch_host(&config, quiet) {
        Ok(h) => h,
        Err(e) => return fail(&e),
    };
    let cache = match ArtifactCache::new() {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let spinner = progress::spinner("Decompiling host apk");
    match sources::generate_sources(&host, &cache) {
        Ok(out) => {
            progress::finish_success(&spinner, &format!("Generated sources at {}", out.display()));
            exit_codes::SUCCESS
        }
        Err(e) => {
            progress::finish_error(&spinner, "Decompilation failed");
            fail(&e)
        }
    }
}

fn run_updater_json(config_path: Option<&Path>, output: Option<PathBuf>) -> i32 {
    // The sweep runs from the manifest's directory when one is given,
    // else from the current directory; the root needs no manifest of
    // its own.
    let root = config_path
        .and_then(|p| p.parent())
        .filter(|p| !p.as_os_str().is_empty())
        .map(Path::to_path_buf)
        .unwrap_or_else(|| PathBuf::from("."));

    let output = output.unwrap_or_else(|| root.join("build/updater.json"));

    match updater::write_feed(&root, &output) {
        Ok(path) => {
            Status::success(&format!("Wrote update feed to {}", path.display()));
            exit_codes::SUCCESS
        }
        Err(e) => fail(&e),
    }
}

fn run_doctor(config_path: Option<&Path>, json: bool) -> i32 {
    let sdk_overrides = Config::load(config_path)
        .map(|c| c.schema.sdk)
        .unwrap_or_default();

    let sdk = AndroidSdk::locate(&sdk_overrides);

    let checks: Vec<(&str, Result<String, Error>)> = match &sdk {
        Ok(sdk) => vec![
            ("sdk", Ok(sdk.root().display().to_string())),
            ("build-tools", sdk.build_tools_dir().map(|p| p.display().to_string())),
            ("platform", sdk.platform_jar().map(|p| p.display().to_string())),
            ("d8", sdk.d8().map(|p| p.display().to_string())),
            ("aapt2", sdk.aapt2().map(|p| p.display().to_string())),
            ("adb", sdk.adb().map(|p| p.display().to_string())),
            (
                plugkit_sdk::DEX2JAR,
                plugkit_sdk::find_tool(plugkit_sdk::DEX2JAR).map(|p| p.display().to_string()),
            ),
            (
                plugkit_sdk::JADX,
                plugkit_sdk::find_tool(plugkit_sdk::JADX).map(|p| p.display().to_string()),
            ),
        ],
        Err(e) => vec![("sdk", Err(Error::new(e.code, e.message.clone())))],
    };

    let healthy = checks.iter().all(|(_, r)| r.is_ok());

    if json {
        let report: serde_json::Map<String, serde_json::Value> = checks
            .iter()
            .map(|(name, result)| {
                let value = match result {
                    Ok(path) => serde_json::json!({ "found": true, "path": path }),
                    Err(e) => serde_json::json!({ "found": false, "error": e.message }),
                };
                (name.to_string(), value)
            })
            .collect();
        println!("{}", serde_json::Value::Object(report));
    } else {
        println!("Environment Check");
        println!();
        for (name, result) in &checks {
            match result {
                Ok(path) => Status::success(&format!("{}: {}", name, path)),
                Err(e) => Status::error(&format!("{}: {}", name, e.message)),
            }
        }
    }

    if healthy {
        exit_codes::SUCCESS
    } else {
        exit_codes::FAILURE
    }
}

fn run_clean(config_path: Option<&Path>, cache: bool) -> i32 {
    let config = match load_config(config_path) {
        Ok(c) => c,
        Err(e) => return fail(&e),
    };

    let output_dir = config.output_dir();
    if output_dir.exists() {
        if let Err(e) = std::fs::remove_dir_all(&output_dir) {
            return fail(&Error::io(format!(
                "Failed to remove {}: {}",
                output_dir.display(),
                e
            )));
        }
        Status::success(&format!("Removed {}", output_dir.display()));
    } else {
        Status::info("Nothing to clean");
    }

    if cache {
        match ArtifactCache::new().and_then(|c| c.clear()) {
            Ok(()) => Status::success("Cleared host artifact cache"),
            Err(e) => return fail(&e),
        }
    }

    exit_codes::SUCCESS
}
