//! Thin wrapper over the adb CLI
//!
//! Each method maps to exactly one adb invocation; no chaining, no
//! custom semantics. Output parsing stops at what deployment needs:
//! the device table and shell command responses.

use plugkit_core::error::{Error, ErrorCode, Result};
use plugkit_core::process::run_command;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// Connection state as adb reports it
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DeviceState {
    /// Ready for commands
    Device,
    Offline,
    Unauthorized,
    Other(String),
}

impl DeviceState {
    fn parse(s: &str) -> Self {
        match s {
            "device" => Self::Device,
            "offline" => Self::Offline,
            "unauthorized" => Self::Unauthorized,
            other => Self::Other(other.to_string()),
        }
    }
}

/// One row of the adb device table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Device {
    pub serial: String,
    pub state: DeviceState,
}

/// Handle on a located adb executable
#[derive(Debug, Clone)]
pub struct Adb {
    exe: PathBuf,
}

impl Adb {
    pub fn new(exe: PathBuf) -> Self {
        Self { exe }
    }

    /// All attached devices, whatever their state
    pub fn devices(&self) -> Result<Vec<Device>> {
        let result = self.run(&["devices"])?;
        Ok(parse_devices(&result.stdout))
    }

    /// The single ready device deployment targets.
    pub fn single_device(&self) -> Result<Device> {
        pick_single(self.devices()?)
    }

    /// Push a local file to a remote path
    pub fn push(&self, serial: &str, local: &Path, remote: &str) -> Result<()> {
        let args: Vec<OsString> = vec![
            "-s".into(),
            serial.into(),
            "push".into(),
            local.as_os_str().to_os_string(),
            remote.into(),
        ];
        let result = run_command(&self.exe, &args)?;
        if !result.success {
            return Err(Error::new(
                ErrorCode::PushFailed,
                format!("Failed to push {} to {}", local.display(), remote),
            )
            .with_context(result.combined_output()));
        }
        Ok(())
    }

    /// Run a shell command on the device and return its combined output
    pub fn shell(&self, serial: &str, shell_args: &[&str]) -> Result<String> {
        let mut args = vec!["-s", serial, "shell"];
        args.extend_from_slice(shell_args);

        let result = self.run(&args)?;
        Ok(result.combined_output())
    }

    /// Remove a remote file
    pub fn rm(&self, serial: &str, remote: &str) -> Result<()> {
        self.shell(serial, &["rm", remote])?;
        Ok(())
    }

    /// (Re)start an activity: `am start -S -n <component>`, with `-D`
    /// when the debugger should be waited for.
    pub fn launch_activity(
        &self,
        serial: &str,
        component: &str,
        wait_for_debugger: bool,
    ) -> Result<()> {
        let mut args = vec!["am", "start", "-S", "-n", component];
        if wait_for_debugger {
            args.push("-D");
        }

        let response = self.shell(serial, &args)?;
        if response.contains("Error") {
            return Err(Error::new(
                ErrorCode::ShellFailed,
                format!("Activity manager rejected {}", component),
            )
            .with_context(response));
        }
        Ok(())
    }

    fn run(&self, args: &[&str]) -> Result<plugkit_core::process::CommandResult> {
        let result = run_command(&self.exe, args)?;
        if !result.success {
            return Err(Error::new(
                ErrorCode::ShellFailed,
                format!("adb {} failed", args.first().copied().unwrap_or_default()),
            )
            .with_context(result.combined_output()));
        }
        Ok(result)
    }
}

/// Parse the `adb devices` table: a header line, then
/// `<serial>\t<state>` rows.
fn parse_devices(output: &str) -> Vec<Device> {
    output
        .lines()
        .skip(1)
        .filter_map(|line| {
            let mut parts = line.split_whitespace();
            let serial = parts.next()?;
            let state = parts.next()?;
            Some(Device {
                serial: serial.to_string(),
                state: DeviceState::parse(state),
            })
        })
        .collect()
}

/// Deployment targets exactly one ready device.
fn pick_single(devices: Vec<Device>) -> Result<Device> {
    let mut ready: Vec<Device> = devices
        .into_iter()
        .filter(|d| d.state == DeviceState::Device)
        .collect();

    match ready.len() {
        0 => Err(Error::new(
            ErrorCode::NoDevice,
            "No device connected",
        )
        .with_suggestion("Connect a device or start an emulator, and check `adb devices`")),
        1 => Ok(ready.remove(0)),
        n => Err(Error::new(
            ErrorCode::TooManyDevices,
            format!("Only one device should be connected, but {} were", n),
        )
        .with_suggestion("Disconnect the extra devices or emulators")),
    }
}
