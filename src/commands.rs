//! CLI commands
//!
//! One-shot commands that query or apply routing without the daemon.

use color_eyre::eyre::{self, Result};
use crossterm::style::Stylize;
use serde::Serialize;

use crate::audio::{AudioDevice, AudioDeviceRegistry, DeviceId, SystemAudioRegistry};
use crate::built_info;
use crate::config::Config;
use crate::display::{Display, DisplayProbe, SystemDisplayProbe, has_external_display};
use crate::policy::{OutputDeviceType, select_target_class};
use crate::state::Monitor;
use crate::style::DaswStyle;
use crate::switcher::{SkipReason, SwitchReport, Switcher};

// ============================================================================
// JSON Output Structures
// ============================================================================

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct StatusJson {
    pub version: String,
    pub external_display: bool,
    pub display_count: usize,
    pub target: OutputDeviceType,
    pub proxy_device: String,
    pub current_default: Option<DeviceId>,
    pub current_default_name: Option<String>,
    pub target_device: Option<AudioDevice>,
    /// Current default already matches the policy (or no device to switch to)
    pub aligned: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct DeviceJson {
    pub id: DeviceId,
    pub name: String,
    pub is_built_in: bool,
    pub class: Option<OutputDeviceType>,
    pub is_default: bool,
}

// ============================================================================
// Data Collection
// ============================================================================

/// Gather status information from the given probe and registry
pub fn collect_status<P, R>(probe: &P, registry: &R, switcher: &Switcher) -> StatusJson
where
    P: DisplayProbe + ?Sized,
    R: AudioDeviceRegistry + ?Sized,
{
    let displays = probe.active_displays();
    let external_display = has_external_display(&displays);
    let target = select_target_class(external_display);

    let devices = registry.list_output_devices();
    let default_id = registry.default_output_device_id();
    let current = devices.iter().find(|d| d.id == default_id).cloned();
    let target_device = switcher.select_device(devices, target);
    let aligned = target_device.as_ref().is_none_or(|d| d.id == default_id);

    StatusJson {
        version: built_info::PKG_VERSION.to_string(),
        external_display,
        display_count: displays.len(),
        target,
        proxy_device: switcher.proxy_name().to_string(),
        current_default: (default_id != DeviceId::UNKNOWN).then_some(default_id),
        current_default_name: current.map(|d| d.name),
        target_device,
        aligned,
    }
}

/// Enumerate devices with their class and default marker
pub fn collect_devices<R>(registry: &R, proxy_name: &str) -> Vec<DeviceJson>
where
    R: AudioDeviceRegistry + ?Sized,
{
    let default_id = registry.default_output_device_id();
    registry
        .list_output_devices()
        .into_iter()
        .map(|d| DeviceJson {
            class: OutputDeviceType::classify(&d, proxy_name),
            is_default: d.id == default_id,
            id: d.id,
            name: d.name,
            is_built_in: d.is_built_in,
        })
        .collect()
}

fn system_probe(config: &Config) -> SystemDisplayProbe {
    SystemDisplayProbe::new(config.settings.max_displays)
}

fn switcher(config: &Config) -> Switcher {
    Switcher::new(config.settings.proxy_device.clone())
}

// ============================================================================
// Commands
// ============================================================================

/// Show display presence, policy target and current default output
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn status(config: &Config, json_output: bool) -> Result<()> {
    let status = collect_status(
        &system_probe(config),
        &SystemAudioRegistry::default(),
        &switcher(config),
    );

    if json_output {
        println!("{}", serde_json::to_string_pretty(&status)?);
        return Ok(());
    }

    println!(
        "{} {} {}",
        "dasw".header(),
        status.version,
        format!("({})", built_info::TARGET).dim()
    );
    println!();

    let presence = if status.external_display {
        "connected".success().to_string()
    } else {
        "none".dim().to_string()
    };
    println!("External display: {} ({} active)", presence, status.display_count);
    println!("Policy target:    {}", status.target.to_string().technical());

    match &status.current_default_name {
        Some(name) => println!("Current output:   {}", name.as_str().bold()),
        None => println!("Current output:   {}", "unknown".warning()),
    }

    match &status.target_device {
        Some(device) => println!(
            "Target device:    {} {}",
            device.name.as_str().bold(),
            format!("[{}]", device.id).dim()
        ),
        None => println!(
            "Target device:    {}",
            format!("no {} device found", status.target).warning()
        ),
    }

    let routing = if status.aligned {
        "aligned".success().to_string()
    } else {
        "differs (run 'dasw apply')".warning().to_string()
    };
    println!("Routing:          {routing}");

    Ok(())
}

/// List output-capable audio devices
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn list_devices(config: &Config, json_output: bool) -> Result<()> {
    let devices = collect_devices(&SystemAudioRegistry::default(), &config.settings.proxy_device);

    if json_output {
        println!("{}", serde_json::to_string_pretty(&devices)?);
        return Ok(());
    }

    println!("{}", "OUTPUT DEVICES:".header());
    println!("{}", "-".repeat(15));
    if devices.is_empty() {
        println!("  {}", "(none)".dim());
        return Ok(());
    }

    for device in &devices {
        let marker = if device.is_default { "* " } else { "  " };
        let class = match device.class {
            Some(class) => format!(" [{class}]").technical().to_string(),
            None => String::new(),
        };
        println!("{}{}{}", marker, device.name.as_str().bold(), class);
        println!(
            "    {}",
            format!(
                "id {}, {}",
                device.id,
                if device.is_built_in { "built-in transport" } else { "external transport" }
            )
            .dim()
        );
    }
    println!("\n  {} = current default", "*".dim());

    Ok(())
}

/// List active displays
///
/// # Errors
/// Returns an error if JSON serialization fails.
pub fn list_displays(config: &Config, json_output: bool) -> Result<()> {
    let displays: Vec<Display> = system_probe(config).active_displays();

    if json_output {
        println!("{}", serde_json::to_string_pretty(&displays)?);
        return Ok(());
    }

    println!("{}", "ACTIVE DISPLAYS:".header());
    println!("{}", "-".repeat(16));
    if displays.is_empty() {
        println!("  {}", "(none)".dim());
        return Ok(());
    }

    for display in &displays {
        let kind = if display.is_built_in {
            "built-in".dim().to_string()
        } else {
            "external".success().to_string()
        };
        let main = if display.is_main { " [main]" } else { "" };
        println!("  {} {}{}", display.id.to_string().technical(), kind, main);
    }

    Ok(())
}

/// Probe displays once and apply the policy
///
/// # Errors
/// Returns an error if the switch fails.
pub fn apply(config: &Config, dry_run: bool) -> Result<()> {
    let probe = system_probe(config);
    let registry = SystemAudioRegistry::default();

    if dry_run {
        let status = collect_status(&probe, &registry, &switcher(config));
        match status.target_device {
            Some(device) if status.aligned => {
                println!("{} already default ({})", device.name.as_str().bold(), status.target);
            }
            Some(device) => {
                println!("Would switch to {} ({})", device.name.as_str().bold(), status.target);
            }
            None => println!("{}", format!("No {} output device found", status.target).dim()),
        }
        return Ok(());
    }

    let mut monitor = Monitor::new(probe, registry, switcher(config));
    match monitor.handle_display_change_event() {
        Some(report) => print_report(&report),
        None => Ok(()),
    }
}

/// Switch to a device class, ignoring display state
///
/// # Errors
/// Returns an error if the switch fails.
pub fn switch(config: &Config, target: OutputDeviceType) -> Result<()> {
    let monitor = Monitor::new(
        system_probe(config),
        SystemAudioRegistry::default(),
        switcher(config),
    );
    print_report(&monitor.apply(target))
}

fn print_report(report: &SwitchReport) -> Result<()> {
    match report {
        SwitchReport::Applied { .. } => println!("{} {}", "✓".success(), report),
        SwitchReport::Skipped(SkipReason::AlreadyDefault { .. }) => println!("{report}"),
        SwitchReport::Skipped(SkipReason::NoMatchingDevice { .. }) => {
            println!("{}", report.to_string().dim());
        }
        SwitchReport::Failed(e) => eyre::bail!("{e}"),
    }
    Ok(())
}
