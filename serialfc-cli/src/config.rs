//! Configuration file support for serialfc.
//!
//! Configuration is loaded from multiple sources with the following priority (highest first):
//! 1. Command-line arguments
//! 2. Environment variables (SERIALFC_*)
//! 3. File given with `--config` (replaces 4 and 5)
//! 4. Local config file (./serialfc.toml)
//! 5. Global config file (~/.config/serialfc/config.toml)
//!
//! ```toml
//! [port]
//! name = "COM3"
//! baud = 115200
//!
//! [profile.rs485-bus]
//! rs485 = true
//! echo-cancel = true
//! termination = true
//! rx-trigger = 64
//!
//! [profile.pps]
//! external-transmit = 1
//! isochronous = false
//! ```

use {
    crate::commands::feature::Change,
    anyhow::Context,
    directories::ProjectDirs,
    log::{debug, warn},
    serde::{Deserialize, Serialize},
    serialfc::Feature,
    std::{
        collections::BTreeMap,
        fs,
        path::{Path, PathBuf},
    },
};

/// Local configuration file name.
pub const LOCAL_CONFIG_FILE: &str = "serialfc.toml";

/// Port configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PortConfig {
    /// Serial port (e.g., "COM3").
    pub name: Option<String>,
    /// Default baud rate.
    pub baud: Option<u32>,
}

/// Value of a mode feature in a profile: a number enables, `false` disables.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ModeSetting {
    /// Enable with this argument.
    Enable(u32),
    /// `false` disables; `true` is rejected when applied.
    Switch(bool),
}

/// A named set of feature values applied together.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", deny_unknown_fields)]
pub struct Profile {
    /// RS-485 mode.
    pub rs485: Option<bool>,
    /// Echo cancellation.
    pub echo_cancel: Option<bool>,
    /// Line termination.
    pub termination: Option<bool>,
    /// 9-bit mode.
    pub nine_bit: Option<bool>,
    /// UART sample rate.
    pub sample_rate: Option<u32>,
    /// Transmit FIFO trigger level.
    pub tx_trigger: Option<u32>,
    /// Receive FIFO trigger level.
    pub rx_trigger: Option<u32>,
    /// Characters per frame.
    pub frame_length: Option<u32>,
    /// Clock generator rate in Hz.
    pub clock_rate: Option<u32>,
    /// Isochronous mode selector.
    pub isochronous: Option<ModeSetting>,
    /// External transmit character count.
    pub external_transmit: Option<ModeSetting>,
    /// Fixed baud rate.
    pub fixed_baud_rate: Option<ModeSetting>,
}

impl Profile {
    /// Changes in the order they are applied.
    ///
    /// The order follows [`Feature::ALL`]: toggles first, then numeric
    /// settings, the clock rate and finally the mode features.
    pub fn changes(&self) -> anyhow::Result<Vec<(Feature, Change)>> {
        let toggles = [
            (Feature::Rs485, self.rs485),
            (Feature::EchoCancel, self.echo_cancel),
            (Feature::Termination, self.termination),
            (Feature::NineBit, self.nine_bit),
        ];
        let values = [
            (Feature::SampleRate, self.sample_rate),
            (Feature::TxTrigger, self.tx_trigger),
            (Feature::RxTrigger, self.rx_trigger),
            (Feature::FrameLength, self.frame_length),
            (Feature::ClockRate, self.clock_rate),
        ];
        let modes = [
            (Feature::Isochronous, self.isochronous),
            (Feature::ExternalTransmit, self.external_transmit),
            (Feature::FixedBaudRate, self.fixed_baud_rate),
        ];

        let mut changes: Vec<(Feature, Change)> = toggles
            .into_iter()
            .filter_map(|(f, v)| v.map(|on| (f, Change::Toggle(on))))
            .chain(
                values
                    .into_iter()
                    .filter_map(|(f, v)| v.map(|n| (f, Change::Value(n)))),
            )
            .collect();

        for (feature, setting) in modes {
            match setting {
                None => {},
                Some(ModeSetting::Enable(arg)) => changes.push((feature, Change::Enable(arg))),
                Some(ModeSetting::Switch(false)) => changes.push((feature, Change::Disable)),
                Some(ModeSetting::Switch(true)) => {
                    anyhow::bail!("{feature} needs a value to be enabled, not `true`")
                },
            }
        }

        Ok(changes)
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Default, Serialize)]
pub struct Config {
    /// Port configuration.
    pub port: PortConfig,
    /// Named feature profiles.
    pub profile: BTreeMap<String, Profile>,
    /// Profiles that failed to parse, with the parse error.
    #[serde(skip)]
    pub invalid_profiles: BTreeMap<String, String>,
}

/// On-disk layout; profiles stay raw so that one bad profile is isolated.
#[derive(Deserialize)]
struct ConfigFile {
    #[serde(default)]
    port: PortConfig,
    #[serde(default)]
    profile: BTreeMap<String, toml::Value>,
}

impl Config {
    /// Parse a TOML document.
    ///
    /// Syntax errors and a malformed `[port]` table fail the whole document.
    /// A malformed profile is kept aside in `invalid_profiles`.
    pub fn parse(content: &str) -> Result<Self, toml::de::Error> {
        let file: ConfigFile = toml::from_str(content)?;
        let mut config = Self {
            port: file.port,
            ..Self::default()
        };

        for (name, value) in file.profile {
            match value.try_into::<Profile>() {
                Ok(profile) => {
                    config
                        .profile
                        .insert(name, profile);
                },
                Err(e) => {
                    let reason = e
                        .message()
                        .trim()
                        .to_string();
                    warn!("Ignoring profile '{name}': {reason}");
                    config
                        .invalid_profiles
                        .insert(name, reason);
                },
            }
        }

        Ok(config)
    }

    /// Load configuration from all available sources.
    ///
    /// Missing files are skipped; unreadable ones are reported and skipped.
    pub fn load() -> Self {
        let mut config = Self::default();

        // Load global config
        if let Some(global_path) = Self::global_config_path() {
            if let Some(global_config) = Self::load_optional(&global_path) {
                debug!("Loaded global config from {}", global_path.display());
                config.merge(global_config);
            }
        }

        // Load local config (overrides global)
        if let Some(local_config) = Self::load_optional(Path::new(LOCAL_CONFIG_FILE)) {
            debug!("Loaded local config from {LOCAL_CONFIG_FILE}");
            config.merge(local_config);
        }

        config
    }

    /// Load configuration from a specific file path (--config flag).
    pub fn load_from_path(path: &Path) -> anyhow::Result<Self> {
        let config = Self::load_from_file(path)?;
        debug!("Loaded config from {}", path.display());
        Ok(config)
    }

    fn load_optional(path: &Path) -> Option<Self> {
        if !path.exists() {
            return None;
        }
        Self::load_from_file(path)
            .inspect_err(|e| warn!("{e:#}"))
            .ok()
    }

    /// Load configuration from a specific file.
    fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::parse(&content)
            .with_context(|| format!("Failed to parse config file {}", path.display()))
    }

    /// Get the global configuration directory.
    pub fn global_config_dir() -> Option<PathBuf> {
        ProjectDirs::from("", "", "serialfc").map(|dirs| {
            dirs.config_dir()
                .to_path_buf()
        })
    }

    /// Get the global configuration file path.
    pub fn global_config_path() -> Option<PathBuf> {
        Self::global_config_dir().map(|dir| dir.join("config.toml"))
    }

    /// Merge another config into this one.
    ///
    /// A profile defined in `other`, valid or not, replaces a profile of the
    /// same name.
    fn merge(&mut self, other: Self) {
        if other
            .port
            .name
            .is_some()
        {
            self.port.name = other.port.name;
        }
        if other
            .port
            .baud
            .is_some()
        {
            self.port.baud = other.port.baud;
        }
        for (name, profile) in other.profile {
            self.invalid_profiles
                .remove(&name);
            self.profile
                .insert(name, profile);
        }
        for (name, reason) in other.invalid_profiles {
            self.profile
                .remove(&name);
            self.invalid_profiles
                .insert(name, reason);
        }
    }

    /// Whether any profile, valid or not, is configured.
    pub fn has_profiles(&self) -> bool {
        !self
            .profile
            .is_empty()
            || !self
                .invalid_profiles
                .is_empty()
    }

    /// Every profile name in order, with its changes or why it is unusable.
    pub fn profile_changes(&self) -> Vec<(&str, anyhow::Result<Vec<(Feature, Change)>>)> {
        let mut all: Vec<_> = self
            .profile
            .iter()
            .map(|(name, profile)| (name.as_str(), profile.changes()))
            .chain(
                self.invalid_profiles
                    .iter()
                    .map(|(name, reason)| (name.as_str(), Err(anyhow::anyhow!("{reason}")))),
            )
            .collect();
        all.sort_by(|a, b| a.0.cmp(b.0));
        all
    }

    /// Look up a profile by name.
    pub fn profile(&self, name: &str) -> anyhow::Result<&Profile> {
        if let Some(reason) = self
            .invalid_profiles
            .get(name)
        {
            anyhow::bail!("Invalid profile '{name}': {reason}");
        }

        self.profile
            .get(name)
            .ok_or_else(|| {
                if !self.has_profiles() {
                    anyhow::anyhow!("Unknown profile '{name}': no profiles are configured")
                } else {
                    let names: Vec<&str> = self
                        .profile_changes()
                        .into_iter()
                        .map(|(name, _)| name)
                        .collect();
                    anyhow::anyhow!(
                        "Unknown profile '{name}'. Available profiles: {}",
                        names.join(", ")
                    )
                }
            })
    }
}
