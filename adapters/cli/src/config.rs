//! Machine configuration assembled from a TOML file and command-line flags.

use std::{fs, path::Path, path::PathBuf, time::Duration};

use anyhow::{Context, Result};
use reelspin_core::{ReelTuning, SymbolPalette};
use serde::Deserialize;

use crate::machine::{MachineSettings, MachineTiming};

/// Contents of a `reelspin.toml` configuration file.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct FileConfig {
    /// Layout and timing overrides.
    pub(crate) machine: MachineOverrides,
    /// Reel motion tuning; missing fields keep their defaults.
    pub(crate) tuning: ReelTuning,
}

impl FileConfig {
    /// Reads and parses the configuration stored at `path`.
    ///
    /// Relative paths inside the file are resolved against the file's directory.
    pub(crate) fn load(path: &Path) -> Result<Self> {
        let contents = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        let config = Self::parse(&contents)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        Ok(match path.parent() {
            Some(base) => config.relative_to(base),
            None => config,
        })
    }

    /// Rebases relative paths onto `base`; absolute paths are kept.
    #[must_use]
    pub(crate) fn relative_to(mut self, base: &Path) -> Self {
        self.machine.manifest = self.machine.manifest.map(|manifest| base.join(manifest));
        self
    }

    /// Parses configuration from TOML text.
    pub(crate) fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).context("failed to parse config toml")
    }
}

/// Optional machine settings; unset fields defer to the next layer.
#[derive(Clone, Debug, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub(crate) struct MachineOverrides {
    pub(crate) reels: Option<u32>,
    pub(crate) symbols: Option<u32>,
    pub(crate) palette: Option<u32>,
    pub(crate) cell_size: Option<f32>,
    pub(crate) reel_spacing: Option<f32>,
    pub(crate) start_stagger_ms: Option<u64>,
    pub(crate) stop_delay_ms: Option<u64>,
    pub(crate) stop_stagger_ms: Option<u64>,
    pub(crate) seed: Option<u64>,
    pub(crate) manifest: Option<PathBuf>,
}

impl MachineOverrides {
    /// Keeps the values set on `self`, filling the gaps from `fallback`.
    #[must_use]
    pub(crate) fn or(self, fallback: Self) -> Self {
        Self {
            reels: self.reels.or(fallback.reels),
            symbols: self.symbols.or(fallback.symbols),
            palette: self.palette.or(fallback.palette),
            cell_size: self.cell_size.or(fallback.cell_size),
            reel_spacing: self.reel_spacing.or(fallback.reel_spacing),
            start_stagger_ms: self.start_stagger_ms.or(fallback.start_stagger_ms),
            stop_delay_ms: self.stop_delay_ms.or(fallback.stop_delay_ms),
            stop_stagger_ms: self.stop_stagger_ms.or(fallback.stop_stagger_ms),
            seed: self.seed.or(fallback.seed),
            manifest: self.manifest.or(fallback.manifest),
        }
    }

    /// Applies the overrides on top of the stock machine settings.
    pub(crate) fn into_settings(self, tuning: ReelTuning) -> Result<MachineSettings> {
        tuning.validate().context("invalid reel tuning")?;

        let defaults = MachineSettings::default();
        let palette = match self.palette {
            Some(kinds) => SymbolPalette::new(kinds).context("invalid symbol palette")?,
            None => defaults.palette,
        };
        let timing = MachineTiming {
            start_stagger: self
                .start_stagger_ms
                .map_or(defaults.timing.start_stagger, Duration::from_millis),
            stop_delay: self
                .stop_delay_ms
                .map_or(defaults.timing.stop_delay, Duration::from_millis),
            stop_stagger: self
                .stop_stagger_ms
                .map_or(defaults.timing.stop_stagger, Duration::from_millis),
        };

        Ok(MachineSettings {
            reels: self.reels.unwrap_or(defaults.reels),
            symbols_per_reel: self.symbols.unwrap_or(defaults.symbols_per_reel),
            palette,
            cell_size: self.cell_size.unwrap_or(defaults.cell_size),
            reel_spacing: self.reel_spacing.unwrap_or(defaults.reel_spacing),
            timing,
            tuning,
            seed: self.seed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_keeps_stock_machine() {
        let file = FileConfig::parse("").expect("empty config");
        let settings = file
            .machine
            .into_settings(file.tuning)
            .expect("defaults are valid");

        assert_eq!(settings, MachineSettings::default());
    }

    #[test]
    fn file_sections_override_defaults() {
        let file = FileConfig::parse(
            r#"
            [machine]
            reels = 3
            symbols = 5
            palette = 8
            cell_size = 120.0
            stop_stagger_ms = 250
            manifest = "skins/classic.toml"

            [tuning]
            spin_speed = 0.75
            settle_duration_ms = 250.0
            "#,
        )
        .expect("valid config");

        assert_eq!(
            file.machine.manifest,
            Some(PathBuf::from("skins/classic.toml"))
        );
        let settings = file
            .machine
            .into_settings(file.tuning)
            .expect("valid settings");
        assert_eq!(settings.reels, 3);
        assert_eq!(settings.symbols_per_reel, 5);
        assert_eq!(settings.palette.len(), 8);
        assert_eq!(settings.cell_size, 120.0);
        assert_eq!(settings.reel_spacing, 10.0);
        assert_eq!(settings.timing.stop_stagger, Duration::from_millis(250));
        assert_eq!(settings.timing.start_stagger, Duration::from_millis(200));
        assert_eq!(settings.tuning.spin_speed, 0.75);
        assert_eq!(settings.tuning.settle_duration_ms, 250.0);
        assert_eq!(settings.tuning.slowdown_rate, 0.95);
    }

    #[test]
    fn manifest_paths_follow_the_config_file() {
        let file = FileConfig::parse("[machine]\nmanifest = \"skins/classic.toml\"\n")
            .expect("valid config")
            .relative_to(Path::new("configs/demo"));
        assert_eq!(
            file.machine.manifest,
            Some(PathBuf::from("configs/demo/skins/classic.toml"))
        );

        let absolute = std::env::temp_dir().join("classic.toml");
        let file = FileConfig {
            machine: MachineOverrides {
                manifest: Some(absolute.clone()),
                ..MachineOverrides::default()
            },
            ..FileConfig::default()
        }
        .relative_to(Path::new("configs/demo"));
        assert_eq!(file.machine.manifest, Some(absolute));
    }

    #[test]
    fn loading_a_file_resolves_its_manifest_beside_it() {
        let dir = std::env::temp_dir().join(format!("reelspin-config-{}", std::process::id()));
        fs::create_dir_all(&dir).expect("create config dir");
        let path = dir.join("reelspin.toml");
        fs::write(&path, "[machine]\nmanifest = \"skin.toml\"\n").expect("write config");

        let file = FileConfig::load(&path).expect("load config");
        assert_eq!(file.machine.manifest, Some(dir.join("skin.toml")));

        fs::remove_dir_all(&dir).expect("remove config dir");
    }

    #[test]
    fn command_line_values_win_over_file_values() {
        let file = MachineOverrides {
            reels: Some(3),
            seed: Some(1),
            cell_size: Some(90.0),
            ..MachineOverrides::default()
        };
        let cli = MachineOverrides {
            reels: Some(5),
            seed: Some(7),
            ..MachineOverrides::default()
        };

        let merged = cli.or(file);
        assert_eq!(merged.reels, Some(5));
        assert_eq!(merged.seed, Some(7));
        assert_eq!(merged.cell_size, Some(90.0));
    }

    #[test]
    fn unknown_keys_are_rejected() {
        assert!(FileConfig::parse("[machine]\nreel_count = 4\n").is_err());
        assert!(FileConfig::parse("[tuning]\nspin_speed = \"fast\"\n").is_err());
    }

    #[test]
    fn invalid_values_are_reported() {
        let bad_tuning = ReelTuning {
            slowdown_rate: 1.5,
            ..ReelTuning::default()
        };
        assert!(MachineOverrides::default()
            .into_settings(bad_tuning)
            .is_err());

        let empty_palette = MachineOverrides {
            palette: Some(0),
            ..MachineOverrides::default()
        };
        assert!(empty_palette
            .into_settings(ReelTuning::default())
            .is_err());
    }
}
