//! Application settings structs, defaults and TOML persistence.
//!
//! All structs implement `Serialize`, `Deserialize`, `Default` and `Clone`
//! so they can be round-tripped through TOML files and shared across threads.

use anyhow::Result;
use serde::{Deserialize, Serialize};

use super::AppPaths;

// ---------------------------------------------------------------------------
// HotkeyConfig
// ---------------------------------------------------------------------------

/// Global hotkey bindings.
///
/// Key names are parsed by [`crate::bridge::hotkey::parse_key`]; unparseable
/// names fall back to the defaults at startup with a logged warning.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HotkeyConfig {
    /// Key that starts a screen-region capture (e.g. `"F2"`).
    pub snip_key: String,
    /// Key that starts the phone-upload bridge (e.g. `"F3"`).
    pub mobile_key: String,
}

impl Default for HotkeyConfig {
    fn default() -> Self {
        Self {
            snip_key: "F2".into(),
            mobile_key: "F3".into(),
        }
    }
}

// ---------------------------------------------------------------------------
// BridgeConfig
// ---------------------------------------------------------------------------

/// Settings for the embedded phone-upload HTTP listener.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// TCP port the upload server binds to.  `0` picks an ephemeral port.
    pub port: u16,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self { port: 8989 }
    }
}

// ---------------------------------------------------------------------------
// EngineConfig
// ---------------------------------------------------------------------------

/// Settings for the recognition-engine client.
///
/// The engine is an external HTTP service (e.g. a local LaTeX-OCR server)
/// that accepts a PNG and returns LaTeX.  All connection details come from
/// here; nothing is hardcoded.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EngineConfig {
    /// Engine kind; `"http"` is the only production kind today.
    pub kind: String,
    /// Base URL of the recognition service.
    pub base_url: String,
    /// Maximum seconds to wait for a recognition response before timing out.
    pub timeout_secs: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            kind: "http".into(),
            base_url: "http://127.0.0.1:8502".into(),
            timeout_secs: 30,
        }
    }
}

// ---------------------------------------------------------------------------
// CaptureConfig
// ---------------------------------------------------------------------------

/// Settings shared by the screen overlay and the mobile editor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CaptureConfig {
    /// Drags with width or height below this many logical pixels are treated
    /// as misclicks and cancel the capture.
    pub min_selection_px: f32,
}

impl Default for CaptureConfig {
    fn default() -> Self {
        Self {
            min_selection_px: 5.0,
        }
    }
}

// ---------------------------------------------------------------------------
// UiConfig
// ---------------------------------------------------------------------------

/// egui widget appearance and behaviour settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UiConfig {
    /// Last saved widget position `(x, y)` in screen pixels.  `None` means
    /// let the OS / window manager pick a position on first launch.
    pub window_position: Option<(f32, f32)>,
    /// Keep the widget floating above all other windows.
    pub always_on_top: bool,
    /// Copy a successful recognition result to the clipboard automatically.
    pub auto_copy: bool,
}

impl Default for UiConfig {
    fn default() -> Self {
        Self {
            window_position: None,
            always_on_top: true,
            auto_copy: true,
        }
    }
}

// ---------------------------------------------------------------------------
// AppConfig  (top-level)
// ---------------------------------------------------------------------------

/// Top-level application configuration, serialised as `settings.toml`.
///
/// # Persistence
///
/// ```rust,no_run
/// use texsnip::config::AppConfig;
///
/// // Load (returns Default when file is missing)
/// let config = AppConfig::load().unwrap();
///
/// // Modify and save
/// // config.save().unwrap();
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Global hotkey bindings.
    pub hotkey: HotkeyConfig,
    /// Phone-upload bridge settings.
    pub bridge: BridgeConfig,
    /// Recognition-engine client settings.
    pub engine: EngineConfig,
    /// Selection thresholds.
    pub capture: CaptureConfig,
    /// UI / widget settings.
    pub ui: UiConfig,
}

impl AppConfig {
    /// Load configuration from the platform-appropriate `settings.toml`.
    ///
    /// Returns `Ok(AppConfig::default())` when the file does not exist yet
    /// (first-run scenario) so callers never need to special-case a missing
    /// file.
    pub fn load() -> Result<Self> {
        Self::load_from(&AppPaths::new().settings_file)
    }

    /// Load from an explicit path (useful for tests).
    pub fn load_from(path: &std::path::Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let content = std::fs::read_to_string(path)?;
        let config: Self = toml::from_str(&content)?;
        Ok(config)
    }

    /// Save configuration to the platform-appropriate `settings.toml`,
    /// creating parent directories as needed.
    pub fn save(&self) -> Result<()> {
        self.save_to(&AppPaths::new().settings_file)
    }

    /// Save to an explicit path (useful for tests).
    pub fn save_to(&self, path: &std::path::Path) -> Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    /// Verify that a default `AppConfig` can be serialised to TOML and
    /// deserialised back without any data loss.
    #[test]
    fn round_trip_toml() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("settings.toml");

        let original = AppConfig::default();
        original.save_to(&path).expect("save");

        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(original.hotkey.snip_key, loaded.hotkey.snip_key);
        assert_eq!(original.hotkey.mobile_key, loaded.hotkey.mobile_key);
        assert_eq!(original.bridge.port, loaded.bridge.port);
        assert_eq!(original.engine.base_url, loaded.engine.base_url);
        assert_eq!(original.engine.timeout_secs, loaded.engine.timeout_secs);
        assert_eq!(
            original.capture.min_selection_px,
            loaded.capture.min_selection_px
        );
        assert_eq!(original.ui.always_on_top, loaded.ui.always_on_top);
        assert_eq!(original.ui.auto_copy, loaded.ui.auto_copy);
    }

    /// `load_from` on a non-existent path must return `Default` without error.
    #[test]
    fn load_missing_returns_default() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("nonexistent.toml");

        let config = AppConfig::load_from(&path).expect("should not error");
        let default = AppConfig::default();

        assert_eq!(config.hotkey.snip_key, default.hotkey.snip_key);
        assert_eq!(config.bridge.port, default.bridge.port);
        assert_eq!(config.engine.base_url, default.engine.base_url);
    }

    /// Default values used throughout the rest of the crate.
    #[test]
    fn default_values() {
        let cfg = AppConfig::default();

        assert_eq!(cfg.hotkey.snip_key, "F2");
        assert_eq!(cfg.hotkey.mobile_key, "F3");
        assert_eq!(cfg.bridge.port, 8989);
        assert_eq!(cfg.engine.kind, "http");
        assert_eq!(cfg.engine.base_url, "http://127.0.0.1:8502");
        assert_eq!(cfg.engine.timeout_secs, 30);
        assert_eq!(cfg.capture.min_selection_px, 5.0);
        assert!(cfg.ui.always_on_top);
        assert!(cfg.ui.auto_copy);
    }

    /// Verify that modified non-default values survive a round trip.
    #[test]
    fn round_trip_modified_values() {
        let dir = tempdir().expect("temp dir");
        let path = dir.path().join("modified.toml");

        let mut cfg = AppConfig::default();
        cfg.hotkey.snip_key = "F6".into();
        cfg.bridge.port = 0;
        cfg.engine.base_url = "http://192.168.1.20:9000".into();
        cfg.engine.timeout_secs = 5;
        cfg.capture.min_selection_px = 12.0;
        cfg.ui.window_position = Some((100.0, 200.0));
        cfg.ui.auto_copy = false;

        cfg.save_to(&path).expect("save");
        let loaded = AppConfig::load_from(&path).expect("load");

        assert_eq!(loaded.hotkey.snip_key, "F6");
        assert_eq!(loaded.bridge.port, 0);
        assert_eq!(loaded.engine.base_url, "http://192.168.1.20:9000");
        assert_eq!(loaded.engine.timeout_secs, 5);
        assert_eq!(loaded.capture.min_selection_px, 12.0);
        assert_eq!(loaded.ui.window_position, Some((100.0, 200.0)));
        assert!(!loaded.ui.auto_copy);
    }
}
