//! External tool detection and management.
//!
//! The [`ToolRegistry`] discovers and caches the locations of the external
//! CLI tools discprobe shells out to (mediainfo, bdinfo, ffprobe, ffmpeg,
//! mount, umount) and provides lookup methods for the rest of the crate.

use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::ToolsConfig;
use crate::error::{Error, Result};

/// Known tool names that the registry manages.
const KNOWN_TOOLS: &[&str] = &["mediainfo", "bdinfo", "ffprobe", "ffmpeg", "mount", "umount"];

/// Availability information for a tool, returned by [`ToolRegistry::check_all`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolInfo {
    /// Tool name.
    pub name: String,
    /// Whether the tool was found.
    pub available: bool,
    /// Version string (first line of version output), if available.
    pub version: Option<String>,
    /// Resolved path to the executable.
    pub path: Option<PathBuf>,
}

/// Registry holding discovered tool locations.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    tools: HashMap<String, PathBuf>,
}

impl ToolRegistry {
    /// Discover tools by searching `PATH` (or using overrides from config).
    ///
    /// For each known tool, if the [`ToolsConfig`] supplies a custom path
    /// **and** that path exists, it is used directly. Otherwise
    /// [`which::which`] is used to locate the tool in `PATH`. Tools that are
    /// not found are silently omitted from the registry; callers hit the
    /// error from [`ToolRegistry::require`] when they actually need one.
    pub fn discover(tools_config: &ToolsConfig) -> Self {
        let mut tools = HashMap::new();

        for &name in KNOWN_TOOLS {
            let custom_path = match name {
                "mediainfo" => tools_config.mediainfo_path.as_deref(),
                "bdinfo" => tools_config.bdinfo_path.as_deref(),
                "ffprobe" => tools_config.ffprobe_path.as_deref(),
                "ffmpeg" => tools_config.ffmpeg_path.as_deref(),
                "mount" => tools_config.mount_path.as_deref(),
                "umount" => tools_config.umount_path.as_deref(),
                _ => None,
            };

            let resolved = if let Some(p) = custom_path {
                if p.exists() {
                    Some(p.to_path_buf())
                } else {
                    // Custom path does not exist; fall back to PATH.
                    which::which(name).ok()
                }
            } else {
                which::which(name).ok()
            };

            if let Some(path) = resolved {
                tools.insert(name.to_string(), path);
            }
        }

        Self { tools }
    }

    /// Return the executable path for the given tool, or an [`Error::Tool`]
    /// naming the config key to set if the tool was not found.
    pub fn require(&self, name: &str) -> Result<&Path> {
        self.tools.get(name).map(PathBuf::as_path).ok_or_else(|| {
            Error::Tool {
                tool: name.to_string(),
                message: format!("{name} not found; set tools.{name}_path or add it to PATH"),
            }
        })
    }

    /// Check all known tools and return availability information.
    pub fn check_all(&self) -> Vec<ToolInfo> {
        KNOWN_TOOLS
            .iter()
            .map(|&name| {
                if let Some(path) = self.tools.get(name) {
                    let version = detect_version(name, path);
                    ToolInfo {
                        name: name.to_string(),
                        available: true,
                        version,
                        path: Some(path.clone()),
                    }
                } else {
                    ToolInfo {
                        name: name.to_string(),
                        available: false,
                        version: None,
                        path: None,
                    }
                }
            })
            .collect()
    }

    /// Iterate over all registered tools.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &PathBuf)> {
        self.tools.iter()
    }
}

/// Run `<tool> --version` (or `-version` for ffmpeg/ffprobe) and return the
/// first line of stdout.
fn detect_version(name: &str, path: &Path) -> Option<String> {
    let version_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        _ => "--version",
    };

    let output = std::process::Command::new(path)
        .arg(version_arg)
        .output()
        .ok()?;

    if !output.status.success() {
        return None;
    }

    String::from_utf8_lossy(&output.stdout)
        .lines()
        .next()
        .map(|s| s.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn discover_with_default_config() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        // We cannot guarantee any tool is installed in CI,
        // but the call itself must not panic.
        let _ = registry.check_all();
    }

    #[test]
    fn require_missing_tool_returns_error() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        let result = registry.require("nonexistent_tool_xyz");
        assert!(result.is_err());
        let msg = result.unwrap_err().to_string();
        assert!(msg.contains("tools.nonexistent_tool_xyz_path"));
    }

    #[test]
    fn check_all_returns_known_tools() {
        let cfg = ToolsConfig::default();
        let registry = ToolRegistry::discover(&cfg);
        let infos = registry.check_all();
        let names: Vec<&str> = infos.iter().map(|i| i.name.as_str()).collect();
        assert!(names.contains(&"mediainfo"));
        assert!(names.contains(&"bdinfo"));
        assert!(names.contains(&"ffprobe"));
        assert!(names.contains(&"ffmpeg"));
        assert!(names.contains(&"mount"));
        assert!(names.contains(&"umount"));
    }

    #[test]
    fn custom_path_wins_when_it_exists() {
        let file = tempfile::NamedTempFile::new().unwrap();
        let cfg = ToolsConfig {
            mediainfo_path: Some(file.path().to_path_buf()),
            ..Default::default()
        };
        let registry = ToolRegistry::discover(&cfg);
        assert_eq!(registry.require("mediainfo").unwrap(), file.path());
    }
}
