//! Provisioning configuration
//!
//! A [`ProvisionConfig`] is constructed once per invocation and handed to every
//! component. It is layered as: built-in defaults, then an optional TOML file
//! (`--config <path>` or `<workspace>/mbx.toml`), then the environment
//! (`MBX_UPSTREAM_*` and the SDK location variable), then CLI flags applied by
//! the caller.
//!
//! The overlay manifest and the staging name are deliberately absent from the
//! file format; they ship with the tool.

use crate::errors::{CommandError, ConfigError, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, instrument};

/// Default upstream overlay repository
pub const DEFAULT_UPSTREAM_URL: &str = "https://github.com/earvinpiamonte/mbx-gulp.git";
/// Default upstream revision; always tracks the branch tip
pub const DEFAULT_UPSTREAM_REF: &str = "main";
/// Config file looked up in the workspace root when `--config` is not given
pub const CONFIG_FILE_NAME: &str = "mbx.toml";

/// Fixed paths inside a workspace
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkspaceLayout {
    root: PathBuf,
}

impl WorkspaceLayout {
    pub const BUILD_DESCRIPTOR: &'static str = "build.xml";
    pub const LOCAL_PROPERTIES: &'static str = "local.properties";
    pub const PLATFORMS_DIR: &'static str = "platforms";
    pub const VCS_DIR: &'static str = ".git";
    pub const VCS_STAGING: &'static str = ".git.mbx-backup";
    pub const PACKAGE_MANIFEST: &'static str = "package.json";
    pub const OVERLAY_README: &'static str = "README.md";
    /// Leftover engine sources removed after the native build on a fresh install
    pub const STRAY_PATHS: &'static [&'static str] =
        &["platforms/android/src/org/crosswalk/engine"];

    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn build_descriptor(&self) -> PathBuf {
        self.root.join(Self::BUILD_DESCRIPTOR)
    }

    pub fn local_properties(&self) -> PathBuf {
        self.root.join(Self::LOCAL_PROPERTIES)
    }

    pub fn platforms_dir(&self) -> PathBuf {
        self.root.join(Self::PLATFORMS_DIR)
    }

    /// Canonical location of the workspace's version-control metadata
    pub fn vcs_dir(&self) -> PathBuf {
        self.root.join(Self::VCS_DIR)
    }

    /// Staging location used while the history is protected
    pub fn vcs_staging(&self) -> PathBuf {
        self.root.join(Self::VCS_STAGING)
    }

    pub fn package_manifest(&self) -> PathBuf {
        self.root.join(Self::PACKAGE_MANIFEST)
    }

    pub fn overlay_readme(&self) -> PathBuf {
        self.root.join(Self::OVERLAY_README)
    }

    pub fn stray_paths(&self) -> Vec<PathBuf> {
        Self::STRAY_PATHS.iter().map(|p| self.root.join(p)).collect()
    }
}

/// Where the overlay is fetched from
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpstreamSource {
    pub url: String,
    pub reference: String,
}

impl Default for UpstreamSource {
    fn default() -> Self {
        Self {
            url: DEFAULT_UPSTREAM_URL.to_string(),
            reference: DEFAULT_UPSTREAM_REF.to_string(),
        }
    }
}

/// External programs invoked as opaque commands
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    /// Version control invocation used for the overlay fetch; subcommands are appended
    pub git: Vec<String>,
    /// Native build invocation (program followed by arguments)
    pub native_build: Vec<String>,
    /// Package manager install invocation
    pub package_install: Vec<String>,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self {
            git: vec!["git".to_string()],
            native_build: vec![
                "ant".to_string(),
                "build".to_string(),
                "-f".to_string(),
                WorkspaceLayout::BUILD_DESCRIPTOR.to_string(),
            ],
            package_install: vec!["npm".to_string(), "install".to_string()],
        }
    }
}

/// Complete configuration for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProvisionConfig {
    pub layout: WorkspaceLayout,
    pub upstream: UpstreamSource,
    pub toolchain: Toolchain,
    /// Environment variable naming the installed native SDK location
    pub sdk_env_var: String,
    /// Value of `sdk_env_var` captured when the configuration was resolved
    pub sdk_dir: Option<String>,
    /// Ask before running a build while version-control history is present
    pub confirm_when_history_present: bool,
}

impl ProvisionConfig {
    /// Built-in defaults for a workspace rooted at `root`
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            layout: WorkspaceLayout::new(root),
            upstream: UpstreamSource::default(),
            toolchain: Toolchain::default(),
            sdk_env_var: "ANDROID_HOME".to_string(),
            sdk_dir: None,
            confirm_when_history_present: true,
        }
    }

    /// Resolve the layered configuration for `root`.
    ///
    /// `explicit` must exist when given; the implicit `mbx.toml` is optional.
    #[instrument]
    pub fn load(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        let mut config = Self::new(root);

        let file = match explicit {
            Some(path) => {
                if !path.exists() {
                    return Err(ConfigError::NotFound {
                        path: path.display().to_string(),
                    }
                    .into());
                }
                Some(path.to_path_buf())
            }
            None => {
                let implicit = root.join(CONFIG_FILE_NAME);
                implicit.is_file().then_some(implicit)
            }
        };

        if let Some(path) = file {
            debug!("Loading configuration from {}", path.display());
            let contents = fs::read_to_string(&path).map_err(ConfigError::Io)?;
            let file_config = ConfigFile::parse(&contents)?;
            config.apply_file(file_config)?;
        }

        config.apply_env(|key| std::env::var(key).ok());
        debug!("Resolved configuration: {:?}", config);
        Ok(config)
    }

    /// Point the configuration at a different workspace root, keeping every other setting
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.layout = WorkspaceLayout::new(root);
        self
    }

    fn apply_file(&mut self, file: ConfigFile) -> Result<()> {
        if let Some(upstream) = file.upstream {
            if let Some(url) = upstream.url {
                self.upstream.url = url;
            }
            if let Some(reference) = upstream.reference {
                self.upstream.reference = reference;
            }
        }

        if let Some(commands) = file.commands {
            if let Some(git) = commands.git {
                self.toolchain.git = split_command_line(&git, "git")?;
            }
            if let Some(native_build) = commands.native_build {
                self.toolchain.native_build = split_command_line(&native_build, "native build")?;
            }
            if let Some(package_install) = commands.package_install {
                self.toolchain.package_install =
                    split_command_line(&package_install, "package install")?;
            }
        }

        if let Some(sdk) = file.sdk {
            if let Some(env_var) = sdk.env_var {
                self.sdk_env_var = env_var;
            }
        }

        if let Some(prompt) = file.prompt {
            if let Some(confirm) = prompt.confirm_when_history_present {
                self.confirm_when_history_present = confirm;
            }
        }

        Ok(())
    }

    fn apply_env(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(url) = lookup("MBX_UPSTREAM_URL").filter(|v| !v.trim().is_empty()) {
            self.upstream.url = url;
        }
        if let Some(reference) = lookup("MBX_UPSTREAM_REF").filter(|v| !v.trim().is_empty()) {
            self.upstream.reference = reference;
        }
        self.sdk_dir = lookup(&self.sdk_env_var);
    }
}

/// Split a configured command line into program and arguments
pub fn split_command_line(line: &str, purpose: &str) -> Result<Vec<String>> {
    let parts = shell_words::split(line).map_err(|e| ConfigError::Parsing {
        message: format!("Failed to parse {} command '{}': {}", purpose, line, e),
    })?;
    if parts.is_empty() {
        return Err(CommandError::EmptyCommand {
            purpose: purpose.to_string(),
        }
        .into());
    }
    Ok(parts)
}

/// On-disk representation of `mbx.toml`
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct ConfigFile {
    upstream: Option<UpstreamSection>,
    commands: Option<CommandsSection>,
    sdk: Option<SdkSection>,
    prompt: Option<PromptSection>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
struct UpstreamSection {
    url: Option<String>,
    reference: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct CommandsSection {
    git: Option<String>,
    native_build: Option<String>,
    package_install: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct SdkSection {
    env_var: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields, rename_all = "kebab-case")]
struct PromptSection {
    confirm_when_history_present: Option<bool>,
}

impl ConfigFile {
    fn parse(contents: &str) -> Result<Self> {
        toml::from_str(contents).map_err(|e| {
            ConfigError::Parsing {
                message: e.to_string(),
            }
            .into()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::MbxError;
    use std::collections::HashMap;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = ProvisionConfig::new("/ws");
        assert_eq!(config.upstream.url, DEFAULT_UPSTREAM_URL);
        assert_eq!(config.upstream.reference, "main");
        assert_eq!(config.toolchain.git, vec!["git"]);
        assert_eq!(config.toolchain.package_install, vec!["npm", "install"]);
        assert_eq!(config.sdk_env_var, "ANDROID_HOME");
        assert!(config.confirm_when_history_present);
        assert_eq!(config.layout.vcs_dir(), PathBuf::from("/ws/.git"));
        assert_eq!(
            config.layout.vcs_staging(),
            PathBuf::from("/ws/.git.mbx-backup")
        );
    }

    #[test]
    fn test_load_without_file_uses_defaults() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let config = ProvisionConfig::load(temp_dir.path(), None)?;
        assert_eq!(config.toolchain, Toolchain::default());
        assert_eq!(config.layout.root(), temp_dir.path());
        Ok(())
    }

    #[test]
    fn test_load_implicit_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            r#"
[upstream]
url = "/srv/mirror/mbx-gulp"

[commands]
native-build = "ant debug -f 'build file.xml'"
package-install = "npm ci"

[prompt]
confirm-when-history-present = false
"#,
        )?;

        let config = ProvisionConfig::load(temp_dir.path(), None)?;
        assert_eq!(config.upstream.url, "/srv/mirror/mbx-gulp");
        assert_eq!(config.upstream.reference, "main");
        assert_eq!(
            config.toolchain.native_build,
            vec!["ant", "debug", "-f", "build file.xml"]
        );
        assert_eq!(config.toolchain.package_install, vec!["npm", "ci"]);
        assert!(!config.confirm_when_history_present);
        Ok(())
    }

    #[test]
    fn test_load_explicit_missing_file() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        let missing = temp_dir.path().join("nope.toml");
        let err = ProvisionConfig::load(temp_dir.path(), Some(&missing)).unwrap_err();
        assert!(matches!(err, MbxError::Config(ConfigError::NotFound { .. })));
        Ok(())
    }

    #[test]
    fn test_manifest_is_not_configurable() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[overlay]\nmanifest = [\"src\"]\n",
        )?;
        let err = ProvisionConfig::load(temp_dir.path(), None).unwrap_err();
        assert!(matches!(err, MbxError::Config(ConfigError::Parsing { .. })));
        Ok(())
    }

    #[test]
    fn test_git_command_is_split_like_the_others() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(
            temp_dir.path().join(CONFIG_FILE_NAME),
            "[commands]\ngit = \"git -c 'core.autocrlf=false'\"\n",
        )?;

        let config = ProvisionConfig::load(temp_dir.path(), None)?;
        assert_eq!(
            config.toolchain.git,
            vec!["git", "-c", "core.autocrlf=false"]
        );
        Ok(())
    }

    #[test]
    fn test_blank_git_command_rejected() -> anyhow::Result<()> {
        let temp_dir = TempDir::new()?;
        fs::write(temp_dir.path().join(CONFIG_FILE_NAME), "[commands]\ngit = \" \"\n")?;

        let err = ProvisionConfig::load(temp_dir.path(), None).unwrap_err();
        assert!(matches!(
            err,
            MbxError::Command(CommandError::EmptyCommand { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_empty_command_rejected() {
        let err = split_command_line("   ", "native build").unwrap_err();
        assert!(matches!(
            err,
            MbxError::Command(CommandError::EmptyCommand { .. })
        ));
    }

    #[test]
    fn test_env_overrides() {
        let mut config = ProvisionConfig::new("/ws");
        let env: HashMap<&str, &str> = [
            ("MBX_UPSTREAM_URL", "file:///tmp/overlay"),
            ("MBX_UPSTREAM_REF", "develop"),
            ("ANDROID_HOME", "/opt/android-sdk"),
        ]
        .into_iter()
        .collect();
        config.apply_env(|key| env.get(key).map(|v| v.to_string()));
        assert_eq!(config.upstream.url, "file:///tmp/overlay");
        assert_eq!(config.upstream.reference, "develop");
        assert_eq!(config.sdk_dir.as_deref(), Some("/opt/android-sdk"));
    }

    #[test]
    fn test_with_root_keeps_settings() {
        let mut config = ProvisionConfig::new("/a");
        config.upstream.reference = "develop".to_string();
        let moved = config.with_root("/b");
        assert_eq!(moved.layout.root(), Path::new("/b"));
        assert_eq!(moved.upstream.reference, "develop");
    }
}
