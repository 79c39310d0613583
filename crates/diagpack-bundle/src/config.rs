//! Bundler configuration.

use std::path::PathBuf;

use diagpack_core::RenderOptions;

/// Default mode for created bundle directories, before umask.
pub const DEFAULT_DIR_MODE: u32 = 0o777;

/// Knobs for [`crate::DiagnosticBundler`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundlerConfig {
    /// How log records are rendered into the `.log` file.
    pub render: RenderOptions,
    /// Permission bits for directories created on unix hosts.
    pub dir_mode: u32,
    /// Where the archive is staged before the final rename.
    ///
    /// `None` stages next to the bundle directory.
    pub staging_dir: Option<PathBuf>,
}

impl Default for BundlerConfig {
    fn default() -> Self {
        Self {
            render: RenderOptions::diagnostic(),
            dir_mode: DEFAULT_DIR_MODE,
            staging_dir: None,
        }
    }
}

impl BundlerConfig {
    /// Override the archive staging directory.
    #[must_use]
    pub fn with_staging_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.staging_dir = Some(dir.into());
        self
    }
}
