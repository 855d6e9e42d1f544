/// Controls how ensemble files are loaded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LoadConfig {
    /// Maximum bytes accepted for an ensemble file.
    pub max_file_size: usize,
    /// When true, an ensemble file reached through a symlink is refused.
    pub reject_symlinks: bool,
    /// Maximum schema violation messages collected into one error.
    pub max_reported_violations: usize,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            max_file_size: 256 * 1024,
            reject_symlinks: true,
            max_reported_violations: 4,
        }
    }
}
