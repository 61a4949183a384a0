//! Candidate store discovery.
//!
//! The pipeline only needs an ordered list of paths to try. How they are found
//! (an explicit list, a profile scan) is behind [`StoreLocator`].

use std::fs;
use std::path::{Path, PathBuf};

use ini::Ini;
use tracing::{debug, trace};

/// Store file inside a profile directory.
pub const STORE_RELATIVE_PATH: [&str; 2] = ["calendar-data", "local.sqlite"];

/// Profile registry kept by the client at the top of its profile root.
pub const PROFILES_INI: &str = "profiles.ini";

/// Supplies candidate store paths, most likely first.
pub trait StoreLocator {
    fn candidates(&self) -> Vec<PathBuf>;
}

/// An explicit list of stores, tried in the given order.
#[derive(Debug, Clone, Default)]
pub struct FixedLocator {
    paths: Vec<PathBuf>,
}

impl FixedLocator {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        Self {
            paths: paths.into_iter().collect(),
        }
    }
}

impl StoreLocator for FixedLocator {
    fn candidates(&self) -> Vec<PathBuf> {
        self.paths.clone()
    }
}

/// Finds stores under a client profile root.
///
/// The profiles marked default in `profiles.ini` come first: the per-install
/// `Default=` paths, then `[Profile*]` sections with `Default=1` (honouring
/// `IsRelative`). Every other `*/calendar-data/local.sqlite` under the root
/// follows, larger stores first (an active profile accumulates more events
/// than a stale one) and equal sizes ordered by path.
#[derive(Debug, Clone)]
pub struct ProfileScanLocator {
    root: PathBuf,
}

impl ProfileScanLocator {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// `~/.thunderbird`, if a home directory is known.
    pub fn thunderbird_default() -> Option<Self> {
        dirs::home_dir().map(|home| Self::new(home.join(".thunderbird")))
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stores of the profiles `profiles.ini` marks as default, in file order.
    /// A missing or unparsable registry yields none.
    pub fn default_stores(&self) -> Vec<PathBuf> {
        let ini_path = self.root.join(PROFILES_INI);
        let ini = match Ini::load_from_file(&ini_path) {
            Ok(ini) => ini,
            Err(e) => {
                debug!(path = %ini_path.display(), error = %e, "no usable profile registry");
                return Vec::new();
            }
        };

        let mut installs = Vec::new();
        let mut profiles = Vec::new();
        for (section, props) in &ini {
            let Some(section) = section else { continue };
            if section.starts_with("Install") {
                if let Some(path) = props.get("Default") {
                    installs.push(self.root.join(path));
                }
            } else if section.starts_with("Profile") && props.get("Default") == Some("1") {
                let Some(path) = props.get("Path") else { continue };
                let relative = props.get("IsRelative").map_or(true, |v| v.trim() != "0");
                profiles.push(if relative {
                    self.root.join(path)
                } else {
                    PathBuf::from(path)
                });
            }
        }

        let mut stores: Vec<PathBuf> = Vec::new();
        for profile in installs.into_iter().chain(profiles) {
            let store = store_path(profile);
            if !store.is_file() {
                trace!(path = %store.display(), "default profile has no store");
                continue;
            }
            if !stores.contains(&store) {
                stores.push(store);
            }
        }
        stores
    }

    /// Every profile store under the root, by size then path.
    fn scanned_stores(&self) -> Vec<PathBuf> {
        let entries = match fs::read_dir(&self.root) {
            Ok(entries) => entries,
            Err(e) => {
                debug!(root = %self.root.display(), error = %e, "profile root not readable");
                return Vec::new();
            }
        };

        let mut found: Vec<(u64, PathBuf)> = entries
            .filter_map(|entry| entry.ok())
            .map(|entry| store_path(entry.path()))
            .filter_map(|path| match fs::metadata(&path) {
                Ok(meta) if meta.is_file() => Some((meta.len(), path)),
                _ => {
                    trace!(path = %path.display(), "no store in profile");
                    None
                }
            })
            .collect();

        found.sort_by(|(size_a, path_a), (size_b, path_b)| {
            size_b.cmp(size_a).then_with(|| path_a.cmp(path_b))
        });
        found.into_iter().map(|(_, path)| path).collect()
    }
}

impl StoreLocator for ProfileScanLocator {
    fn candidates(&self) -> Vec<PathBuf> {
        let mut candidates = self.default_stores();
        let defaults = candidates.len();
        for path in self.scanned_stores() {
            if !candidates.contains(&path) {
                candidates.push(path);
            }
        }

        debug!(
            root = %self.root.display(),
            defaults,
            stores = candidates.len(),
            "scanned profiles"
        );
        candidates
    }
}

fn store_path(profile: PathBuf) -> PathBuf {
    STORE_RELATIVE_PATH.iter().fold(profile, |p, c| p.join(c))
}
