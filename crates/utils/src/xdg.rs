use std::env;
use std::path::PathBuf;

/// XDG Base Directory paths for keylens
pub struct XdgPaths;

impl XdgPaths {
    /// Get XDG_CONFIG_HOME/keylens or fallback
    pub fn config_dir() -> PathBuf {
        env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".config"))
                    .unwrap_or_else(|| PathBuf::from(".config"))
            })
            .join("keylens")
    }

    /// Get XDG_DATA_HOME/keylens or fallback
    pub fn data_dir() -> PathBuf {
        env::var("XDG_DATA_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                dirs::home_dir()
                    .map(|home| home.join(".local/share"))
                    .unwrap_or_else(|| PathBuf::from(".local/share"))
            })
            .join("keylens")
    }

    /// The JSON configuration file
    pub fn config_file() -> PathBuf {
        Self::config_dir().join("config.json")
    }

    /// Directory holding rolled-up report snapshots
    pub fn snapshot_dir() -> PathBuf {
        Self::data_dir().join("snapshots")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_xdg_paths_with_env() {
        let config_orig = env::var("XDG_CONFIG_HOME").ok();
        let data_orig = env::var("XDG_DATA_HOME").ok();

        env::set_var("XDG_CONFIG_HOME", "/tmp/config");
        env::set_var("XDG_DATA_HOME", "/tmp/data");

        assert_eq!(XdgPaths::config_dir(), PathBuf::from("/tmp/config/keylens"));
        assert_eq!(
            XdgPaths::config_file(),
            PathBuf::from("/tmp/config/keylens/config.json")
        );
        assert_eq!(
            XdgPaths::snapshot_dir(),
            PathBuf::from("/tmp/data/keylens/snapshots")
        );

        match config_orig {
            Some(val) => env::set_var("XDG_CONFIG_HOME", val),
            None => env::remove_var("XDG_CONFIG_HOME"),
        }
        match data_orig {
            Some(val) => env::set_var("XDG_DATA_HOME", val),
            None => env::remove_var("XDG_DATA_HOME"),
        }
    }
}
