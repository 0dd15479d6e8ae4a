//! Environment lookup used by the default resolver.

use std::collections::HashMap;
use std::path::PathBuf;

/// Source of environment overrides and host facts.
///
/// Empty values are treated the same as unset ones.
pub trait EnvSource {
    /// Value of an environment variable
    fn var(&self, key: &str) -> Option<String>;

    /// Home directory of the invoking user
    fn home_dir(&self) -> Option<PathBuf> {
        self.var("HOME").map(PathBuf::from)
    }

    /// Login name of the invoking user
    fn login_name(&self) -> Option<String> {
        self.var("USER")
    }
}

/// The real process environment
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessEnv;

impl EnvSource for ProcessEnv {
    fn var(&self, key: &str) -> Option<String> {
        std::env::var(key).ok().filter(|value| !value.is_empty())
    }

    fn home_dir(&self) -> Option<PathBuf> {
        dirs::home_dir()
    }

    #[cfg(unix)]
    fn login_name(&self) -> Option<String> {
        users::get_current_username()
            .and_then(|name| name.into_string().ok())
            .or_else(|| self.var("USER"))
    }

    #[cfg(not(unix))]
    fn login_name(&self) -> Option<String> {
        self.var("USERNAME")
    }
}

impl EnvSource for HashMap<String, String> {
    fn var(&self, key: &str) -> Option<String> {
        self.get(key).filter(|value| !value.is_empty()).cloned()
    }
}
