//! Ambient configuration: the two environment flags the core reads
//! directly, per spec.md §6 and `SPEC_FULL.md` §D. Everything else
//! (command-line flags, config-file loading) is external to this crate.

use std::env;

/// `CLICON_RESTCONF_PRETTY` and `CLICON_STREAM_TASKS`, read once at
/// startup. `CLICON_STREAM_TASKS` is the Rust-idiomatic rename of the
/// original's build-time `STREAM_FORK` macro (see `SPEC_FULL.md` §D).
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineConfig {
    /// Pretty-print the XML embedded in each SSE `data:` line.
    pub restconf_pretty: bool,
    /// Spawn each subscription onto its own task instead of running the
    /// event loop inline (blocking further requests on that connection).
    pub stream_tasks: bool,
}

impl EngineConfig {
    pub fn from_env() -> EngineConfig {
        EngineConfig {
            restconf_pretty: read_bool_env("CLICON_RESTCONF_PRETTY"),
            stream_tasks: read_bool_env("CLICON_STREAM_TASKS"),
        }
    }
}

fn read_bool_env(name: &str) -> bool {
    match env::var(name) {
        Ok(value) => matches!(value.trim().to_ascii_lowercase().as_str(), "1" | "true"),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_false_when_unset() {
        env::remove_var("CLICON_RESTCONF_PRETTY");
        env::remove_var("CLICON_STREAM_TASKS");
        let config = EngineConfig::from_env();
        assert!(!config.restconf_pretty);
        assert!(!config.stream_tasks);
    }

    #[test]
    fn reads_truthy_values_case_insensitively() {
        env::set_var("CLICON_RESTCONF_PRETTY", "True");
        env::set_var("CLICON_STREAM_TASKS", "1");
        let config = EngineConfig::from_env();
        assert!(config.restconf_pretty);
        assert!(config.stream_tasks);
        env::remove_var("CLICON_RESTCONF_PRETTY");
        env::remove_var("CLICON_STREAM_TASKS");
    }
}
