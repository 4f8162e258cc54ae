/// Logging setup for the binary, env_logger on stderr
/// The level is read from `DRUMBOX_LOG` using env_logger's filter syntax
/// (`debug`, `drumbox::sequencer=trace`, ...) and defaults to info

/// Environment variable holding the log filter.
pub const LEVEL_VAR: &str = "DRUMBOX_LOG";

pub fn init() -> Result<(), log::SetLoggerError> {
    env_logger::Builder::from_env(env_logger::Env::default().filter_or(LEVEL_VAR, "info"))
        .try_init()
}
