use clap::Parser;
use std::path::PathBuf;

#[derive(Debug, Clone, Parser)]
#[command(
    name = "dockside",
    version,
    about = "A keyboard-driven terminal dashboard for Docker containers."
)]
pub struct CliArgs {
    /// Container list auto-refresh interval in seconds
    #[arg(long, default_value_t = 10)]
    pub refresh_secs: u64,

    /// Number of log lines loaded when opening the logs view
    #[arg(long, default_value_t = 100)]
    pub log_tail: usize,

    /// tracing filter (for example: info,debug,trace)
    #[arg(long, default_value = "info")]
    pub log_filter: String,

    /// Append tracing output to this file instead of discarding it
    #[arg(long)]
    pub log_file: Option<PathBuf>,

    /// Keybinding config file (defaults to $DOCKSIDE_CONFIG or dockside.yaml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}

#[cfg(test)]
mod tests {
    use super::CliArgs;
    use clap::Parser;

    #[test]
    fn defaults_match_session_settings() {
        let args = CliArgs::parse_from(["dockside"]);
        assert_eq!(args.refresh_secs, 10);
        assert_eq!(args.log_tail, 100);
        assert_eq!(args.log_filter, "info");
        assert!(args.config.is_none());
    }

    #[test]
    fn accepts_overrides() {
        let args = CliArgs::parse_from([
            "dockside",
            "--refresh-secs",
            "3",
            "--log-tail",
            "500",
            "-c",
            "/tmp/dockside.yaml",
        ]);
        assert_eq!(args.refresh_secs, 3);
        assert_eq!(args.log_tail, 500);
        assert_eq!(
            args.config.as_deref(),
            Some(std::path::Path::new("/tmp/dockside.yaml"))
        );
    }
}
