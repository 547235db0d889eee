use clap::Parser;

#[derive(Parser, Debug)]
#[command(name = "trafficwatch")]
#[command(about = "Monthly network traffic quota monitor", long_about = None)]
pub struct Args {
    /// Config file path, created with defaults if missing
    #[arg(short, long, default_value = "trafficwatch.toml", env = "TRAFFICWATCH_CONFIG")]
    pub config: String,

    /// Override the monitored network interface
    #[arg(short, long, env = "TRAFFICWATCH_INTERFACE")]
    pub interface: Option<String>,

    /// Override log level (trace, debug, info, warn, error)
    #[arg(long)]
    pub log_level: Option<String>,

    /// Override log directory
    #[arg(long)]
    pub log_dir: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_to_local_config_file() {
        let args = Args::try_parse_from(["trafficwatch"]).unwrap();
        assert_eq!(args.config, "trafficwatch.toml");
        assert!(args.interface.is_none());
    }

    #[test]
    fn parses_overrides() {
        let args = Args::try_parse_from([
            "trafficwatch",
            "-c",
            "/etc/trafficwatch.toml",
            "--interface",
            "ens3",
            "--log-level",
            "debug",
        ])
        .unwrap();
        assert_eq!(args.config, "/etc/trafficwatch.toml");
        assert_eq!(args.interface.as_deref(), Some("ens3"));
        assert_eq!(args.log_level.as_deref(), Some("debug"));
        assert!(args.log_dir.is_none());
    }
}
