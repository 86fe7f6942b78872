use clap::{arg, Arg, Command};

#[derive(Debug)]
pub struct Args {
    pub logdir: Option<String>,
    pub log_level: String,
    pub worker_threads: Option<usize>,
}

pub fn cli() -> Command {
    Command::new("householdiqd")
        .about(format!("{} v{}", env!("CARGO_PKG_DESCRIPTION"), env!("CARGO_PKG_VERSION")))
        .version(env!("CARGO_PKG_VERSION"))
        .arg(arg!(--logdir <LOG_DIR> "Directory to log output."))
        .arg(
            Arg::new("log_level")
                .short('d')
                .long("loglevel")
                .value_name("log_level")
                .default_value("info")
                .num_args(0..=1)
                .require_equals(true)
                .help("Specify log level."),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .value_name("threads")
                .num_args(0..=1)
                .require_equals(true)
                .help("Number of async worker threads (default: derived from the CPU count)."),
        )
}

impl Args {
    pub fn parse() -> Args {
        let m = cli().get_matches();
        Args {
            logdir: m.get_one::<String>("logdir").cloned(),
            log_level: m.get_one::<String>("log_level").cloned().unwrap(),
            worker_threads: m.get_one::<String>("threads").and_then(|threads| threads.parse().ok()),
        }
    }
}
