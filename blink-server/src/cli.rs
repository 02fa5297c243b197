use clap::Parser;

/// Blink Action Server
///
/// Serves a donation action over HTTP: metadata on GET, transaction requests on POST.
#[derive(Parser, PartialEq, Debug, Clone)]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// The server IP
    #[clap(long, env = "BLINK_BIND", default_value = "0.0.0.0")]
    pub bind: String,

    /// The server port
    #[clap(long, env = "BLINK_PORT", default_value = "4242")]
    pub port: u16,

    /// Path prefix of the action endpoints
    #[clap(long, default_value = "api/actions")]
    pub prefix: String,

    /// Address receiving the donations
    #[clap(long, env = "BLINK_RECIPIENT")]
    pub recipient: String,

    /// Chain id set on the produced transactions
    #[clap(long, default_value = "1")]
    pub chain_id: u64,

    /// Icon of the donation action. Absolute http(s) URL or root-relative path.
    #[clap(long, default_value = "https://ethereum.org/images/favicon.png")]
    pub icon: String,

    /// Enable verbose logging.
    #[clap(long)]
    pub verbose: bool,
}

impl Cli {
    /// Path the donation action is served under.
    pub fn donate_path(&self) -> String {
        format!("/{}/donate", self.prefix.trim_matches('/'))
    }
}
