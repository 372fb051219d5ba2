//! Command-line surface for bletool
//!
//!   bletool [-r]            scan and dump advertising payloads (default)
//!   bletool -s HEX          advertise HEX after the fixed preamble for a second
//!   bletool -h | --help     usage

use bletool::FilterPolicy;
use clap::{ArgAction, ArgGroup, Parser, ValueEnum};

#[derive(Parser, Debug)]
#[command(name = "bletool")]
#[command(about = "BLE advertise and scan tool", long_about = None)]
#[command(version)]
#[command(group(ArgGroup::new("mode").args(["read", "send"]).multiple(false)))]
pub struct Cli {
    /// Receive mode: scan and print every advertising payload (default)
    #[arg(short = 'r', long = "read")]
    pub read: bool,

    /// Send mode: advertise the given hex string after the fixed preamble
    #[arg(short = 's', long = "send", value_name = "HEX")]
    pub send: Option<String>,

    /// Adapter to use; falls back to the first adapter that is up
    #[arg(short = 'd', long, env = "BLETOOL_DEVICE", default_value = "hci0")]
    pub device: String,

    /// What to do with a hex string of odd length
    #[arg(long, value_enum, env = "BLETOOL_ODD_HEX", default_value_t = OddHexPolicy::Reject)]
    pub odd_hex: OddHexPolicy,

    /// When the all-events filter is installed for command sends
    #[arg(long, value_enum, env = "BLETOOL_FILTER_POLICY", default_value_t = FilterPolicyArg::PerCommand)]
    pub filter_policy: FilterPolicyArg,

    /// How long advertising stays on in send mode, in milliseconds
    #[arg(long, default_value_t = 1000)]
    pub dwell_ms: u64,

    /// Minimum advertising interval, in units of 0.625 ms
    #[arg(long, default_value_t = 32)]
    pub min_interval: u16,

    /// Maximum advertising interval, in units of 0.625 ms
    #[arg(long, default_value_t = 64)]
    pub max_interval: u16,

    /// More log output (-v info, -vv debug, -vvv trace); RUST_LOG overrides
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OddHexPolicy {
    /// Refuse the input
    Reject,
    /// Drop the trailing nibble
    Truncate,
}

#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum FilterPolicyArg {
    PerCommand,
    PerSession,
}

impl From<FilterPolicyArg> for FilterPolicy {
    fn from(arg: FilterPolicyArg) -> Self {
        match arg {
            FilterPolicyArg::PerCommand => FilterPolicy::PerCommand,
            FilterPolicyArg::PerSession => FilterPolicy::PerSession,
        }
    }
}
