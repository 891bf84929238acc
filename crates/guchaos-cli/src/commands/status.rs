use clap::Args;
use guchaos_core::{
    ENTROPY_AVAIL_PATH, EntropyStatus, POOLSIZE_PATH, ProcStatusReader, StatusReader,
};

use super::{EXIT_FAILURE, EXIT_OK};

#[derive(Args, Debug, Clone)]
pub struct StatusArgs {
    /// Print the reading as JSON
    #[arg(long)]
    pub json: bool,

    /// Counter with the currently available entropy
    #[arg(long, default_value = ENTROPY_AVAIL_PATH)]
    pub entropy_avail: String,

    /// Counter with the pool size
    #[arg(long, default_value = POOLSIZE_PATH)]
    pub poolsize: String,
}

pub fn run(args: &StatusArgs) -> u8 {
    let mut reader = ProcStatusReader::new(&args.entropy_avail, &args.poolsize);
    let status = match reader.read_status() {
        Ok(status) => status,
        Err(e) => {
            eprintln!("[-] {e}");
            return EXIT_FAILURE;
        }
    };

    if args.json {
        println!("{}", to_json(&status));
    } else {
        let state = if status.is_full() { "full" } else { "needs more" };
        println!("Entropy: {status} bits ({state})");
    }
    EXIT_OK
}

fn to_json(status: &EntropyStatus) -> String {
    let mut value = serde_json::to_value(status).unwrap_or_default();
    value["full"] = serde_json::Value::Bool(status.is_full());
    serde_json::to_string_pretty(&value).unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_json_fields() {
        let json = to_json(&EntropyStatus {
            available: 200,
            capacity: 256,
        });
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["available"], 200);
        assert_eq!(value["capacity"], 256);
        assert_eq!(value["full"], false);
    }

    #[test]
    fn test_missing_counters_fail() {
        let dir = std::env::temp_dir().join("guchaos-status-test-does-not-exist");
        let args = StatusArgs {
            json: false,
            entropy_avail: dir.join("entropy_avail").display().to_string(),
            poolsize: dir.join("poolsize").display().to_string(),
        };
        assert_eq!(run(&args), EXIT_FAILURE);
    }
}
