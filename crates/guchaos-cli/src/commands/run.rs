use clap::Args;
use guchaos_core::{
    Convergence, CycleError, ENTROPY_AVAIL_PATH, Event, HttpSource, LoopOptions, Outcome,
    POOLSIZE_PATH, ProcStatusReader, RANDOM_DEVICE_PATH, RandomDevice,
};

use super::{EXIT_FAILURE, EXIT_OK, KeyArgs, SourceArgs};

#[derive(Args, Debug, Clone)]
pub struct RunArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub key: KeyArgs,

    /// Random device receiving the RNDADDENTROPY ioctl
    #[arg(long, default_value = RANDOM_DEVICE_PATH)]
    pub device: String,

    /// Counter with the currently available entropy
    #[arg(long, default_value = ENTROPY_AVAIL_PATH)]
    pub entropy_avail: String,

    /// Counter with the pool size
    #[arg(long, default_value = POOLSIZE_PATH)]
    pub poolsize: String,

    /// Give up after this many fetch cycles (default: keep going until full)
    #[arg(long)]
    pub max_cycles: Option<u64>,
}

pub fn run(args: &RunArgs) -> u8 {
    println!("[+] guchaos version {}", guchaos_core::VERSION);

    let Some(key) = super::parse_key(&args.key.key) else {
        return EXIT_FAILURE;
    };
    let source = match HttpSource::new(args.source.fetch_config()) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("[-] {e}");
            return EXIT_FAILURE;
        }
    };
    let host = source.config().host.clone();
    let options = LoopOptions {
        max_cycles: args.max_cycles,
        mode: args.key.mode(),
    };
    log::debug!("loop options: {options:?}, fetch: {:?}", source.config());

    let mut feeder = Convergence::new(
        ProcStatusReader::new(&args.entropy_avail, &args.poolsize),
        source,
        RandomDevice::new(&args.device),
        key,
        options,
    );
    let result = feeder.run(|event| {
        if let Some(line) = describe(&event, &host) {
            println!("{line}");
        }
    });
    report(&result)
}

/// Operator-facing line for a loop event, if it warrants one.
fn describe(event: &Event<'_>, host: &str) -> Option<String> {
    match *event {
        Event::StatusChecked {
            status,
            quiet: true,
        } if !status.is_full() => Some(format!("[+] Retrieve random bytes from http://{host}")),
        Event::StatusChecked {
            status,
            quiet: false,
        } => Some(format!("    (status: {status})")),
        Event::Transformed { wide, .. } => preview(wide).map(|p| format!("[+] Adding {p}")),
        _ => None,
    }
}

fn preview(wide: &[u32]) -> Option<String> {
    match wide {
        [_, a, b, .., last] => Some(format!("0x{a:<8x} 0x{b:<8x} ... 0x{last:<8x}")),
        _ => None,
    }
}

/// Print the final line and map the result to an exit code.
fn report(result: &Result<Outcome, CycleError>) -> u8 {
    match result {
        Ok(outcome) => {
            println!(
                "[+] Available entropy is set to the maximum ({})",
                outcome.status.capacity
            );
            log::info!("pool full after {} cycles", outcome.cycles);
            EXIT_OK
        }
        Err(e) => {
            eprintln!("[-] {e}");
            EXIT_FAILURE
        }
    }
}
