use clap::Args;
use guchaos_core::{BatchSource, HttpSource, transform};

use super::{EXIT_FAILURE, EXIT_OK, KeyArgs, SourceArgs};

const WORDS_PER_LINE: usize = 8;

#[derive(Args, Debug, Clone)]
pub struct FetchArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub key: KeyArgs,

    /// Output format for the transformed 32-bit words
    #[arg(long, default_value = "hex", value_parser = ["hex", "dec"])]
    pub format: String,
}

pub fn run(args: &FetchArgs) -> u8 {
    let Some(key) = super::parse_key(&args.key.key) else {
        return EXIT_FAILURE;
    };
    let mut source = match HttpSource::new(args.source.fetch_config()) {
        Ok(source) => source,
        Err(e) => {
            eprintln!("[-] {e}");
            return EXIT_FAILURE;
        }
    };
    let narrow = match source.fetch_batch() {
        Ok(narrow) => narrow,
        Err(e) => {
            eprintln!("[-] {}: {e}", args.source.host);
            return EXIT_FAILURE;
        }
    };
    let wide = transform(narrow, &key, args.key.mode());
    for line in render(&wide, &args.format) {
        println!("{line}");
    }
    EXIT_OK
}

fn render(wide: &[u32], format: &str) -> Vec<String> {
    wide.chunks(WORDS_PER_LINE)
        .map(|row| {
            row.iter()
                .map(|w| match format {
                    "dec" => format!("{w:>10}"),
                    _ => format!("{w:08x}"),
                })
                .collect::<Vec<_>>()
                .join(" ")
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_hex_rows() {
        let wide: Vec<u32> = (0..10).collect();
        let lines = render(&wide, "hex");
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("00000000 00000001"));
        assert_eq!(lines[1], "00000008 00000009");
    }

    #[test]
    fn test_render_dec() {
        let lines = render(&[u32::MAX, 7], "dec");
        assert_eq!(lines, vec!["4294967295          7"]);
    }
}
