use anyhow::Context;
use clap::{Args, Parser, Subcommand};
use hindsight_proto3::{Proto3Codec, WriterConfig, LARGE_FIELD_THRESHOLD};
use hindsight_protocol::Span;
use serde::Deserialize;
use std::fs::File;
use std::io::{self, Read, Write};
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "hindsight-encode")]
#[command(about = "Encode spans to proto3 ListOfSpans bytes", long_about = None)]
struct Cli {
    /// Encoded field size above which a warning is logged
    #[arg(
        long,
        global = true,
        env = "HINDSIGHT_LARGE_FIELD_THRESHOLD",
        default_value_t = LARGE_FIELD_THRESHOLD
    )]
    large_field_threshold: usize,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode JSON spans as a proto3 ListOfSpans message
    Encode {
        #[command(flatten)]
        input: InputArgs,

        /// Write to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Emit lowercase hex instead of raw bytes
        #[arg(long)]
        hex: bool,
    },
    /// Print the encoded size of each span
    Size {
        #[command(flatten)]
        input: InputArgs,
    },
}

#[derive(Args)]
struct InputArgs {
    /// JSON file holding a span or an array of spans (stdin when omitted)
    #[arg(short, long)]
    input: Option<PathBuf>,
}

/// Accepts either a single span object or an array of spans
#[derive(Deserialize)]
#[serde(untagged)]
enum SpansJson {
    Many(Vec<Span>),
    One(Box<Span>),
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();
    let codec = Proto3Codec::with_config(WriterConfig {
        large_field_threshold: cli.large_field_threshold,
    });

    match cli.command {
        Commands::Encode { input, output, hex } => {
            let spans = read_spans(&input)?;
            let bytes = codec.encode_list(&spans);
            tracing::debug!("encoded {} spans into {} bytes", spans.len(), bytes.len());
            let bytes = if hex {
                let mut text = hex::encode(bytes).into_bytes();
                text.push(b'\n');
                text
            } else {
                bytes
            };
            write_output(output.as_ref(), &bytes)
        }
        Commands::Size { input } => {
            let spans = read_spans(&input)?;
            let mut stdout = io::stdout().lock();
            for span in &spans {
                writeln!(
                    stdout,
                    "{}/{}\t{}",
                    span.trace_id,
                    span.id,
                    codec.size_in_bytes(span)
                )?;
            }
            Ok(())
        }
    }
}

fn read_spans(args: &InputArgs) -> anyhow::Result<Vec<Span>> {
    let mut json = String::new();
    match &args.input {
        Some(path) => {
            File::open(path)
                .with_context(|| format!("failed to open {}", path.display()))?
                .read_to_string(&mut json)
                .with_context(|| format!("failed to read {}", path.display()))?;
        }
        None => {
            io::stdin()
                .read_to_string(&mut json)
                .context("failed to read stdin")?;
        }
    }
    parse_spans(&json)
}

fn parse_spans(json: &str) -> anyhow::Result<Vec<Span>> {
    let spans = match serde_json::from_str(json).context("invalid span json")? {
        SpansJson::Many(spans) => spans,
        SpansJson::One(span) => vec![*span],
    };
    Ok(spans)
}

fn write_output(path: Option<&PathBuf>, bytes: &[u8]) -> anyhow::Result<()> {
    match path {
        Some(path) => std::fs::write(path, bytes)
            .with_context(|| format!("failed to write {}", path.display())),
        None => {
            let mut stdout = io::stdout().lock();
            stdout.write_all(bytes)?;
            stdout.flush()?;
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn parses_single_span_and_array() {
        let one = parse_spans(r#"{"traceId": "1", "id": "2"}"#).unwrap();
        assert_eq!(one.len(), 1);
        assert_eq!(one[0].trace_id.as_str(), "0000000000000001");

        let many = parse_spans(r#"[{"traceId": "1", "id": "2"}, {"traceId": "3", "id": "4"}]"#)
            .unwrap();
        assert_eq!(many.len(), 2);
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(parse_spans(r#"{"traceId": "XYZ", "id": "2"}"#).is_err());
    }

    #[test]
    fn encode_subcommand_flags() {
        let cli = Cli::try_parse_from([
            "hindsight-encode",
            "--large-field-threshold",
            "64",
            "encode",
            "--hex",
            "-i",
            "spans.json",
        ])
        .unwrap();
        assert_eq!(cli.large_field_threshold, 64);
        match cli.command {
            Commands::Encode { input, output, hex } => {
                assert!(hex);
                assert_eq!(output, None);
                assert_eq!(input.input, Some(PathBuf::from("spans.json")));
            }
            Commands::Size { .. } => panic!("expected encode"),
        }
    }
}
