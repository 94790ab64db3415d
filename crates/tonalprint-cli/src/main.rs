// SPDX-License-Identifier: GPL-3.0-or-later
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use serde::Deserialize;
use serde_json::json;
use tonalprint_config::{load as load_config, AppConfig, TelemetryConfig};
use tonalprint_fingerprint::{AlgorithmTag, RawFingerprint, TextEncoding};
use tracing::{debug, info};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

#[derive(Parser)]
#[command(name = "tonalprint")]
#[command(about = "Compress, decode and compare audio fingerprints", long_about = None)]
struct Cli {
    /// TOML configuration file.
    #[arg(short, long, env = "TONALPRINT_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Compress a JSON fingerprint and print its transport form.
    Compress {
        /// Input file; stdin when omitted.
        input: Option<PathBuf>,
        /// Algorithm tag for bare JSON arrays.
        #[arg(short, long)]
        algorithm: Option<u32>,
        #[arg(short, long, value_enum)]
        encoding: Option<EncodingArg>,
    },
    /// Decode a compressed fingerprint into JSON.
    Decompress {
        input: Option<PathBuf>,
        #[arg(short, long, value_enum)]
        encoding: Option<EncodingArg>,
    },
    /// Print the similarity digest of a fingerprint.
    Digest { input: Option<PathBuf> },
    /// Compare the digests of two fingerprints.
    Compare {
        first: PathBuf,
        second: PathBuf,
        /// Largest digest distance still reported as similar.
        #[arg(short, long)]
        threshold: Option<u32>,
    },
    /// Print the library version.
    Version,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum EncodingArg {
    Base64,
    Raw,
}

impl From<EncodingArg> for TextEncoding {
    fn from(arg: EncodingArg) -> Self {
        match arg {
            EncodingArg::Base64 => TextEncoding::Base64,
            EncodingArg::Raw => TextEncoding::Raw,
        }
    }
}

/// JSON shapes accepted wherever a fingerprint is read.
#[derive(Deserialize)]
#[serde(untagged)]
enum FingerprintInput {
    Bare(Vec<u32>),
    Tagged(RawFingerprint),
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;
    init_tracing(&config.telemetry);

    let stdout = io::stdout();
    let mut out = stdout.lock();
    run(cli.command, &config, &mut out)?;
    out.flush()?;
    Ok(())
}

fn init_tracing(telemetry: &TelemetryConfig) {
    let env_filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&telemetry.log_level));
    let registry = tracing_subscriber::registry().with(env_filter);

    // stdout carries command output, so logs go to stderr.
    if telemetry.json {
        registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .init();
    } else {
        registry
            .with(
                fmt::layer()
                    .with_target(true)
                    .with_level(true)
                    .with_writer(io::stderr),
            )
            .init();
    }
}

fn run(command: Command, config: &AppConfig, out: &mut impl Write) -> Result<()> {
    let options = &config.fingerprint;
    match command {
        Command::Compress {
            input,
            algorithm,
            encoding,
        } => {
            let tag = algorithm
                .map(AlgorithmTag::new)
                .unwrap_or_else(|| options.algorithm.tag());
            let encoding = encoding.map(Into::into).unwrap_or(options.text_encoding);
            let fingerprint = parse_json_fingerprint(&read_input(input.as_deref())?, tag)?;
            let encoded = fingerprint
                .encode(encoding)
                .context("failed to compress fingerprint")?;
            info!(
                target: "cli",
                subfingerprints = fingerprint.len(),
                bytes = encoded.len(),
                "fingerprint compressed"
            );
            out.write_all(&encoded)?;
            if encoding == TextEncoding::Base64 {
                writeln!(out)?;
            }
        }
        Command::Decompress { input, encoding } => {
            let encoding = encoding.map(Into::into).unwrap_or(options.text_encoding);
            let data = read_input(input.as_deref())?;
            let fingerprint = RawFingerprint::decode(&data, encoding)
                .context("failed to decode fingerprint")?;
            writeln!(out, "{}", serde_json::to_string(&fingerprint)?)?;
        }
        Command::Digest { input } => {
            let fingerprint = load_fingerprint(&read_input(input.as_deref())?, config)?;
            writeln!(out, "{}", fingerprint.digest())?;
        }
        Command::Compare {
            first,
            second,
            threshold,
        } => {
            let threshold = threshold.unwrap_or(config.matching.similarity_threshold);
            let first = load_fingerprint(&read_input(Some(first.as_path()))?, config)?;
            let second = load_fingerprint(&read_input(Some(second.as_path()))?, config)?;
            let distance = first.digest().hamming_distance(second.digest());
            debug!(target: "cli", distance, threshold, "compared digests");
            let report = json!({
                "distance": distance,
                "threshold": threshold,
                "similar": distance <= threshold,
            });
            writeln!(out, "{}", report)?;
        }
        Command::Version => {
            writeln!(out, "{}", tonalprint_fingerprint::version())?;
        }
    }
    Ok(())
}

fn read_input(path: Option<&Path>) -> Result<Vec<u8>> {
    match path {
        Some(path) => {
            fs::read(path).with_context(|| format!("failed to read {}", path.display()))
        }
        None => {
            let mut data = Vec::new();
            io::stdin()
                .read_to_end(&mut data)
                .context("failed to read stdin")?;
            Ok(data)
        }
    }
}

/// Parse a JSON array or tagged object; bare arrays receive `default_tag`.
fn parse_json_fingerprint(data: &[u8], default_tag: AlgorithmTag) -> Result<RawFingerprint> {
    let input: FingerprintInput =
        serde_json::from_slice(data).context("expected a JSON fingerprint")?;
    Ok(match input {
        FingerprintInput::Bare(subfingerprints) => RawFingerprint::new(subfingerprints, default_tag),
        FingerprintInput::Tagged(fingerprint) => fingerprint,
    })
}

/// Read either JSON or a fingerprint in the configured transport encoding.
fn load_fingerprint(data: &[u8], config: &AppConfig) -> Result<RawFingerprint> {
    let looks_like_json = std::str::from_utf8(data)
        .map(|text| text.trim_start().starts_with(['[', '{']))
        .unwrap_or(false);

    if looks_like_json {
        parse_json_fingerprint(data, config.fingerprint.algorithm.tag())
    } else {
        RawFingerprint::decode(data, config.fingerprint.text_encoding)
            .context("failed to decode fingerprint")
    }
}
