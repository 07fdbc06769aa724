//! DATO CLI - Command-line tool for the DATO binary format
//!
//! This binary provides command-line interfaces for:
//! - pack: encode a JSON document → .dato
//! - dump: decode a .dato buffer → JSON
//! - info: summarize the buffer header
//! - get: print the value at a dotted path

use clap::{Parser, Subcommand, ValueEnum};
use dato_codec::{
    encode_json, to_json, Compact, CompactValues, Decoder, DynamicAccessor, Encoder,
    EncoderOptions, FixedSizes, SizeStrategy, TypeTag,
};
use indicatif::{ProgressBar, ProgressStyle};
use serde_json::Value;
use std::error::Error;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "dato")]
#[command(about = "DATO binary format CLI tool")]
#[command(version)]
struct Cli {
    /// Log debug events to stderr (RUST_LOG takes precedence)
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Encode a JSON document to .dato format
    ///
    /// Examples:
    ///   dato pack data.json -o data.dato
    ///   dato pack data.json -o data.dato --config fixed --unaligned
    ///   dato pack data.json -o data.dato --options encoder.toml
    Pack {
        /// Input file (one JSON document)
        input: PathBuf,
        /// Output file (.dato)
        #[arg(short, long)]
        output: PathBuf,
        /// Size field layout
        #[arg(long, value_enum, default_value_t = ConfigName::Compact)]
        config: ConfigName,
        /// Encoder options file (TOML); flags below override it
        #[arg(long)]
        options: Option<PathBuf>,
        /// Skip alignment padding
        #[arg(long)]
        unaligned: bool,
        /// Keep map entries in document order
        #[arg(long)]
        unsorted: bool,
        /// Write every occurrence of a key
        #[arg(long)]
        keep_duplicate_keys: bool,
        /// Header prefix
        #[arg(long)]
        prefix: Option<String>,
        /// Show progress spinner while encoding
        #[arg(long)]
        progress: bool,
    },
    /// Decode a .dato buffer to JSON
    Dump {
        /// Input file (.dato)
        input: PathBuf,
        /// Output file (stdout if omitted)
        #[arg(short, long)]
        output: Option<PathBuf>,
        /// Header prefix the buffer was written with
        #[arg(long, default_value = "DATO")]
        prefix: String,
        /// Single-line JSON instead of pretty-printed
        #[arg(long)]
        compact: bool,
    },
    /// Show header fields and root summary
    ///
    /// Examples:
    ///   dato info data.dato
    ///   dato info data.dato --format json
    Info {
        /// Input file (.dato)
        input: PathBuf,
        /// Header prefix the buffer was written with
        #[arg(long, default_value = "DATO")]
        prefix: String,
        /// Output format (table, json)
        #[arg(long, value_enum, default_value_t = InfoFormat::Table)]
        format: InfoFormat,
    },
    /// Print the value at a dotted path
    ///
    /// Examples:
    ///   dato get data.dato users.0.name
    ///   dato get data.dato ids.42
    Get {
        /// Input file (.dato)
        input: PathBuf,
        /// Dotted path; array and int map segments are decimal
        path: String,
        /// Header prefix the buffer was written with
        #[arg(long, default_value = "DATO")]
        prefix: String,
    },
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum ConfigName {
    Fixed,
    #[value(name = "compact-values")]
    CompactValues,
    Compact,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
enum InfoFormat {
    Table,
    Json,
}

/// Failures specific to the command line
#[derive(Debug, thiserror::Error)]
enum CliError {
    #[error("path `{path}` not found at segment `{segment}`")]
    PathNotFound { path: String, segment: String },
    #[error("cannot descend into {kind} at segment `{segment}`")]
    NotAContainer { kind: &'static str, segment: String },
    #[error("invalid options file {}: {source}", .path.display())]
    Options {
        path: PathBuf,
        source: toml::de::Error,
    },
}

fn main() -> Result<(), Box<dyn Error>> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Pack {
            input,
            output,
            config,
            options,
            unaligned,
            unsorted,
            keep_duplicate_keys,
            prefix,
            progress,
        } => {
            let mut encoder_options = load_options(options.as_deref())?;
            if unaligned {
                encoder_options.aligned = false;
            }
            if unsorted {
                encoder_options.sorted_keys = false;
            }
            if keep_duplicate_keys {
                encoder_options.skip_duplicate_keys = false;
            }
            if let Some(prefix) = prefix {
                encoder_options.prefix = prefix;
            }
            handle_pack(input, output, config, &encoder_options, progress)?;
        }
        Commands::Dump {
            input,
            output,
            prefix,
            compact,
        } => {
            handle_dump(input, output, &prefix, compact)?;
        }
        Commands::Info {
            input,
            prefix,
            format,
        } => {
            handle_info(input, &prefix, format)?;
        }
        Commands::Get {
            input,
            path,
            prefix,
        } => {
            handle_get(input, &path, &prefix)?;
        }
    }

    Ok(())
}

fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "warn" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_options(path: Option<&Path>) -> Result<EncoderOptions, Box<dyn Error>> {
    let Some(path) = path else {
        return Ok(EncoderOptions::default());
    };
    let text = fs::read_to_string(path)?;
    let options: EncoderOptions = toml::from_str(&text).map_err(|source| CliError::Options {
        path: path.to_path_buf(),
        source,
    })?;
    debug!(?options, "loaded encoder options");
    Ok(options)
}

fn encode_document<S: SizeStrategy>(
    options: &EncoderOptions,
    strategy: S,
    document: &Value,
) -> dato_codec::Result<Vec<u8>> {
    let mut enc = Encoder::with_strategy(options, strategy);
    let root = encode_json(&mut enc, document)?;
    enc.finish(root)
}

fn handle_pack(
    input: PathBuf,
    output: PathBuf,
    config: ConfigName,
    options: &EncoderOptions,
    show_progress: bool,
) -> Result<(), Box<dyn Error>> {
    let start = Instant::now();
    let mut progress_bar = show_progress.then(|| create_spinner("Encoding document"));

    let text = fs::read_to_string(&input)?;
    let document: Value = serde_json::from_str(&text)?;
    let bytes = match config {
        ConfigName::Fixed => encode_document(options, FixedSizes, &document)?,
        ConfigName::CompactValues => encode_document(options, CompactValues, &document)?,
        ConfigName::Compact => encode_document(options, Compact, &document)?,
    };
    fs::write(&output, &bytes)?;

    let elapsed = start.elapsed();
    if let Some(pb) = progress_bar.take() {
        pb.finish_with_message(format!("Encoded {} bytes in {:.2?}", bytes.len(), elapsed));
    }
    let mut stderr = std::io::stderr().lock();
    writeln!(
        &mut stderr,
        "Packed {} to {} (input bytes: {}, output bytes: {}, config: {:?}, elapsed: {:.2?})",
        input.display(),
        output.display(),
        text.len(),
        bytes.len(),
        config,
        elapsed
    )?;
    Ok(())
}

fn handle_dump(
    input: PathBuf,
    output: Option<PathBuf>,
    prefix: &str,
    compact: bool,
) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&input)?;
    let dec = Decoder::open_with_prefix(&bytes, prefix.as_bytes())?;
    let value = to_json(&dec.root())?;

    let mut rendered = if compact {
        serde_json::to_string(&value)?
    } else {
        serde_json::to_string_pretty(&value)?
    };
    rendered.push('\n');

    match output {
        Some(path) => fs::write(path, rendered)?,
        None => std::io::stdout().lock().write_all(rendered.as_bytes())?,
    }
    Ok(())
}

#[derive(Debug, Clone, serde::Serialize)]
struct InfoSummary {
    bytes: usize,
    config_id: u8,
    config: &'static str,
    aligned: bool,
    sorted_keys: bool,
    root_type: String,
    root_offset: u32,
    #[serde(skip_serializing_if = "Option::is_none")]
    root_len: Option<usize>,
}

fn config_name(id: u8) -> &'static str {
    match id {
        0 => "fixed",
        1 => "compact-values",
        2 => "compact",
        _ => "unknown",
    }
}

fn type_name(tag: u8) -> String {
    match TypeTag::from_u8(tag) {
        Ok(tag) => format!("{:?}", tag),
        Err(_) => format!("unknown({})", tag),
    }
}

/// Element or entry count for containers, strings and arrays.
fn root_len(root: &DynamicAccessor<'_>) -> Result<Option<usize>, Box<dyn Error>> {
    if let Some(map) = root.try_string_map()? {
        return Ok(Some(map.len()));
    }
    if let Some(map) = root.try_int_map()? {
        return Ok(Some(map.len()));
    }
    if let Some(array) = root.try_array()? {
        return Ok(Some(array.len()));
    }
    if let Some(text) = root.try_string8()? {
        return Ok(Some(text.len()));
    }
    if let Some(bytes) = root.try_byte_array()? {
        return Ok(Some(bytes.len()));
    }
    Ok(None)
}

fn handle_info(input: PathBuf, prefix: &str, format: InfoFormat) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&input)?;
    let dec = Decoder::open_with_prefix(&bytes, prefix.as_bytes())?;
    let header = dec.header();
    let root = dec.root();
    let summary = InfoSummary {
        bytes: dec.len(),
        config_id: header.config_id,
        config: config_name(header.config_id),
        aligned: header.aligned(),
        sorted_keys: header.sorted_keys(),
        root_type: type_name(header.root_type),
        root_offset: header.root_offset,
        root_len: root_len(&root)?,
    };

    let stdout = std::io::stdout();
    let mut writer = stdout.lock();
    match format {
        InfoFormat::Table => print_info_table(&mut writer, &summary)?,
        InfoFormat::Json => {
            serde_json::to_writer_pretty(&mut writer, &summary)?;
            writeln!(writer)?;
        }
    }
    Ok(())
}

fn print_info_table(writer: &mut dyn Write, summary: &InfoSummary) -> Result<(), Box<dyn Error>> {
    writeln!(writer, "Bytes\t{}", summary.bytes)?;
    writeln!(writer, "Config\t{} ({})", summary.config, summary.config_id)?;
    writeln!(writer, "Aligned\t{}", summary.aligned)?;
    writeln!(writer, "Sorted keys\t{}", summary.sorted_keys)?;
    writeln!(writer, "Root type\t{}", summary.root_type)?;
    writeln!(writer, "Root offset\t{}", summary.root_offset)?;
    if let Some(len) = summary.root_len {
        writeln!(writer, "Root length\t{}", len)?;
    }
    Ok(())
}

/// Follow `path` from `root`. Empty segments are skipped, so `""` selects the
/// root itself.
fn resolve_path<'a>(
    root: DynamicAccessor<'a>,
    path: &str,
) -> Result<DynamicAccessor<'a>, Box<dyn Error>> {
    let mut current = root;
    for segment in path.split('.').filter(|s| !s.is_empty()) {
        let not_found = || CliError::PathNotFound {
            path: path.to_string(),
            segment: segment.to_string(),
        };
        let next = if let Some(map) = current.try_string_map()? {
            map.get(segment)?
        } else if let Some(map) = current.try_int_map()? {
            match segment.parse::<u32>() {
                Ok(key) => map.get(key)?,
                Err(_) => None,
            }
        } else if let Some(array) = current.try_array()? {
            match segment.parse::<usize>() {
                Ok(index) => array.try_get(index)?,
                Err(_) => None,
            }
        } else {
            return Err(CliError::NotAContainer {
                kind: type_kind(current.tag()),
                segment: segment.to_string(),
            }
            .into());
        };
        current = next.ok_or_else(not_found)?;
    }
    Ok(current)
}

fn type_kind(tag: u8) -> &'static str {
    match TypeTag::from_u8(tag) {
        Ok(TypeTag::Null) => "null",
        Ok(TypeTag::Bool) => "a bool",
        Ok(TypeTag::String8 | TypeTag::String16 | TypeTag::String32) => "a string",
        Ok(TypeTag::Vector | TypeTag::VectorArray) => "a vector",
        Ok(TypeTag::ByteArray) => "a byte array",
        Ok(_) => "a number",
        Err(_) => "an unknown type",
    }
}

fn handle_get(input: PathBuf, path: &str, prefix: &str) -> Result<(), Box<dyn Error>> {
    let bytes = fs::read(&input)?;
    let dec = Decoder::open_with_prefix(&bytes, prefix.as_bytes())?;
    let value = resolve_path(dec.root(), path)?;
    let json = to_json(&value)?;

    let mut stdout = std::io::stdout().lock();
    serde_json::to_writer_pretty(&mut stdout, &json)?;
    writeln!(stdout)?;
    Ok(())
}

fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) =
        ProgressStyle::default_spinner().template("{spinner:.green} [{elapsed_precise}] {msg}")
    {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(Duration::from_millis(100));
    pb
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Map};

    fn arb_json() -> impl Strategy<Value = Value> {
        let leaf = prop_oneof![
            Just(Value::Null),
            any::<bool>().prop_map(Value::Bool),
            any::<i64>().prop_map(Value::from),
            any::<u64>().prop_map(Value::from),
            (-1.0e9f64..1.0e9).prop_map(Value::from),
            "[a-z ]{0,10}".prop_map(Value::String),
        ];
        leaf.prop_recursive(3, 48, 6, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..6).prop_map(Value::Array),
                prop::collection::btree_map("[a-z]{1,5}", inner, 0..6)
                    .prop_map(|map| Value::Object(map.into_iter().collect::<Map<_, _>>())),
            ]
        })
    }

    proptest! {
        #[test]
        fn pack_then_dump_roundtrips(
            document in arb_json(),
            config in prop_oneof![
                Just(ConfigName::Fixed),
                Just(ConfigName::CompactValues),
                Just(ConfigName::Compact),
            ],
            aligned in any::<bool>(),
            sorted_keys in any::<bool>(),
        ) {
            let options = EncoderOptions { aligned, sorted_keys, ..EncoderOptions::default() };
            let bytes = match config {
                ConfigName::Fixed => encode_document(&options, FixedSizes, &document),
                ConfigName::CompactValues => encode_document(&options, CompactValues, &document),
                ConfigName::Compact => encode_document(&options, Compact, &document),
            }
            .unwrap();

            let dec = Decoder::open(&bytes).unwrap();
            prop_assert_eq!(dec.aligned(), aligned);
            prop_assert_eq!(to_json(&dec.root()).unwrap(), document.clone());

            if let Value::Object(map) = &document {
                for (key, value) in map {
                    let found = resolve_path(dec.root(), key).unwrap();
                    prop_assert_eq!(&to_json(&found).unwrap(), value);
                }
            }
        }
    }

    fn encode(document: &Value) -> Vec<u8> {
        encode_document(&EncoderOptions::default(), Compact, document).unwrap()
    }

    #[test]
    fn resolve_nested_path() {
        let bytes = encode(&json!({"users": [{"name": "ada"}, {"name": "bob"}]}));
        let dec = Decoder::open(&bytes).unwrap();
        let value = resolve_path(dec.root(), "users.1.name").unwrap();
        assert_eq!(value.as_str().unwrap(), "bob");

        let root = resolve_path(dec.root(), "").unwrap();
        assert_eq!(root.tag(), TypeTag::StringMap as u8);
    }

    #[test]
    fn resolve_missing_segment() {
        let bytes = encode(&json!({"users": []}));
        let dec = Decoder::open(&bytes).unwrap();
        let err = resolve_path(dec.root(), "users.0").unwrap_err();
        assert!(err.to_string().contains("segment `0`"));

        let err = resolve_path(dec.root(), "users.x").unwrap_err();
        assert!(err.to_string().contains("not found"));
    }

    #[test]
    fn resolve_into_scalar_fails() {
        let bytes = encode(&json!({"count": 3}));
        let dec = Decoder::open(&bytes).unwrap();
        let err = resolve_path(dec.root(), "count.inner").unwrap_err();
        assert!(err.to_string().contains("a number"));
    }

    #[test]
    fn options_file_overrides_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("encoder.toml");
        fs::write(&path, "aligned = false\nprefix = \"CFG\"\n").unwrap();

        let options = load_options(Some(&path)).unwrap();
        assert!(!options.aligned);
        assert!(options.sorted_keys);
        assert_eq!(options.prefix, "CFG");

        fs::write(&path, "aligned = 3\n").unwrap();
        assert!(load_options(Some(&path)).is_err());
    }

    #[test]
    fn info_summary_names() {
        assert_eq!(config_name(1), "compact-values");
        assert_eq!(type_name(9), "StringMap");
        assert_eq!(type_name(99), "unknown(99)");
    }
}
