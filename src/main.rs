use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use dlms_meter::config::{MeterConfig, Parity};
use dlms_meter::cosem::record::decode_record_list;
use dlms_meter::logging::init_with_verbosity;
use dlms_meter::mbus::serial::{open_port, MeterReader, SerialConfig};
use dlms_meter::simulate::TelegramBuilder;
use dlms_meter::util::hex::{encode_hex, parse_hex_lenient, pretty_hex};
use dlms_meter::{AesKey, DlmsMeter, JsonSink, LogSink, MeasurementSink, TelegramDecoder};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "dlms-meter")]
#[command(about = "Decode encrypted DLMS/COSEM telegrams from a smart meter P1 port")]
struct Cli {
    /// Increase log output (-v info, -vv debug, -vvv trace with hex dumps)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Read telegrams from a serial port
    Listen {
        /// Serial device, e.g. /dev/ttyUSB0
        port: Option<String>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        baudrate: Option<u32>,
        #[arg(long)]
        parity: Option<Parity>,
        /// AES key as 32 hex characters
        #[arg(short, long)]
        key: Option<String>,
        #[arg(long)]
        timeout_ms: Option<u64>,
        #[arg(long)]
        verify_checksums: bool,
        /// Print one JSON object per telegram instead of log lines
        #[arg(long)]
        json: bool,
        #[arg(long)]
        topic: Option<String>,
    },
    /// Decode one telegram given as hex
    Decode {
        /// Telegram hex; spaces and 0x prefixes are ignored
        hex: Option<String>,
        #[arg(short, long)]
        file: Option<PathBuf>,
        #[arg(short, long)]
        config: Option<PathBuf>,
        #[arg(short, long)]
        key: Option<String>,
        #[arg(long)]
        verify_checksums: bool,
        /// List every record instead of the measurement set
        #[arg(long)]
        records: bool,
    },
    /// Print a synthetic telegram
    Simulate {
        #[arg(short, long, default_value = "000102030405060708090A0B0C0D0E0F")]
        key: String,
        #[arg(long, default_value = "1")]
        frame_counter: u32,
        #[arg(long, default_value = "245")]
        max_frame_data: usize,
        /// Print the plaintext notification as well
        #[arg(long)]
        plaintext: bool,
    },
}

fn load_config(path: Option<PathBuf>) -> Result<MeterConfig> {
    match path {
        Some(path) => MeterConfig::from_file(&path)
            .with_context(|| format!("loading {}", path.display())),
        None => Ok(MeterConfig::default()),
    }
}

fn decode_command(
    hex: Option<String>,
    file: Option<PathBuf>,
    config: MeterConfig,
    records: bool,
) -> Result<()> {
    let text = match (hex, file) {
        (Some(hex), None) => hex,
        (None, Some(file)) => std::fs::read_to_string(&file)
            .with_context(|| format!("reading {}", file.display()))?,
        _ => bail!("give the telegram either as an argument or with --file"),
    };
    let raw = parse_hex_lenient(&text).context("telegram is not valid hex")?;
    config.validate()?;

    let decoder = TelegramDecoder::new(config.aes_key()?)
        .with_checksum_verification(config.verify_checksums);

    if records {
        let plaintext = decoder.decrypt(&raw)?;
        for record in decode_record_list(&plaintext)? {
            let name = record.code_type.map_or("-", |code_type| code_type.name());
            println!(
                "{:>4}  {:<16} {:<22} {:?}",
                record.offset,
                record.code.to_string(),
                name,
                record.value
            );
        }
        return Ok(());
    }

    let measurements = decoder.decode(&raw)?;
    let mut sink = JsonSink::new(std::io::stdout());
    if let Some(topic) = config.topic {
        sink = sink.with_topic(topic);
    }
    sink.deliver(&measurements)?;
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_with_verbosity(cli.verbose);

    match cli.command {
        Commands::Listen {
            port,
            config,
            baudrate,
            parity,
            key,
            timeout_ms,
            verify_checksums,
            json,
            topic,
        } => {
            let mut config = load_config(config)?;
            if port.is_some() {
                config.port = port;
            }
            if let Some(baudrate) = baudrate {
                config.baudrate = baudrate;
            }
            if let Some(parity) = parity {
                config.parity = parity;
            }
            if key.is_some() {
                config.key = key;
            }
            if let Some(timeout_ms) = timeout_ms {
                config.inactivity_timeout_ms = timeout_ms;
            }
            if topic.is_some() {
                config.topic = topic;
            }
            config.verify_checksums |= verify_checksums;

            let sink: Box<dyn MeasurementSink> = if json {
                let sink = JsonSink::new(std::io::stdout());
                match config.topic.clone() {
                    Some(topic) => Box::new(sink.with_topic(topic)),
                    None => Box::new(sink),
                }
            } else {
                Box::new(LogSink)
            };

            let meter = DlmsMeter::from_config(&config, sink)?;
            let port = open_port(&SerialConfig::from_meter_config(&config)?)?;
            let mut reader = MeterReader::new(port, meter);

            tokio::select! {
                result = reader.run() => result?,
                _ = tokio::signal::ctrl_c() => log::info!("Interrupted"),
            }

            let stats = reader.meter().stats().export();
            eprintln!("{}", serde_json::to_string_pretty(&stats)?);
        }
        Commands::Decode {
            hex,
            file,
            config,
            key,
            verify_checksums,
            records,
        } => {
            let mut config = load_config(config)?;
            if key.is_some() {
                config.key = key;
            }
            config.verify_checksums |= verify_checksums;
            decode_command(hex, file, config, records)?;
        }
        Commands::Simulate {
            key,
            frame_counter,
            max_frame_data,
            plaintext,
        } => {
            let key = AesKey::from_hex(&key).context("invalid key")?;
            let builder = TelegramBuilder::full_reading(chrono::Local::now().naive_local())
                .frame_counter(frame_counter)
                .max_frame_data(max_frame_data);
            if plaintext {
                eprintln!("{}", pretty_hex(&builder.plaintext()?, 16));
            }
            println!("{}", encode_hex(&builder.build(&key)?));
        }
    }

    Ok(())
}
