//! h5object CLI - serialize a sample acquisition record and show the result.

use std::env;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use h5object::prelude::*;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// One sampled frame of the electrode matrix.
#[derive(H5Object)]
struct ElectrodeFrame {
    timestamp: i64,
    saturation_mask: u64,
    voltages: [f32; 4],
}

#[derive(H5Object)]
#[h5(group = "patient", attr(name = "anonymized", value = "true"))]
struct Patient {
    id: String,
    #[h5(name = "age_years")]
    age: Option<u16>,
}

#[derive(H5Object)]
#[h5(attrs(name = "instruments", values = ["eit", "ecg"]))]
#[h5(property(name = "created", get = "Acquisition::created"))]
struct Acquisition {
    created_unix: i64,
}

impl Acquisition {
    fn created(&self) -> String {
        format!("unix:{}", self.created_unix)
    }
}

/// Streaming state that never reaches the file.
#[derive(Default)]
struct Pending {
    queued: Vec<Vec<f32>>,
}

#[derive(H5Object)]
#[h5(group = "eit", attr(name = "schema", value = "eit/1"))]
#[h5(property(name = "duration", get = "Eit::duration"))]
struct Eit {
    #[h5(name = "configuration")]
    configuration: String,
    #[h5(name = "start_datetime")]
    start: Option<i64>,
    #[h5(name = "end_datetime")]
    end: i64,
    #[h5(as_attribute)]
    record_number: u32,
    #[h5(attr(name = "unit", value = "V"))]
    calibration: Vec<[f64; 3]>,
    frames: Vec<ElectrodeFrame>,
    patient: Patient,
    #[h5(skip)]
    pending: Pending,
    #[h5(base)]
    acquisition: Acquisition,
}

impl Eit {
    fn duration(&self) -> Option<Duration> {
        let start = self.start?;
        u64::try_from(self.end - start).ok().map(Duration::from_millis)
    }
}

fn sample_record() -> Eit {
    let now = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as i64)
        .unwrap_or_default();
    let frames = (0..4)
        .map(|i| ElectrodeFrame {
            timestamp: now + i * 10,
            saturation_mask: 1 << i,
            voltages: [0.1 * i as f32, 0.2, 0.3, 0.4],
        })
        .collect();
    Eit {
        configuration: "16 electrodes, adjacent drive".to_string(),
        start: Some(now),
        end: now + 40,
        record_number: 1,
        calibration: vec![[1.0, 0.0, 0.0], [0.0, 1.0, 0.0]],
        frames,
        patient: Patient {
            id: "P-0001".to_string(),
            age: None,
        },
        pending: Pending::default(),
        acquisition: Acquisition { created_unix: now / 1000 },
    }
}

fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::registry()
        .with(fmt::layer().with_target(false).with_writer(std::io::stderr))
        .with(filter)
        .try_init();
}

fn print_help() {
    println!("h5object - object-graph serializer demo");
    println!();
    println!("USAGE:");
    println!("    h5object [OPTIONS] [COMMAND] [ARGS]");
    println!();
    println!("COMMANDS:");
    println!("    t, tree                 Serialize the sample record and print the tree (default)");
    println!("    j, json [out.json]      Serialize and print or save the JSON dump");
    println!("    h, help                 Show this help");
    println!();
    println!("OPTIONS:");
    println!("    -v, --verbose    Show debug output");
    println!("    -vv, --trace     Show trace output (very verbose)");
    println!("    -q, --quiet      Suppress all log output");
    println!("    --cycle-guard    Fail on cyclic object graphs");
    println!();
    println!("ENVIRONMENT:");
    println!("    RUST_LOG                Overrides the log filter");
    println!("    {}    Enables the cycle guard", SerializeOptions::ENV_CYCLE_GUARD);
}

/// Serialize the sample record into a fresh container under `/d1`.
fn build(options: SerializeOptions) -> Result<MemoryContainer> {
    let record = sample_record();

    let mut container = MemoryContainer::new();
    let root = container
        .create_group(NodeId::ROOT, "d1")
        .map_err(|e| Error::backend("/d1", e))?;
    Serializer::new()
        .with_options(options)
        .serialize(&mut container, root, &record, None)?;
    container
        .close_group(root)
        .map_err(|e| Error::backend("/d1", e))?;

    tracing::debug!(
        queued = record.pending.queued.len(),
        nodes = container.len(),
        "sample record written"
    );
    Ok(container)
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut level = "warn";
    let mut options = SerializeOptions::from_env();
    let mut filtered_args: Vec<&str> = Vec::new();
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => level = "debug",
            "-vv" | "--trace" => level = "trace",
            "-q" | "--quiet" => level = "off",
            "--cycle-guard" => options = options.with_cycle_guard(true),
            _ => filtered_args.push(arg),
        }
    }
    init_tracing(level);

    let command = filtered_args.first().copied().unwrap_or("tree");
    if matches!(command, "help" | "h" | "-h" | "--help") {
        print_help();
        return;
    }

    let container = match build(options) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Serialization failed: {}", e);
            std::process::exit(1);
        }
    };

    match command {
        "tree" | "t" => print!("{}", container),
        "json" | "j" => match filtered_args.get(1) {
            Some(path) => {
                if let Err(e) = container.save_json(path) {
                    eprintln!("Failed to write {}: {}", path, e);
                    std::process::exit(1);
                }
                println!("Wrote {}", path);
            }
            None => match serde_json::to_string_pretty(&container.to_json()) {
                Ok(text) => println!("{}", text),
                Err(e) => {
                    eprintln!("JSON error: {}", e);
                    std::process::exit(1);
                }
            },
        },
        other => {
            eprintln!("Unknown command: {}", other);
            eprintln!();
            print_help();
            std::process::exit(1);
        }
    }
}
