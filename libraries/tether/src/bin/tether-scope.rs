use std::fs::File;
use std::io::Read;
use std::path::PathBuf;

use tether::snapshot::{SNAPSHOT_HEADER_LEN, read_header};

fn main() {
    env_logger::init();

    let args: Vec<String> = std::env::args().collect();

    if args.len() != 2 {
        eprintln!("Usage: {} <path-to-snapshot-file>", args[0]);
        eprintln!("\nExample: {} ./.pmf-data/pmf-dashboard-state.snapshot", args[0]);
        std::process::exit(1);
    }

    let file_path = PathBuf::from(&args[1]);

    let mut file = match File::open(&file_path) {
        Ok(f) => f,
        Err(e) => {
            eprintln!("Error opening file '{}': {}", file_path.display(), e);
            std::process::exit(1);
        }
    };

    let mut bytes = Vec::new();
    if let Err(e) = file.read_to_end(&mut bytes) {
        eprintln!("Error reading file '{}': {}", file_path.display(), e);
        std::process::exit(1);
    }

    println!("TetherScope - Snapshot Analyzer");
    println!("===============================");
    println!("File: {}", file_path.display());
    println!(
        "Size: {} bytes ({:.2} KB)",
        bytes.len(),
        bytes.len() as f64 / 1024.0
    );
    println!();

    let header = match read_header(&bytes) {
        Ok(header) => header,
        Err(e) => {
            println!("  ❌ Not a readable snapshot: {e}");
            std::process::exit(2);
        }
    };
    println!("Format version: {}", header.version);
    println!("Payload: {} bytes", header.payload_len);
    println!();

    let state: serde_json::Value = match serde_json::from_slice(&bytes[SNAPSHOT_HEADER_LEN..]) {
        Ok(state) => state,
        Err(e) => {
            println!("  ❌ Payload is not valid JSON: {e}");
            std::process::exit(2);
        }
    };

    println!("Collections:");
    println!("------------");
    let Some(fields) = state.as_object() else {
        println!("  ⚠️  Top-level payload is not an object");
        return;
    };

    for (name, value) in fields {
        match value {
            serde_json::Value::Array(items) => println!("  {name}: {} item(s)", items.len()),
            serde_json::Value::Object(entries) => {
                println!("  {name}: record with {} field(s)", entries.len())
            }
            serde_json::Value::Null => println!("  {name}: (empty)"),
            other => println!("  {name}: {other}"),
        }
    }

    println!();
    println!("  ✅ Snapshot decodes cleanly");
}
