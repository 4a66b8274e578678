//! CASK - Interactive Shell
//! A small line-oriented front-end over a single store file, for poking at
//! the engine by hand.

use std::io::{self, BufRead, Write};

use cask::{Config, Store};

fn main() {
    env_logger::init();

    let config = match std::env::args().nth(1) {
        Some(path) => Config::new(path),
        None => Config::default(),
    };

    println!();
    println!("  ╔═══════════════════════════════════════════╗");
    println!("  ║            CASK Storage Engine            ║");
    println!("  ║    Append-Only Key-Value Store v0.1.0     ║");
    println!("  ╚═══════════════════════════════════════════╝");
    println!();
    println!("  Log file: {:?}", config.path);
    println!();
    println!("  Commands:");
    println!("    set <key> <value>  - Store a key-value pair");
    println!("    get <key>          - Retrieve a value by key");
    println!("    del <key>          - Delete a key");
    println!("    compact            - Rewrite the log, dropping garbage");
    println!("    info               - Show store statistics");
    println!("    metrics            - Show operation counters");
    println!("    exit               - Close the store");
    println!();

    let store = match Store::open_with_config(config) {
        Ok(s) => s,
        Err(err) => {
            eprintln!("[ERROR] Failed to open store: {}", err);
            std::process::exit(1);
        }
    };

    let stdin = io::stdin();
    let mut stdout = io::stdout();

    loop {
        print!("cask> ");
        let _ = stdout.flush();

        let mut line = String::new();
        match stdin.lock().read_line(&mut line) {
            Ok(0) => break, // EOF
            Ok(_) => {}
            Err(err) => {
                eprintln!("[ERROR] Failed to read input: {}", err);
                break;
            }
        }

        let parts: Vec<&str> = line.split_whitespace().collect();
        if parts.is_empty() {
            continue;
        }

        match parts[0].to_lowercase().as_str() {
            "set" | "put" => {
                if parts.len() < 3 {
                    println!("  Usage: set <key> <value>");
                    continue;
                }
                let value = parts[2..].join(" ");
                match store.put(parts[1].as_bytes(), value.as_bytes()) {
                    Ok(()) => println!("  OK"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "get" => {
                if parts.len() < 2 {
                    println!("  Usage: get <key>");
                    continue;
                }
                match store.get(parts[1].as_bytes()) {
                    Ok(Some(value)) => match String::from_utf8(value) {
                        Ok(s) => println!("  \"{}\"", s),
                        Err(_) => println!("  <binary data>"),
                    },
                    Ok(None) => println!("  (nil)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "del" | "delete" => {
                if parts.len() < 2 {
                    println!("  Usage: del <key>");
                    continue;
                }
                match store.delete(parts[1].as_bytes()) {
                    Ok(()) => println!("  OK (deleted)"),
                    Err(e) => println!("  ERROR: {}", e),
                }
            }
            "compact" => match store.compact() {
                Ok(stats) => println!(
                    "  OK ({} keys kept, {} bytes reclaimed)",
                    stats.keys_migrated,
                    stats.bytes_reclaimed()
                ),
                Err(e) => println!("  ERROR: {}", e),
            },
            "info" | "stats" => {
                let stats = store.stats();
                println!("  Live keys:  {}", stats.live_keys);
                println!("  Live bytes: {}", stats.live_bytes);
                println!("  Log bytes:  {}", stats.log_bytes);
                println!("  Dead bytes: {}", stats.dead_bytes);
            }
            "metrics" => store.with_metrics(|m| println!("{}", m.report())),
            "exit" | "quit" | "q" => break,
            _ => {
                println!("  Unknown command: '{}'. Type 'exit' to quit.", parts[0]);
            }
        }
    }

    println!("  Closing CASK...");
    if let Err(err) = store.close() {
        eprintln!("[ERROR] Failed to close store: {}", err);
        std::process::exit(1);
    }
}
