#![deny(clippy::unwrap_used)]

use clap::{arg, command, value_parser};
use std::io::ErrorKind;
use std::process::exit;
use std::{path::PathBuf, time::Duration};

use xdm1041ctrl::discovery::{self, DEFAULT_HINT};
use xdm1041ctrl::{Device, MeterError, Mode, Result, DEFAULT_BAUDRATE, DEFAULT_TTY};

mod logging;

fn cli() -> clap::Command {
    command!() // requires `cargo` feature
        .arg(
            arg!(
                -p --device <PORT> "Port for USB adapter, searched by --hint if omitted"
            )
            .required(false)
            .value_parser(value_parser!(PathBuf)),
        )
        .arg(
            arg!(
                --hint <TEXT> "USB description of the meter's serial adapter"
            )
            .default_value(DEFAULT_HINT),
        )
        .arg(arg!(
            -d --debug ... "Turn debugging information on"
        ))
        .arg(
            arg!(
                -b --baudrate <BAUDRATE> "Baudrate"
            )
            .default_value(DEFAULT_BAUDRATE.to_string())
            .value_parser(value_parser!(u32)),
        )
        .subcommand(clap::Command::new("ident").about("Device identification"))
        .subcommand(
            clap::Command::new("mode").about("Measurement function").arg(
                arg!([mode] "Set measurement function")
                    .value_parser(Mode::ALL.map(|m| m.name()))
                    .ignore_case(true),
            ),
        )
        .subcommand(
            clap::Command::new("mea")
                .about("Get current measurement")
                .arg(arg!(
                    --"watch" "Poll current measurement until interrupted"
                ))
                .arg(
                    arg!(--"interval" <MS> "Poll interval in milliseconds")
                        .default_value("1000")
                        .value_parser(value_parser!(u64)),
                ),
        )
        .subcommand_required(true)
}

#[tokio::main]
async fn main() {
    let matches = cli().get_matches();
    logging::init_logging(matches.get_count("debug"));

    let port = match matches.get_one::<PathBuf>("device") {
        Some(path) => path.to_string_lossy().to_string(),
        None => {
            let hint = matches
                .get_one::<String>("hint")
                .map(String::as_str)
                .unwrap_or(DEFAULT_HINT);
            match discovery::resolve_port(hint, DEFAULT_TTY) {
                Ok(port) => port,
                Err(e) => report(e, DEFAULT_TTY),
            }
        }
    };

    match handle_args(&matches, &port).await {
        Ok(true) => {}
        Ok(false) => {
            eprintln!("Device at {} does not respond", port);
            exit(-1);
        }
        Err(e) => report(e, &port),
    }
}

fn report(e: MeterError, port: &str) -> ! {
    match e {
        MeterError::Serial(err) => {
            if err.kind() == tokio_serial::ErrorKind::NoDevice
                || matches!(err.kind(), tokio_serial::ErrorKind::Io(ErrorKind::NotFound))
            {
                eprintln!("{}: File not found", port);
            } else {
                eprintln!("I/O Error: {} [device: {}]", err, port);
            }
        }
        MeterError::Io(err) => {
            if err.kind() == ErrorKind::NotFound {
                eprintln!("{}: File not found", port);
            } else {
                eprintln!("I/O Error: {} [device: {}]", err, port);
            }
        }
    }
    exit(-1);
}

/// Returns `false` when the meter did not identify itself.
async fn handle_args(matches: &clap::ArgMatches, port: &str) -> Result<bool> {
    let baud_rate = matches
        .get_one::<u32>("baudrate")
        .unwrap_or(&DEFAULT_BAUDRATE);

    let mut device = Device::new(port, *baud_rate).await?;
    let ident = match device.ident() {
        Some(ident) => ident.clone(),
        None => return Ok(false),
    };

    eprintln!("Connected to: {} ({})\n", port, ident.model());

    match matches.subcommand() {
        // Device ID
        Some(("ident", _args)) => {
            println!("Ident: {}", ident);
            println!("Model: {}", ident.model());
        }
        // Measurement function
        Some(("mode", args)) => {
            if let Some(name) = args.get_one::<String>("mode") {
                // Write value
                match name.parse::<Mode>() {
                    Ok(mode) => {
                        device.set_mode(mode).await?;
                        println!("OK");
                    }
                    Err(e) => eprintln!("{}", e),
                }
            } else {
                // Read value
                println!("Mode: {}", device.get_mode().await?);
            }
        }
        // Measurement
        Some(("mea", args)) => {
            if let Some(true) = args.get_one::<bool>("watch") {
                let interval =
                    Duration::from_millis(*args.get_one::<u64>("interval").unwrap_or(&1000));
                loop {
                    println!("{}", device.reading().await?);
                    tokio::select! {
                        _ = tokio::time::sleep(interval) => {}
                        _ = tokio::signal::ctrl_c() => break,
                    }
                }
            } else {
                println!("{}", device.reading().await?);
            }
        }
        _ => unreachable!("subcommand is required"),
    }

    device.close().await;
    Ok(true)
}
