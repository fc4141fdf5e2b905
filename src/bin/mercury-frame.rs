#[path = "../bin_common.rs"]
mod common;

use clap::{Parser, Subcommand};
use common::{parse_device, parse_frame, parse_quantity, print_record};
use mercury200::{
    Command, CommandId, DeviceConfig, FrameOutcome, MeterFleet, ResponseFrame, StatusReading,
    encode_packed, parse, to_address,
};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "mercury-frame")]
#[command(about = "Build and decode Mercury 200.02 frames")]
struct Args {
    #[command(subcommand)]
    command: Cmd,
}

#[derive(Subcommand)]
enum Cmd {
    /// Build a request frame and print the bus payload
    Request {
        /// Meter serial number as printed on the device
        #[arg(short, long)]
        serial: String,

        /// get_status or get_energy
        #[arg(short, long, default_value = "get_status")]
        command: String,

        /// Bus topic of the meter's modem
        #[arg(short, long, default_value = mercury200::fleet::DEFAULT_TOPIC)]
        topic: String,
    },
    /// Decode response frames (hex or JSON byte array)
    Decode {
        /// Registered meters, SERIAL[@TOPIC]
        #[arg(short, long = "device", value_parser = parse_device, required = true)]
        devices: Vec<DeviceConfig>,

        /// Frames to decode
        #[arg(required = true)]
        frames: Vec<String>,
    },
    /// Print the response a meter would send
    Simulate {
        #[arg(short, long)]
        serial: String,

        /// Voltage in volts
        #[arg(long, default_value_t = 230.0, value_parser = parse_quantity)]
        voltage: f64,

        /// Current in amperes
        #[arg(long, default_value_t = 1.0, value_parser = parse_quantity)]
        current: f64,

        /// Power in watts
        #[arg(long, default_value_t = 230)]
        power: u64,

        /// Tariff counters in kWh, T1..T4; prints an energy response instead
        #[arg(long, num_args = 4, value_delimiter = ',', value_parser = parse_quantity)]
        energy: Option<Vec<f64>>,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env().add_directive("info".parse()?))
        .init();

    let args = Args::parse();

    match args.command {
        Cmd::Request {
            serial,
            command,
            topic,
        } => {
            let mut fleet = MeterFleet::new();
            fleet.register(&DeviceConfig::new(&serial, &topic))?;
            let request = fleet.request(&serial, &command)?;
            println!("{}", request.topic);
            println!("{}", request.payload()?);
        }
        Cmd::Decode { devices, frames } => {
            let (fleet, errors) = MeterFleet::with_devices(&devices);
            if !errors.is_empty() && fleet.devices().is_empty() {
                return Err("No usable devices".into());
            }
            for frame in &frames {
                let frame = parse_frame(frame)?;
                match fleet.handle_frame(&frame) {
                    Ok(FrameOutcome::Updated { serial, reading }) => {
                        println!("{}: {:?}", serial, reading);
                    }
                    Ok(other) => println!("{:?}", other),
                    Err(e) => println!("Dropped {:02X?}: {}", frame, e),
                }
            }
            println!();
            for record in fleet.devices() {
                print_record(&record);
            }
            println!("{}", serde_json::to_string(&fleet.stats())?);
        }
        Cmd::Simulate {
            serial,
            voltage,
            current,
            power,
            energy,
        } => {
            let address = to_address(&serial)?;
            let (command, payload) = match energy {
                Some(zones) => {
                    let mut payload = Vec::with_capacity(16);
                    for kwh in zones {
                        let centi = (kwh * 100.0).round() as u64;
                        payload.extend(encode_packed(centi, 4).ok_or("energy counter too large")?);
                    }
                    (Command::GetEnergy.id(), payload)
                }
                None => {
                    let status = StatusReading {
                        deci_volts: (voltage * 10.0).round() as u64,
                        centi_amps: (current * 100.0).round() as u64,
                        watts: power,
                    };
                    (CommandId::Status, status_payload(&status)?)
                }
            };
            let frame = ResponseFrame::new(address, command, payload).serialize();
            // Sanity check before printing.
            parse(&frame)?;
            println!("{}", mercury200::bus::encode_action(&frame)?);
        }
    }

    Ok(())
}

fn status_payload(status: &StatusReading) -> Result<Vec<u8>, Box<dyn std::error::Error>> {
    let mut payload = Vec::with_capacity(7);
    payload.extend(encode_packed(status.deci_volts, 2).ok_or("voltage out of range")?);
    payload.extend(encode_packed(status.centi_amps, 2).ok_or("current out of range")?);
    payload.extend(encode_packed(status.watts, 3).ok_or("power out of range")?);
    Ok(payload)
}
