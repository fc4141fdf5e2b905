use mercury200::{
    CommandId, DeviceConfig, FrameOutcome, MeterFleet, Metric, ResponseFrame, StatusReading,
    Zone, encode_packed, parse, to_address,
};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("--- Request Frame Example ---");
    let address = to_address("04023330")?;
    let mut fleet = MeterFleet::new();
    fleet.register(&DeviceConfig::new("04023330", "zigbee2mqtt/electricity_counter"))?;
    let request = fleet.request("04023330", "get_status")?;
    println!("Address: {}", address);
    println!("Publish on {}: {}", request.topic, request.payload()?);
    assert_eq!(request.frame[2..5], address.bytes());

    println!("\n--- Status Response Example ---");
    let payload = vec![0x02, 0x30, 0x00, 0x50, 0x00, 0x01, 0x90];
    let frame = ResponseFrame::new(address, CommandId::Status, payload).serialize();
    println!("Frame: {:02X?}", frame);
    let parsed = parse(&frame)?;
    let status = StatusReading::decode(&parsed.payload)?;
    println!(
        "Parsed status: {:.1} V, {:.2} A, {} W",
        status.deci_volts as f64 / 10.0,
        status.centi_amps as f64 / 100.0,
        status.watts
    );
    fleet.handle_frame(&frame)?;
    println!("Status dispatch successful!");

    println!("\n--- Tariff Response Example ---");
    let mut payload = Vec::new();
    for centi_kwh in [1_234_567, 765_432, 0, 0] {
        payload.extend(encode_packed(centi_kwh, 4).ok_or("counter too large")?);
    }
    let frame = ResponseFrame::new(address, CommandId::TariffEnergy, payload).serialize();
    println!("Frame: {:02X?}", frame);
    match fleet.handle_frame(&frame)? {
        FrameOutcome::Updated { serial, .. } => println!("Updated meter {}", serial),
        other => println!("Nothing stored: {:?}", other),
    }

    println!("\n--- Readings ---");
    let record = fleet.device("04023330").ok_or("meter not registered")?;
    for metric in Metric::ALL {
        let name = metric.sensor_name(record.serial.as_str());
        match record.value(metric) {
            Some(value) => println!("{}: {} {}", name, value, metric.unit()),
            None => println!("{}: unknown", name),
        }
    }
    assert_eq!(record.value(Metric::Energy(Zone::T1)), Some(12345.67));
    Ok(())
}
