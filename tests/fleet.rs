use mercury200::bus;
use mercury200::{
    CommandId, DeviceConfig, FrameOutcome, MercuryError, MeterFleet, Metric, ResponseFrame,
    Snapshot, Zone, encode_packed, to_address,
};
use std::sync::Arc;
use std::thread;

const TOPIC: &str = "zigbee2mqtt/electricity_counter";

fn tariff_payload(centi_kwh: [u64; 4]) -> Vec<u8> {
    centi_kwh
        .iter()
        .flat_map(|&v| encode_packed(v, 4).unwrap())
        .collect()
}

fn response(serial: &str, command: CommandId, payload: Vec<u8>) -> Vec<u8> {
    ResponseFrame::new(to_address(serial).unwrap(), command, payload).serialize()
}

fn two_meters() -> MeterFleet {
    let (fleet, errors) = MeterFleet::with_devices(&[
        DeviceConfig::new("04023330", TOPIC),
        DeviceConfig::new("04025230", "zigbee2mqtt/garage"),
    ]);
    assert!(errors.is_empty());
    fleet
}

#[test]
fn request_then_response_over_bus() {
    let fleet = two_meters();

    let request = fleet.request("04025230", "get_energy").unwrap();
    assert_eq!(request.topic, "zigbee2mqtt/garage/set");
    let sent = bus::decode_action(&request.payload().unwrap()).unwrap().unwrap();
    assert_eq!(sent, request.frame);
    assert_eq!(&sent[2..5], &[0, 98, 142]);

    let frame = response(
        "04025230",
        CommandId::TariffEnergy,
        tariff_payload([1_234_567, 765_432, 1, 0]),
    );
    let outcome = fleet
        .handle_message(&bus::encode_action(&frame).unwrap())
        .unwrap();
    assert!(matches!(outcome, Some(FrameOutcome::Updated { .. })));

    let garage = fleet.device("04025230").unwrap();
    assert_eq!(garage.value(Metric::Energy(Zone::T1)), Some(12345.67));
    assert_eq!(garage.value(Metric::Energy(Zone::T2)), Some(7654.32));
    assert_eq!(garage.value(Metric::Energy(Zone::T3)), Some(0.01));
    assert_eq!(garage.value(Metric::Energy(Zone::T4)), Some(0.0));
    assert_eq!(garage.value(Metric::Power), None);

    let house = fleet.device("04023330").unwrap();
    assert_eq!(house.snapshot(), Snapshot::default());
}

#[test]
fn zero_tariff_does_not_clear_previous_reading() {
    let fleet = two_meters();
    let first = response(
        "04023330",
        CommandId::TariffEnergy,
        tariff_payload([500, 600, 700, 800]),
    );
    fleet.handle_frame(&first).unwrap();

    let zeros = response("04023330", CommandId::TariffEnergy, vec![0; 16]);
    assert!(matches!(
        fleet.handle_frame(&zeros).unwrap(),
        FrameOutcome::NoData { .. }
    ));

    let record = fleet.device("04023330").unwrap();
    assert_eq!(record.value(Metric::Energy(Zone::T1)), Some(5.0));
    assert_eq!(record.value(Metric::Energy(Zone::T4)), Some(8.0));
}

#[test]
fn dropped_frames_leave_readings_alone() {
    let fleet = two_meters();
    let good = response(
        "04023330",
        CommandId::Status,
        vec![0x02, 0x30, 0x00, 0x50, 0x00, 0x01, 0x90],
    );
    fleet.handle_frame(&good).unwrap();
    let before = fleet.device("04023330").unwrap().snapshot();

    let mut corrupt = response(
        "04023330",
        CommandId::Status,
        vec![0x02, 0x40, 0x00, 0x50, 0x00, 0x01, 0x90],
    );
    corrupt[5] ^= 0x01;
    let short = response("04023330", CommandId::Status, vec![0x02, 0x40]);
    let bad_digit = response(
        "04023330",
        CommandId::Status,
        vec![0x02, 0x4F, 0x00, 0x50, 0x00, 0x01, 0x90],
    );
    let stranger = response(
        "04999999",
        CommandId::Status,
        vec![0x02, 0x40, 0x00, 0x50, 0x00, 0x01, 0x90],
    );

    for frame in [&corrupt, &short, &bad_digit, &stranger] {
        let err = fleet.handle_frame(frame).unwrap_err();
        assert!(err.is_frame_level(), "{}", err);
    }
    assert!(matches!(
        fleet.handle_frame(&stranger),
        Err(MercuryError::UnknownDevice(_))
    ));

    assert_eq!(fleet.device("04023330").unwrap().snapshot(), before);
    let counts = fleet.stats();
    assert_eq!(counts.updated, 1);
    assert_eq!(counts.checksum_mismatch, 1);
    assert_eq!(counts.malformed, 2);
    assert_eq!(counts.unknown_device, 2);
}

#[test]
fn readers_on_other_threads() {
    let fleet = two_meters();
    let store = fleet.store();
    let address = to_address("04023330").unwrap();

    let readers: Vec<_> = (0..4)
        .map(|_| {
            let store = Arc::clone(&store);
            thread::spawn(move || {
                for _ in 0..500 {
                    let snapshot = store.get(&address).unwrap().snapshot();
                    let zones = snapshot.tariff.centi_kwh;
                    if let Some(t1) = zones[0] {
                        assert_eq!(zones, [Some(t1), Some(t1 + 1), Some(t1 + 2), Some(t1 + 3)]);
                    }
                }
            })
        })
        .collect();

    for i in 1..=500u64 {
        let frame = response(
            "04023330",
            CommandId::TariffEnergy,
            tariff_payload([i, i + 1, i + 2, i + 3]),
        );
        fleet.handle_frame(&frame).unwrap();
    }
    for reader in readers {
        reader.join().unwrap();
    }
    assert_eq!(
        fleet.device("04023330").unwrap().value(Metric::Energy(Zone::T1)),
        Some(5.0)
    );
}

#[test]
fn bad_registration_does_not_affect_others() {
    let mut fleet = two_meters();
    assert!(fleet.register(&DeviceConfig::new("", TOPIC)).is_err());
    assert!(fleet.register(&DeviceConfig::new("4023330", TOPIC)).is_err());
    assert_eq!(fleet.devices().len(), 2);
    assert!(fleet.request("04023330", "get_status").is_ok());
}
