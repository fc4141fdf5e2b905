use mercury200::fleet::DEFAULT_TOPIC;
use mercury200::{DeviceConfig, DeviceRecord, Metric};

/// Parse `SERIAL[@TOPIC]`.
pub fn parse_device(s: &str) -> Result<DeviceConfig, String> {
    let s = s.trim();
    let (serial, topic) = match s.split_once('@') {
        Some((serial, topic)) if !topic.is_empty() => (serial, topic),
        Some(_) => return Err(format!("missing topic after '@' in '{}'", s)),
        None => (s, DEFAULT_TOPIC),
    };
    mercury200::to_address(serial).map_err(|e| e.to_string())?;
    Ok(DeviceConfig::new(serial, topic))
}

/// Parse a frame given either as hex (`07 00 5B 22 ...`, separators optional) or
/// as a JSON byte array (`[7, 0, 91, 34, ...]`).
#[allow(dead_code)]
pub fn parse_frame(s: &str) -> Result<Vec<u8>, String> {
    let s = s.trim();
    if s.starts_with('[') {
        return serde_json::from_str(s).map_err(|e| e.to_string());
    }

    let cleaned: String = s
        .chars()
        .filter(|c| !matches!(c, ' ' | ':' | '-' | ','))
        .collect();
    let digits = cleaned
        .strip_prefix("0x")
        .or_else(|| cleaned.strip_prefix("0X"))
        .unwrap_or(&cleaned);
    if digits.is_empty() {
        return Err(format!("'{}' contains no hex bytes", s));
    }
    hex::decode(digits).map_err(|e| format!("'{}': {}", s, e))
}

/// Parse a physical quantity for the simulator. Negative and non-finite values
/// have no packed-decimal form.
#[allow(dead_code)]
pub fn parse_quantity(s: &str) -> Result<f64, String> {
    let value: f64 = s.trim().parse().map_err(|e| format!("'{}': {}", s, e))?;
    if !value.is_finite() || value < 0.0 {
        return Err(format!("'{}' must be a finite, non-negative number", s));
    }
    Ok(value)
}

#[allow(dead_code)]
pub fn print_record(record: &DeviceRecord) {
    println!("═══════════════════════════════════════════════════════════");
    println!(
        "Meter {} ({})  address {}  topic {}",
        record.serial, record.model, record.address, record.topic
    );
    println!("═══════════════════════════════════════════════════════════");

    let snapshot = record.snapshot();
    let show = |metric: Metric, precision: usize| match snapshot.value(metric) {
        Some(v) => format!("{:.*} {}", precision, v, metric.unit()),
        None => "-".to_string(),
    };
    println!(
        "  Voltage: {}    Current: {}    Power: {}",
        show(Metric::Voltage, 1),
        show(Metric::Current, 2),
        show(Metric::Power, 0)
    );
    for metric in Metric::ALL.into_iter().filter(|m| m.is_energy()) {
        println!("  {}: {}", metric, show(metric, 2));
    }
    if let Some(at) = snapshot.status.updated_at {
        println!("  Status updated {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    if let Some(at) = snapshot.tariff.updated_at {
        println!("  Tariff updated {}", at.format("%Y-%m-%d %H:%M:%S UTC"));
    }
    println!();
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn frame_from_hex() {
        let expected = vec![0x07, 0x00, 0x00, 0x5B, 0x22, 0x63, 0x0D, 0x5A];
        assert_eq!(parse_frame("0700005B22630D5A").unwrap(), expected);
        assert_eq!(parse_frame("07 00 00 5b 22 63 0d 5a").unwrap(), expected);
        assert_eq!(parse_frame("07:00:00:5B:22:63:0D:5A").unwrap(), expected);
        assert_eq!(parse_frame("0x0700005B22630D5A").unwrap(), expected);
        assert_eq!(parse_frame("[7, 0, 0, 91, 34, 99, 13, 90]").unwrap(), expected);
    }

    #[test]
    fn bad_hex_is_an_error() {
        assert!(parse_frame("").is_err());
        assert!(parse_frame("0x").is_err());
        assert!(parse_frame("070").is_err());
        assert!(parse_frame("zz").is_err());
        assert!(parse_frame("aé1").is_err());
        assert!(parse_frame("é").is_err());
        assert!(parse_frame("[7, 256]").is_err());
    }

    #[test]
    fn device_with_topic() {
        let config = parse_device("04023330@home/meter").unwrap();
        assert_eq!(config.serial, "04023330");
        assert_eq!(config.topic, "home/meter");
        assert_eq!(parse_device("04023330").unwrap().topic, DEFAULT_TOPIC);
        assert!(parse_device("04023330@").is_err());
        assert!(parse_device("0402x330").is_err());
    }

    #[test]
    fn quantities() {
        assert_eq!(parse_quantity("230.5").unwrap(), 230.5);
        assert_eq!(parse_quantity("0").unwrap(), 0.0);
        assert!(parse_quantity("-1").is_err());
        assert!(parse_quantity("NaN").is_err());
        assert!(parse_quantity("inf").is_err());
        assert!(parse_quantity("volts").is_err());
    }
}
