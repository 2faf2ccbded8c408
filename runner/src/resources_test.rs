use crate::resources::{byte_size, clamp, positive_integer, RuntimeValueError};
use serde_yaml::Value;

#[test]
pub fn positive_integer_accepts_numbers_and_strings() {
    assert_eq!(positive_integer("cpu", &Value::from(4u64)), Ok(4));
    assert_eq!(positive_integer("cpu", &Value::from(" 2 ")), Ok(2));
}

#[test]
pub fn positive_integer_rejects_zero_and_negatives() {
    assert_eq!(
        positive_integer("cpu", &Value::from(0i64)),
        Err(RuntimeValueError::NotPositive {
            key: "cpu".to_string(),
            value: 0
        })
    );
    assert!(matches!(
        positive_integer("cpu", &Value::from(-3i64)),
        Err(RuntimeValueError::NotPositive { value: -3, .. })
    ));
}

#[test]
pub fn positive_integer_rejects_other_types() {
    assert!(matches!(
        positive_integer("time_minutes", &Value::from(1.5f64)),
        Err(RuntimeValueError::NotAnInteger { .. })
    ));
    assert!(matches!(
        positive_integer("time_minutes", &Value::from("soon")),
        Err(RuntimeValueError::NotAnInteger { .. })
    ));
    assert!(matches!(
        positive_integer("cpu", &Value::Null),
        Err(RuntimeValueError::NotAnInteger { .. })
    ));
}

#[test]
pub fn byte_size_parses_units() {
    assert_eq!(byte_size("memory", &Value::from(2_500_000u64)), Ok(2_500_000));
    assert_eq!(byte_size("memory", &Value::from("8 GB")), Ok(8_000_000_000));
    assert_eq!(byte_size("memory", &Value::from("4 GiB")), Ok(4 * 1024 * 1024 * 1024));
    assert_eq!(byte_size("memory", &Value::from("512MB")), Ok(512_000_000));
}

#[test]
pub fn byte_size_rejects_garbage() {
    assert!(matches!(
        byte_size("memory", &Value::from("lots")),
        Err(RuntimeValueError::InvalidByteSize { .. })
    ));
    assert!(matches!(
        byte_size("memory", &Value::from(-1i64)),
        Err(RuntimeValueError::InvalidByteSize { .. })
    ));
    assert!(matches!(
        byte_size("memory", &Value::Bool(true)),
        Err(RuntimeValueError::InvalidByteSize { .. })
    ));
}

#[test]
pub fn clamp_reduces_to_limit() {
    assert_eq!(clamp("cpu", 64, 8), 8);
    assert_eq!(clamp("cpu", 4, 8), 4);
    assert_eq!(clamp("memory", u64::MAX, u64::MAX), u64::MAX);
}
