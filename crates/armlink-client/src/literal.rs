//! 位姿字面量解析
//!
//! 字面量是最多 9 个以空白分隔的整数，按固定字段顺序
//! `X Y Z W P R segment_time motion_type control` 排列；
//! 缺省的尾部字段沿用基准位姿的值。

use crate::error::InputError;
use armlink_protocol::{FIELD_COUNT, FieldBuffer, MotionParams, Point};

/// 解析位姿字面量
///
/// # Example
///
/// ```
/// use armlink_client::parse_point;
/// use armlink_protocol::Point;
///
/// let p = parse_point("900000 10", &Point::home()).unwrap();
/// assert_eq!(p.coords(), [900_000, 10, 940_000, -180_000, 0, 0]);
/// ```
pub fn parse_point(literal: &str, base: &Point) -> Result<Point, InputError> {
    let invalid = |reason: String| InputError::InvalidPoint {
        literal: literal.trim().to_string(),
        reason,
    };

    let mut values = FieldBuffer::new();
    for token in literal.split_whitespace() {
        if values.len() == FIELD_COUNT {
            return Err(invalid(format!("more than {} fields", FIELD_COUNT)));
        }
        let value = token
            .parse::<i32>()
            .map_err(|_| invalid(format!("{:?} is not an integer", token)))?;
        values.push(value);
    }
    if values.is_empty() {
        return Err(invalid("empty literal".to_string()));
    }

    let mut fields = base.to_fields();
    fields[..values.len()].copy_from_slice(&values);

    let coords = [
        fields[0], fields[1], fields[2], fields[3], fields[4], fields[5],
    ];
    let params = MotionParams::from_raw(fields[6], fields[7], fields[8])
        .map_err(|e| invalid(e.to_string()))?;
    Ok(Point::new(coords, params))
}
