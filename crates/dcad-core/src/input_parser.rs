//! 命令行输入解析器
//!
//! 支持的输入格式：
//! - 绝对坐标: `100,50` 或 `100,50,25`
//! - 相对坐标: `@100,50` 或 `@100,50,25`
//! - 极坐标: `@100<45` (相对) 或 `100<45` (长度+角度)
//! - 距离: `100`
//! - 角度: `<45`
//!
//! 极坐标与长度+角度都在参考点所在的 XY 平面内解释。

use crate::math::Point3;

/// 解析后的输入值
#[derive(Debug, Clone, PartialEq)]
pub enum InputValue {
    /// 点坐标
    Point(Point3),
    /// 距离值
    Distance(f64),
    /// 角度值（弧度）
    Angle(f64),
    /// 长度和角度（弧度）
    LengthAngle { length: f64, angle: f64 },
}

/// 解析错误
#[derive(Debug, Clone, PartialEq)]
pub enum ParseError {
    /// 无效格式
    InvalidFormat(String),
    /// 缺少必需的值
    MissingValue(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::InvalidFormat(msg) => write!(f, "Invalid format: {}", msg),
            ParseError::MissingValue(msg) => write!(f, "Missing value: {}", msg),
        }
    }
}

impl std::error::Error for ParseError {}

/// 输入解析器
pub struct InputParser;

impl InputParser {
    /// 解析输入字符串
    ///
    /// # 参数
    /// - `input`: 输入字符串
    /// - `reference`: 参考点（用于相对坐标和极坐标）
    ///
    /// # 返回
    /// 解析后的输入值或错误
    pub fn parse(input: &str, reference: Option<Point3>) -> Result<InputValue, ParseError> {
        let input = input.trim();
        if input.is_empty() {
            return Err(ParseError::InvalidFormat("Empty input".to_string()));
        }

        // 尝试解析为长度+角度格式 (如 "100<45" 或 "@100<45")
        if let Some(angle_pos) = input.rfind('<') {
            let (prefix, angle_str) = input.split_at(angle_pos);
            let angle_str = &angle_str[1..]; // 去掉 '<'

            let angle_deg = angle_str
                .parse::<f64>()
                .map_err(|_| ParseError::InvalidFormat(format!("Invalid angle: {}", angle_str)))?;
            let angle_rad = angle_deg.to_radians();

            // 只有角度: "<45"
            if prefix.is_empty() {
                return Ok(InputValue::Angle(angle_rad));
            }

            let (is_relative, length_str) = match prefix.strip_prefix('@') {
                Some(rest) => (true, rest),
                None => (false, prefix),
            };

            if length_str.is_empty() {
                return Ok(InputValue::Angle(angle_rad));
            }

            let length = length_str.parse::<f64>().map_err(|_| {
                ParseError::InvalidFormat(format!("Invalid length: {}", length_str))
            })?;

            if is_relative {
                // 相对极坐标: "@100<45"
                return match reference {
                    Some(ref_point) => Ok(InputValue::Point(Self::polar_to_point(
                        ref_point, length, angle_rad,
                    ))),
                    None => Err(ParseError::MissingValue(
                        "Reference point required for relative polar coordinate".to_string(),
                    )),
                };
            }
            // 长度+角度: "100<45"
            return Ok(InputValue::LengthAngle {
                length,
                angle: angle_rad,
            });
        }

        // 尝试解析为坐标格式 (如 "100,50" / "100,50,25" / "@100,50")
        if input.contains(',') {
            let (is_relative, coord_str) = match input.strip_prefix('@') {
                Some(rest) => (true, rest),
                None => (false, input),
            };

            let parts: Vec<&str> = coord_str.split(',').collect();
            if parts.len() != 2 && parts.len() != 3 {
                return Err(ParseError::InvalidFormat(format!(
                    "Coordinate must have 2 or 3 components: {}",
                    input
                )));
            }

            let mut values = [0.0; 3];
            for (i, part) in parts.iter().enumerate() {
                values[i] = part.trim().parse::<f64>().map_err(|_| {
                    ParseError::InvalidFormat(format!("Invalid coordinate component: {}", part))
                })?;
            }
            let point = Point3::new(values[0], values[1], values[2]);

            if is_relative {
                // 相对坐标: "@100,50"
                return match reference {
                    Some(ref_point) => Ok(InputValue::Point(ref_point + point.coords)),
                    None => Err(ParseError::MissingValue(
                        "Reference point required for relative coordinate".to_string(),
                    )),
                };
            }
            // 绝对坐标: "100,50"
            return Ok(InputValue::Point(point));
        }

        // 尝试解析为纯数字（距离或半径）
        if let Ok(value) = input.parse::<f64>() {
            return Ok(InputValue::Distance(value));
        }

        Err(ParseError::InvalidFormat(format!(
            "Cannot parse input: {}",
            input
        )))
    }

    /// 解析为点坐标（强制返回点）
    ///
    /// 长度+角度与纯距离输入基于参考点计算点坐标。
    pub fn parse_point(input: &str, reference: Option<Point3>) -> Result<Point3, ParseError> {
        match Self::parse(input, reference)? {
            InputValue::Point(p) => Ok(p),
            InputValue::LengthAngle { length, angle } => match reference {
                Some(ref_point) => Ok(Self::polar_to_point(ref_point, length, angle)),
                None => Err(ParseError::MissingValue(
                    "Reference point required for length+angle input".to_string(),
                )),
            },
            InputValue::Distance(len) => {
                // 纯距离沿参考点 X 正方向解释
                match reference {
                    Some(ref_point) => Ok(Point3::new(ref_point.x + len, ref_point.y, ref_point.z)),
                    None => Err(ParseError::MissingValue(
                        "Reference point required for distance-only input".to_string(),
                    )),
                }
            }
            _ => Err(ParseError::InvalidFormat(
                "Input cannot be converted to point".to_string(),
            )),
        }
    }

    /// 解析为距离（标量、长度+角度的长度部分，或相对参考点的坐标）
    pub fn parse_distance(input: &str, reference: Option<Point3>) -> Result<f64, ParseError> {
        match Self::parse(input, reference)? {
            InputValue::Distance(v) => Ok(v),
            InputValue::LengthAngle { length, .. } => Ok(length),
            InputValue::Point(p) => match reference {
                Some(ref_point) => Ok((p - ref_point).norm()),
                None => Err(ParseError::MissingValue(
                    "Reference point required to measure a coordinate as distance".to_string(),
                )),
            },
            InputValue::Angle(_) => Err(ParseError::InvalidFormat(
                "Angle cannot be converted to distance".to_string(),
            )),
        }
    }

    /// 将极坐标转换为点（在参考点所在 XY 平面内）
    fn polar_to_point(origin: Point3, distance: f64, angle: f64) -> Point3 {
        Point3::new(
            origin.x + distance * angle.cos(),
            origin.y + distance * angle.sin(),
            origin.z,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_absolute_coordinate() {
        let result = InputParser::parse("100,50", None).unwrap();
        assert!(matches!(result, InputValue::Point(p) if p.x == 100.0 && p.y == 50.0 && p.z == 0.0));
    }

    #[test]
    fn test_parse_absolute_coordinate_3d() {
        let result = InputParser::parse("100,50,25", None).unwrap();
        assert!(matches!(result, InputValue::Point(p) if p.z == 25.0));
    }

    #[test]
    fn test_parse_relative_coordinate() {
        let ref_point = Point3::new(10.0, 20.0, 5.0);
        let result = InputParser::parse("@100,50", Some(ref_point)).unwrap();
        assert!(matches!(result, InputValue::Point(p) if p.x == 110.0 && p.y == 70.0 && p.z == 5.0));
    }

    #[test]
    fn test_parse_relative_requires_reference() {
        let result = InputParser::parse("@100,50", None);
        assert!(matches!(result, Err(ParseError::MissingValue(_))));
    }

    #[test]
    fn test_parse_polar_relative() {
        let ref_point = Point3::new(0.0, 0.0, 0.0);
        let result = InputParser::parse("@100<45", Some(ref_point)).unwrap();
        match result {
            InputValue::Point(p) => {
                let expected_x = 100.0 * (45.0_f64.to_radians().cos());
                let expected_y = 100.0 * (45.0_f64.to_radians().sin());
                assert!((p.x - expected_x).abs() < 1e-10);
                assert!((p.y - expected_y).abs() < 1e-10);
            }
            _ => panic!("Expected Point"),
        }
    }

    #[test]
    fn test_parse_length_angle() {
        let result = InputParser::parse("100<45", None).unwrap();
        match result {
            InputValue::LengthAngle { length, angle } => {
                assert_eq!(length, 100.0);
                assert!((angle - 45.0_f64.to_radians()).abs() < 1e-10);
            }
            _ => panic!("Expected LengthAngle"),
        }
    }

    #[test]
    fn test_parse_distance_scalar() {
        let result = InputParser::parse("100", None).unwrap();
        assert!(matches!(result, InputValue::Distance(v) if v == 100.0));
    }

    #[test]
    fn test_parse_angle() {
        let result = InputParser::parse("<45", None).unwrap();
        assert!(matches!(result, InputValue::Angle(a) if (a - 45.0_f64.to_radians()).abs() < 1e-10));
    }

    #[test]
    fn test_parse_point_from_distance() {
        let ref_point = Point3::new(10.0, 0.0, 0.0);
        let p = InputParser::parse_point("5", Some(ref_point)).unwrap();
        assert!((p - Point3::new(15.0, 0.0, 0.0)).norm() < 1e-10);
    }

    #[test]
    fn test_parse_distance_from_point() {
        // 坐标输入按到参考点的距离解释
        let ref_point = Point3::new(0.0, 0.0, 0.0);
        let d = InputParser::parse_distance("3,4", Some(ref_point)).unwrap();
        assert!((d - 5.0).abs() < 1e-10);
    }

    #[test]
    fn test_parse_garbage_rejected() {
        assert!(InputParser::parse("abc", None).is_err());
        assert!(InputParser::parse("1,2,3,4", None).is_err());
        assert!(InputParser::parse("", None).is_err());
    }
}
