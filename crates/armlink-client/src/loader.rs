//! 轨迹文件加载
//!
//! 每个非空行是一个位姿字面量，`#` 开头的行为注释。
//! 每行都以模板位姿为基准解析，任何一行无效则整个文件无效。

use crate::error::PlanError;
use crate::literal::parse_point;
use armlink_protocol::Point;
use std::fs;
use std::path::Path;
use tracing::debug;

const COMMENT: char = '#';

/// 加载轨迹文件
pub fn load_trajectory(path: impl AsRef<Path>, template: &Point) -> Result<Vec<Point>, PlanError> {
    let path = path.as_ref();
    let text = fs::read_to_string(path).map_err(|source| PlanError::Load {
        path: path.to_path_buf(),
        source,
    })?;

    let mut points = Vec::new();
    for (index, line) in text.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() || line.starts_with(COMMENT) {
            continue;
        }
        let point = parse_point(line, template).map_err(|source| PlanError::InvalidLine {
            path: path.to_path_buf(),
            line: index + 1,
            source,
        })?;
        points.push(point);
    }

    if points.is_empty() {
        return Err(PlanError::EmptyTrajectory {
            path: path.to_path_buf(),
        });
    }
    debug!("Loaded {} points from {}", points.len(), path.display());
    Ok(points)
}
