// 该文件是 Dimian （地面） 项目的一部分。
// src/geometry.rs - 透视投影求解
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use thiserror::Error;

use crate::camera::CameraParams;

#[derive(Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum GeometryError {
  #[error("y={y_px} 处无法放置: 位于地平线之上或投影高度非正 ({height_px}px)")]
  Unplaceable { y_px: i64, height_px: i64 },
}

/// 根据物体真实高度与其底部所在的图像行，计算物体在图像中的像素高度。
///
/// 使用简化的针孔相机模型，光轴与地面平行。`y_px` 从图像顶部开始计数，
/// 数值越大表示越靠近画面底部（离相机越近）。
///
/// 返回值不大于 0 表示该位置无法放置（在地平线之上，或几何退化）。
/// 任何分母为零或中间结果非有限值的情况都归一为 0。
pub fn solve_height_px(
  camera: &CameraParams,
  bg_height_px: u32,
  y_px: i64,
  object_height_m: f64,
) -> i64 {
  let object_height_mm = object_height_m * 1000.0;
  let bg_height = bg_height_px as f64;
  let pixel_per_mm = bg_height / camera.sensor_height_mm;

  // 图像坐标（左上角为原点）转换为传感器上的毫米坐标，纵轴翻转
  let y_sensor_mm = (bg_height - y_px as f64) / pixel_per_mm;
  let half_sensor_mm = camera.sensor_height_mm / 2.0;

  if y_sensor_mm > half_sensor_mm {
    return 0;
  }

  let below_horizon_mm = half_sensor_mm - y_sensor_mm;
  if below_horizon_mm == 0.0 {
    return 0;
  }

  // 相机到物体脚下地面点的距离
  let ground_range_mm =
    camera.focal_length_mm * camera.camera_height_mm / below_horizon_mm - camera.ground_distance_mm;
  let depth_mm = camera.ground_distance_mm + ground_range_mm;
  if depth_mm == 0.0 {
    return 0;
  }

  let height_mm = below_horizon_mm
    - camera.focal_length_mm * (camera.camera_height_mm - object_height_mm) / depth_mm;
  let height_px = (height_mm * pixel_per_mm).trunc();

  if !height_px.is_finite() {
    return 0;
  }
  height_px as i64
}

/// `solve_height_px` 的显式结果版本，非正高度以错误返回
pub fn project_height(
  camera: &CameraParams,
  bg_height_px: u32,
  y_px: i64,
  object_height_m: f64,
) -> Result<u32, GeometryError> {
  let height_px = solve_height_px(camera, bg_height_px, y_px, object_height_m);
  if height_px <= 0 {
    return Err(GeometryError::Unplaceable { y_px, height_px });
  }
  Ok(u32::try_from(height_px).unwrap_or(u32::MAX))
}

/// 地平线所在的图像行，行号小于该值的锚点无法放置
pub fn horizon_row(camera: &CameraParams, bg_height_px: u32) -> f64 {
  let bg_height = bg_height_px as f64;
  let pixel_per_mm = bg_height / camera.sensor_height_mm;
  bg_height - camera.sensor_height_mm / 2.0 * pixel_per_mm
}
