// 该文件是 Dimian （地面） 项目的一部分。
// src/camera.rs - 相机与场景几何参数
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

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// 默认的地面距离标定常数（毫米）
pub const DEFAULT_GROUND_DISTANCE_MM: f64 = 2000.0;

fn default_ground_distance() -> f64 {
  DEFAULT_GROUND_DISTANCE_MM
}

#[derive(Error, Debug)]
pub enum CameraError {
  #[error("相机参数 {0} 不是有限值")]
  NonFinite(&'static str),
  #[error("相机参数 {0} 必须为正数, 实际为 {1}")]
  NonPositive(&'static str, f64),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("相机配置解析错误: {0}")]
  JsonError(#[from] serde_json::Error),
}

/// 相机与场景几何参数
///
/// 除特别说明外，单位均为毫米。相机光轴与地面平行，高度以地面为零点向上为正。
/// 创建后不再修改，同一会话中的所有放置请求共享同一份参数。
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraParams {
  /// 镜头焦距
  pub focal_length_mm: f64,
  /// 传感器宽度（求解器不使用）
  pub sensor_width_mm: f64,
  /// 传感器高度
  pub sensor_height_mm: f64,
  /// 相机光心距地面高度
  pub camera_height_mm: f64,
  /// 地面距离标定常数，控制物体随距离缩小的速度，并非实测距离
  #[serde(default = "default_ground_distance")]
  pub ground_distance_mm: f64,
}

impl CameraParams {
  pub fn new(
    focal_length_mm: f64,
    sensor_width_mm: f64,
    sensor_height_mm: f64,
    camera_height_mm: f64,
  ) -> Self {
    Self {
      focal_length_mm,
      sensor_width_mm,
      sensor_height_mm,
      camera_height_mm,
      ground_distance_mm: DEFAULT_GROUND_DISTANCE_MM,
    }
  }

  pub fn with_ground_distance(mut self, ground_distance_mm: f64) -> Self {
    self.ground_distance_mm = ground_distance_mm;
    self
  }

  /// 检查参数是否可用于求解：全部为有限值，焦距与传感器高度为正
  pub fn validate(&self) -> Result<(), CameraError> {
    let fields = [
      ("focal_length_mm", self.focal_length_mm),
      ("sensor_width_mm", self.sensor_width_mm),
      ("sensor_height_mm", self.sensor_height_mm),
      ("camera_height_mm", self.camera_height_mm),
      ("ground_distance_mm", self.ground_distance_mm),
    ];
    for (name, value) in fields {
      if !value.is_finite() {
        return Err(CameraError::NonFinite(name));
      }
    }

    if self.focal_length_mm <= 0.0 {
      return Err(CameraError::NonPositive(
        "focal_length_mm",
        self.focal_length_mm,
      ));
    }
    if self.sensor_height_mm <= 0.0 {
      return Err(CameraError::NonPositive(
        "sensor_height_mm",
        self.sensor_height_mm,
      ));
    }

    Ok(())
  }

  pub fn from_json_str(json: &str) -> Result<Self, CameraError> {
    let camera: CameraParams = serde_json::from_str(json)?;
    camera.validate()?;
    Ok(camera)
  }

  pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self, CameraError> {
    let path = path.as_ref();
    debug!("读取相机配置: {}", path.display());
    let content = std::fs::read_to_string(path)?;
    Self::from_json_str(&content)
  }
}
