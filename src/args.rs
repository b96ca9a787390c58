// 该文件是 Dimian （地面） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser};
use tracing::info;
use url::Url;

use crate::{
  camera::{CameraError, CameraParams},
  compose::Anchor,
};

/// Dimian 项目参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 背景图像
  #[arg(long, value_name = "SOURCE", default_value = "image:background.jpg")]
  pub background: Url,

  /// 带透明度通道的物体图像
  #[arg(long, value_name = "SOURCE")]
  pub object: Url,

  /// 物体真实高度（米）
  #[arg(long, value_name = "METERS")]
  pub height: f64,

  /// 物体底部中心的位置，格式为 y,x
  #[arg(
    long,
    value_name = "Y,X",
    num_args = 1..,
    default_values = ["1300,1300", "1800,2000"]
  )]
  pub positions: Vec<Anchor>,

  /// 输出路径
  /// 支持格式:
  /// - 目录: folder:renders （写入 render_{序号}.png）
  /// - 图片: image:out.png
  /// 附加 ?annotate 可标注地平线与物体区域
  #[arg(long, value_name = "OUTPUT", default_value = "folder:renders")]
  pub output: Url,

  #[command(flatten)]
  pub camera: CameraArgs,
}

/// 相机参数，`--camera` 指定的 JSON 文件优先于单项参数
#[derive(ClapArgs, Debug, Clone)]
pub struct CameraArgs {
  /// 相机配置文件（JSON）
  #[arg(long = "camera", value_name = "FILE")]
  pub file: Option<PathBuf>,

  /// 镜头焦距（毫米）
  #[arg(long, default_value = "15.0", value_name = "MM")]
  pub focal_length: f64,

  /// 传感器宽度（毫米）
  #[arg(long, default_value = "36.0", value_name = "MM")]
  pub sensor_width: f64,

  /// 传感器高度（毫米）
  #[arg(long, default_value = "24.0", value_name = "MM")]
  pub sensor_height: f64,

  /// 相机离地高度（毫米）
  #[arg(long, default_value = "1600.0", value_name = "MM")]
  pub camera_height: f64,

  /// 地面距离标定常数（毫米）
  #[arg(long, default_value = "2000.0", value_name = "MM")]
  pub ground_distance: f64,
}

impl CameraArgs {
  pub fn to_camera(&self) -> Result<CameraParams, CameraError> {
    if let Some(path) = &self.file {
      info!("使用相机配置文件: {}", path.display());
      return CameraParams::from_json_file(path);
    }

    let camera = CameraParams::new(
      self.focal_length,
      self.sensor_width,
      self.sensor_height,
      self.camera_height,
    )
    .with_ground_distance(self.ground_distance);
    camera.validate()?;
    Ok(camera)
  }
}
