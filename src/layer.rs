// 该文件是 Dimian （地面） 项目的一部分。
// src/layer.rs - 带透明度的物体图层
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

use image::{ImageBuffer, Luma, RgbImage, RgbaImage};
use thiserror::Error;

/// 单通道透明度蒙版，取值范围 [0, 1]
pub type AlphaMask = ImageBuffer<Luma<f32>, Vec<f32>>;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum LayerError {
  #[error("物体图像为空")]
  Empty,
  #[error("颜色与透明度尺寸不一致: 颜色 {color:?}, 透明度 {alpha:?}")]
  DimensionMismatch { color: (u32, u32), alpha: (u32, u32) },
}

/// 物体图层：颜色图与逐像素对齐的透明度蒙版
#[derive(Debug, Clone)]
pub struct ObjectLayer {
  color: RgbImage,
  alpha: AlphaMask,
}

impl ObjectLayer {
  pub fn new(color: RgbImage, alpha: AlphaMask) -> Result<Self, LayerError> {
    check_aligned(&color, &alpha)?;
    Ok(Self { color, alpha })
  }

  /// 拆分 RGBA 图像的颜色与透明度通道
  pub fn from_rgba(image: &RgbaImage) -> Result<Self, LayerError> {
    let (width, height) = image.dimensions();
    let color = RgbImage::from_fn(width, height, |x, y| {
      let [r, g, b, _] = image.get_pixel(x, y).0;
      image::Rgb([r, g, b])
    });
    let alpha = AlphaMask::from_fn(width, height, |x, y| {
      Luma([image.get_pixel(x, y)[3] as f32 / 255.0])
    });
    Self::new(color, alpha)
  }

  pub fn color(&self) -> &RgbImage {
    &self.color
  }

  pub fn alpha(&self) -> &AlphaMask {
    &self.alpha
  }

  pub fn dimensions(&self) -> (u32, u32) {
    self.color.dimensions()
  }
}

pub(crate) fn check_aligned(color: &RgbImage, alpha: &AlphaMask) -> Result<(), LayerError> {
  if color.width() == 0 || color.height() == 0 {
    return Err(LayerError::Empty);
  }
  if color.dimensions() != alpha.dimensions() {
    return Err(LayerError::DimensionMismatch {
      color: color.dimensions(),
      alpha: alpha.dimensions(),
    });
  }
  Ok(())
}
