// 该文件是 Dimian （地面） 项目的一部分。
// src/input/read_image_file.rs - 图像文件输入
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

use image::{DynamicImage, ImageReader, RgbImage};
use thiserror::Error;
use tracing::{error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  layer::{LayerError, ObjectLayer},
  url_path,
};

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(std::io::Error),
  #[error("Image loading error: {0}")]
  ImageLoadError(image::ImageError),
  #[error("Image has no alpha channel: {0}")]
  MissingAlpha(PathBuf),
  #[error("Invalid object layer: {0}")]
  Layer(#[from] LayerError),
}

impl From<std::io::Error> for ImageFileInputError {
  fn from(err: std::io::Error) -> Self {
    ImageFileInputError::IoError(err)
  }
}

impl From<image::ImageError> for ImageFileInputError {
  fn from(err: image::ImageError) -> Self {
    ImageFileInputError::ImageLoadError(err)
  }
}

/// 从 `image:` 地址读取的图像，可作为背景或带透明度的物体使用
pub struct ImageFileInput {
  path: PathBuf,
  image: DynamicImage,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = url_path(url);
    let image = ImageReader::open(&path)?.with_guessed_format()?.decode()?;
    info!(
      "读取图像 {}: {}x{} {:?}",
      path.display(),
      image.width(),
      image.height(),
      image.color()
    );

    Ok(ImageFileInput { path, image })
  }
}

impl ImageFileInput {
  pub fn dimensions(&self) -> (u32, u32) {
    (self.image.width(), self.image.height())
  }

  /// 作为背景使用，丢弃透明度
  pub fn into_background(self) -> RgbImage {
    self.image.into_rgb8()
  }

  /// 作为物体使用，要求图像带有透明度通道
  pub fn into_object_layer(self) -> Result<ObjectLayer, ImageFileInputError> {
    if !self.image.color().has_alpha() {
      return Err(ImageFileInputError::MissingAlpha(self.path));
    }
    Ok(ObjectLayer::from_rgba(&self.image.into_rgba8())?)
  }
}
