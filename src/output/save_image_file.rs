// 该文件是 Dimian （地面） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use std::path::{Path, PathBuf};

use image::RgbImage;
use thiserror::Error;
use tracing::info;
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  compose::Composite,
  output::{
    Render,
    draw::{Draw, output_image},
  },
  url_path,
};

/// 写入单个图像文件；第 0 个结果写入给定路径，其余结果在文件名后追加序号
pub struct SaveImageFileOutput {
  path: PathBuf,
  draw: Option<Draw>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(image::ImageError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    Ok(SaveImageFileOutput {
      path: url_path(uri),
      draw: Draw::from_query(uri),
    })
  }
}

impl SaveImageFileOutput {
  pub fn path_for(&self, index: usize) -> PathBuf {
    if index == 0 {
      return self.path.clone();
    }

    let stem = self
      .path
      .file_stem()
      .map(|s| s.to_string_lossy().into_owned())
      .unwrap_or_default();
    let name = match self.path.extension() {
      Some(ext) => format!("{}-{}.{}", stem, index, ext.to_string_lossy()),
      None => format!("{}-{}", stem, index),
    };
    self.path.with_file_name(name)
  }

  fn save_image(&self, path: &Path, image: &RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = path.parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent).map_err(SaveImageFileError::IoError)?;
    }

    image.save(path).map_err(SaveImageFileError::ImageError)?;

    info!("保存图像到文件: {}", path.display());

    Ok(())
  }
}

impl Render for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, index: usize, result: &Composite) -> Result<(), Self::Error> {
    let image = output_image(self.draw.as_ref(), result);
    self.save_image(&self.path_for(index), &image)
  }
}
