// 该文件是 Dimian （地面） 项目的一部分。
// src/output/directory_record.rs - 目录记录输出
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

use thiserror::Error;
use tracing::info;

use crate::{
  FromUrl, FromUrlWithScheme,
  compose::Composite,
  output::{
    Render,
    draw::{Draw, output_image},
  },
  url_path,
};

#[derive(Error, Debug)]
pub enum DirectoryRecordOutputError {
  #[error("URI 方案不匹配")]
  SchemeMismatch,
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
}

/// 每个放置结果写入目录下的 `render_{index}.png`
pub struct DirectoryRecordOutput {
  directory: PathBuf,
  draw: Option<Draw>,
}

impl FromUrlWithScheme for DirectoryRecordOutput {
  const SCHEME: &'static str = "folder";
}

impl FromUrl for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn from_url(uri: &url::Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(DirectoryRecordOutputError::SchemeMismatch);
    }

    let directory = url_path(uri);
    std::fs::create_dir_all(&directory)?;

    Ok(DirectoryRecordOutput {
      directory,
      draw: Draw::from_query(uri),
    })
  }
}

impl DirectoryRecordOutput {
  pub fn frame_path(&self, index: usize) -> PathBuf {
    self.directory.join(format!("render_{}.png", index))
  }
}

impl Render for DirectoryRecordOutput {
  type Error = DirectoryRecordOutputError;

  fn render_result(&self, index: usize, result: &Composite) -> Result<(), Self::Error> {
    let path = self.frame_path(index);
    output_image(self.draw.as_ref(), result).save(&path)?;
    info!("写入 {}", path.display());
    Ok(())
  }
}
