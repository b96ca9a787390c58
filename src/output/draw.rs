// 该文件是 Dimian （地面） 项目的一部分。
// src/output/draw.rs - 放置结果标注
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

use std::borrow::Cow;

use image::RgbImage;
#[cfg(not(feature = "annotate"))]
use tracing::warn;
use url::Url;

use crate::compose::Composite;

const HORIZON_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const REGION_COLOR: [u8; 3] = [0, 0, 255]; // 蓝色
const ANCHOR_COLOR: [u8; 3] = [0, 255, 0]; // 绿色

/// 在合成图上标注地平线、物体区域与锚点，仅用于输出，不影响合成结果
#[derive(Debug, Clone)]
pub struct Draw {
  horizon_color: [u8; 3],
  region_color: [u8; 3],
  anchor_color: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      horizon_color: HORIZON_COLOR,
      region_color: REGION_COLOR,
      anchor_color: ANCHOR_COLOR,
    }
  }
}

impl Draw {
  /// 输出地址带有 `annotate` 查询参数时启用标注
  pub fn from_query(url: &Url) -> Option<Self> {
    if !url.query_pairs().any(|(k, _)| k == "annotate") {
      return None;
    }

    #[cfg(feature = "annotate")]
    {
      Some(Self::default())
    }
    #[cfg(not(feature = "annotate"))]
    {
      warn!("未启用 annotate 特性, 忽略标注参数: {}", url);
      None
    }
  }

  #[cfg(feature = "annotate")]
  pub fn annotate(&self, composite: &Composite) -> RgbImage {
    use image::Rgb;
    use imageproc::{
      drawing::{draw_cross_mut, draw_hollow_rect_mut, draw_line_segment_mut},
      rect::Rect,
    };

    let mut image = composite.image.clone();
    let (width, height) = image.dimensions();

    let horizon = composite.horizon_row as f32;
    if (0.0..height as f32).contains(&horizon) {
      draw_line_segment_mut(
        &mut image,
        (0.0, horizon),
        (width.saturating_sub(1) as f32, horizon),
        Rgb(self.horizon_color),
      );
    }

    let region = composite.region;
    let rect = Rect::at(region.left as i32, region.top as i32).of_size(region.width, region.height);
    draw_hollow_rect_mut(&mut image, rect, Rgb(self.region_color));

    draw_cross_mut(
      &mut image,
      Rgb(self.anchor_color),
      composite.anchor.x as i32,
      composite.anchor.y as i32,
    );

    image
  }
}

/// 取得最终写出的图像：启用标注时返回标注副本，否则直接借用合成图
pub fn output_image<'a>(draw: Option<&Draw>, composite: &'a Composite) -> Cow<'a, RgbImage> {
  match draw {
    #[cfg(feature = "annotate")]
    Some(draw) => Cow::Owned(draw.annotate(composite)),
    _ => Cow::Borrowed(&composite.image),
  }
}
