// 该文件是 Dimian （地面） 项目的一部分。
// src/compose.rs - 物体缩放与透明度合成
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

use std::{fmt, str::FromStr};

use image::{
  Rgb, RgbImage,
  imageops::{self, FilterType},
};
use thiserror::Error;
use tracing::debug;

use crate::{
  camera::{CameraError, CameraParams},
  geometry::{GeometryError, horizon_row, project_height},
  layer::{AlphaMask, LayerError, ObjectLayer, check_aligned},
};

/// 物体底部中心在背景中的位置，`(y, x)` 顺序与命令行一致
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Anchor {
  pub y: i64,
  pub x: i64,
}

impl Anchor {
  pub fn new(y: i64, x: i64) -> Self {
    Self { y, x }
  }
}

impl fmt::Display for Anchor {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "({}, {})", self.y, self.x)
  }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("锚点格式无效 '{0}', 应为 'y,x'")]
pub struct AnchorParseError(String);

impl FromStr for Anchor {
  type Err = AnchorParseError;

  fn from_str(s: &str) -> Result<Self, Self::Err> {
    let invalid = || AnchorParseError(s.to_string());
    let (y, x) = s.split_once(',').ok_or_else(invalid)?;
    let y = y.trim().parse().map_err(|_| invalid())?;
    let x = x.trim().parse().map_err(|_| invalid())?;
    Ok(Anchor { y, x })
  }
}

/// 物体在背景上占据的矩形区域
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Region {
  pub top: i64,
  pub left: i64,
  pub width: u32,
  pub height: u32,
}

impl Region {
  pub fn bottom(&self) -> i64 {
    self.top.saturating_add(self.height as i64)
  }

  pub fn right(&self) -> i64 {
    self.left.saturating_add(self.width as i64)
  }

  pub fn fits_within(&self, width: u32, height: u32) -> bool {
    self.top >= 0 && self.left >= 0 && self.bottom() <= height as i64 && self.right() <= width as i64
  }

  pub fn contains(&self, x: i64, y: i64) -> bool {
    (self.left..self.right()).contains(&x) && (self.top..self.bottom()).contains(&y)
  }
}

impl fmt::Display for Region {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(
      f,
      "[{}:{}, {}:{}]",
      self.top,
      self.bottom(),
      self.left,
      self.right()
    )
  }
}

/// 底部中心对齐锚点；宽度为奇数时左边界向下取整。
/// 坐标饱和计算，极端锚点得到的区域必然越界
pub fn destination_region(anchor: Anchor, width: u32, height: u32) -> Region {
  Region {
    top: anchor.y.saturating_sub(height as i64),
    left: anchor.x.saturating_sub((width / 2) as i64),
    width,
    height,
  }
}

#[derive(Error, Debug)]
pub enum PlacementError {
  #[error("几何无法放置: {0}")]
  UnplaceableGeometry(#[from] GeometryError),
  #[error("物体区域 {region} 超出背景边界 {bg_width}x{bg_height}")]
  OutOfBoundsPlacement {
    region: Region,
    bg_width: u32,
    bg_height: u32,
  },
  #[error("相机参数无效: {0}")]
  InvalidCamera(#[from] CameraError),
  #[error("物体图层无效: {0}")]
  InvalidObject(#[from] LayerError),
  #[error("背景图像为空")]
  EmptyBackground,
  #[error("物体高度必须为正的有限值, 实际为 {0}")]
  InvalidObjectHeight(f64),
}

impl PlacementError {
  /// 输入本身不合法（而非几何或边界导致的失败）
  pub fn is_malformed_input(&self) -> bool {
    matches!(
      self,
      PlacementError::InvalidCamera(_)
        | PlacementError::InvalidObject(_)
        | PlacementError::EmptyBackground
        | PlacementError::InvalidObjectHeight(_)
    )
  }
}

/// 合成结果
#[derive(Debug, Clone)]
pub struct Composite {
  pub image: RgbImage,
  pub anchor: Anchor,
  pub region: Region,
  /// 地平线所在行，供标注使用
  pub horizon_row: f64,
}

/// 将物体按真实高度缩放后合成到背景中，返回新的图像，背景本身不被修改。
///
/// 颜色使用三次插值缩放，透明度使用线性插值缩放。
///
/// 边界检查在确定缩放尺寸之后、实际重采样之前进行（区域只取决于尺寸），
/// 因此越界失败时不会为物体分配缩放缓冲区，也不会写入任何像素。
pub fn place_object(
  background: &RgbImage,
  object_color: &RgbImage,
  object_alpha: &AlphaMask,
  anchor: Anchor,
  object_height_m: f64,
  camera: &CameraParams,
) -> Result<Composite, PlacementError> {
  camera.validate()?;
  check_aligned(object_color, object_alpha)?;

  let (bg_width, bg_height) = background.dimensions();
  if bg_width == 0 || bg_height == 0 {
    return Err(PlacementError::EmptyBackground);
  }
  if !object_height_m.is_finite() || object_height_m <= 0.0 {
    return Err(PlacementError::InvalidObjectHeight(object_height_m));
  }

  let target_h = project_height(camera, bg_height, anchor.y, object_height_m)?;
  let (orig_w, orig_h) = object_color.dimensions();
  let target_w = (target_h as f64 * orig_w as f64 / orig_h as f64).round() as u32;
  if target_w == 0 {
    return Err(
      GeometryError::Unplaceable {
        y_px: anchor.y,
        height_px: target_h as i64,
      }
      .into(),
    );
  }

  let region = destination_region(anchor, target_w, target_h);
  debug!("锚点 {} 处物体尺寸 {}x{}, 区域 {}", anchor, target_w, target_h, region);

  // 只依赖缩放后的尺寸，先于缩放检查以避免为越界物体分配缓冲区
  if !region.fits_within(bg_width, bg_height) {
    return Err(PlacementError::OutOfBoundsPlacement {
      region,
      bg_width,
      bg_height,
    });
  }

  let color = imageops::resize(object_color, target_w, target_h, FilterType::CatmullRom);
  let alpha = imageops::resize(object_alpha, target_w, target_h, FilterType::Triangle);

  let mut image = background.clone();
  let (left, top) = (region.left as u32, region.top as u32);
  for (dx, dy, fg) in color.enumerate_pixels() {
    let a = alpha.get_pixel(dx, dy)[0].clamp(0.0, 1.0);
    let bg = image.get_pixel_mut(left + dx, top + dy);
    *bg = blend_pixel(bg, fg, a);
  }

  Ok(Composite {
    image,
    anchor,
    region,
    horizon_row: horizon_row(camera, bg_height),
  })
}

fn blend_pixel(bg: &Rgb<u8>, fg: &Rgb<u8>, alpha: f32) -> Rgb<u8> {
  let inv = 1.0 - alpha;
  let mix = |f: u8, b: u8| (f as f32 * alpha + b as f32 * inv).round().clamp(0.0, 255.0) as u8;
  Rgb([mix(fg[0], bg[0]), mix(fg[1], bg[1]), mix(fg[2], bg[2])])
}

/// 对单个锚点执行放置的统一接口，任务驱动基于该接口泛化
pub trait Placer {
  type Error;

  fn place(&self, anchor: Anchor) -> Result<Composite, Self::Error>;
}

/// 固定背景、物体与相机，对多个锚点逐一放置
pub struct Compositor<'a> {
  camera: CameraParams,
  background: &'a RgbImage,
  object: &'a ObjectLayer,
  object_height_m: f64,
}

impl<'a> Compositor<'a> {
  pub fn new(
    camera: CameraParams,
    background: &'a RgbImage,
    object: &'a ObjectLayer,
    object_height_m: f64,
  ) -> Self {
    Self {
      camera,
      background,
      object,
      object_height_m,
    }
  }

  pub fn camera(&self) -> &CameraParams {
    &self.camera
  }
}

impl Placer for Compositor<'_> {
  type Error = PlacementError;

  fn place(&self, anchor: Anchor) -> Result<Composite, Self::Error> {
    place_object(
      self.background,
      self.object.color(),
      self.object.alpha(),
      anchor,
      self.object_height_m,
      &self.camera,
    )
  }
}

#[cfg(test)]
mod tests {
  use image::Luma;

  use super::*;

  // 640x480 背景下 y=400 距地平线 8mm，0.4m 物体高 40px
  const BG_W: u32 = 640;
  const BG_H: u32 = 480;

  fn camera() -> CameraParams {
    CameraParams::new(15.0, 36.0, 24.0, 1600.0)
  }

  fn background(width: u32, height: u32) -> RgbImage {
    RgbImage::from_fn(width, height, |x, y| {
      Rgb([(x % 256) as u8, (y % 256) as u8, ((x + y) % 256) as u8])
    })
  }

  fn object(width: u32, height: u32, alpha: f32) -> (RgbImage, AlphaMask) {
    let color = RgbImage::from_fn(width, height, |x, y| {
      Rgb([200, (x * 255 / width) as u8, (y * 255 / height) as u8])
    });
    let mask = AlphaMask::from_pixel(width, height, Luma([alpha]));
    (color, mask)
  }

  #[test]
  fn anchor_parses_y_then_x() {
    assert_eq!("1300,1300".parse(), Ok(Anchor::new(1300, 1300)));
    assert_eq!(" 1800 , 2000 ".parse(), Ok(Anchor::new(1800, 2000)));
    assert_eq!("-5,10".parse(), Ok(Anchor::new(-5, 10)));
    assert!("1300".parse::<Anchor>().is_err());
    assert!("a,b".parse::<Anchor>().is_err());
    assert!("1,2,3".parse::<Anchor>().is_err());
  }

  #[test]
  fn region_floors_half_width() {
    let region = destination_region(Anchor::new(100, 10), 5, 20);
    assert_eq!(region.top, 80);
    assert_eq!(region.bottom(), 100);
    assert_eq!(region.left, 8);
    assert_eq!(region.right(), 13);
    assert!(region.contains(8, 80));
    assert!(!region.contains(13, 80));
    assert!(!region.contains(8, 100));
  }

  #[test]
  fn region_fits_within_edges() {
    let region = destination_region(Anchor::new(480, 20), 40, 40);
    assert!(region.fits_within(640, 480));
    assert!(!region.fits_within(640, 479));
    assert!(!destination_region(Anchor::new(480, 19), 40, 40).fits_within(640, 480));
    assert!(!destination_region(Anchor::new(39, 100), 40, 40).fits_within(640, 480));
  }

  #[test]
  fn places_object_inside_region_only() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(20, 40, 0.5);
    let anchor = Anchor::new(400, 320);

    let composite = place_object(&bg, &color, &alpha, anchor, 0.4, &camera()).unwrap();
    let region = composite.region;
    assert_eq!((region.width, region.height), (20, 40));
    assert_eq!((region.top, region.left), (360, 310));

    for (x, y, pixel) in composite.image.enumerate_pixels() {
      if !region.contains(x as i64, y as i64) {
        assert_eq!(pixel, bg.get_pixel(x, y), "({x}, {y})");
      }
    }
    // 同尺寸缩放保持原图，半透明时取平均
    let expected = blend_pixel(bg.get_pixel(310, 360), color.get_pixel(0, 0), 0.5);
    assert_eq!(composite.image.get_pixel(310, 360), &expected);
  }

  #[test]
  fn background_is_not_mutated() {
    let bg = background(BG_W, BG_H);
    let before = bg.clone();
    let (color, alpha) = object(10, 30, 1.0);

    place_object(&bg, &color, &alpha, Anchor::new(400, 320), 0.4, &camera()).unwrap();
    assert_eq!(bg, before);

    let result = place_object(&bg, &color, &alpha, Anchor::new(400, 2), 0.4, &camera());
    assert!(result.is_err());
    assert_eq!(bg, before);
  }

  #[test]
  fn transparent_object_leaves_background() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(30, 60, 0.0);
    let composite = place_object(&bg, &color, &alpha, Anchor::new(450, 300), 0.4, &camera()).unwrap();
    assert_eq!(composite.image, bg);
  }

  #[test]
  fn opaque_object_replaces_region() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(30, 60, 1.0);
    let composite = place_object(&bg, &color, &alpha, Anchor::new(450, 300), 0.4, &camera()).unwrap();

    let region = composite.region;
    let resized = imageops::resize(&color, region.width, region.height, FilterType::CatmullRom);
    for (dx, dy, pixel) in resized.enumerate_pixels() {
      let x = region.left as u32 + dx;
      let y = region.top as u32 + dy;
      assert_eq!(composite.image.get_pixel(x, y), pixel, "({x}, {y})");
    }
  }

  #[test]
  fn width_follows_aspect_ratio() {
    let bg = background(BG_W, BG_H);
    for (w, h) in [(3, 7), (200, 400), (64, 48), (5, 5)] {
      let (color, alpha) = object(w, h, 1.0);
      for y in [300, 360, 420, 470] {
        let composite = place_object(&bg, &color, &alpha, Anchor::new(y, 320), 0.4, &camera()).unwrap();
        let region = composite.region;
        let expected = region.height as f64 * w as f64 / h as f64;
        assert!(
          (region.width as f64 - expected).abs() <= 0.5,
          "{w}x{h} at y={y}: {} vs {expected}",
          region.width
        );
      }
    }
  }

  #[test]
  fn left_edge_overflow_is_rejected() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(40, 40, 1.0);
    let result = place_object(&bg, &color, &alpha, Anchor::new(400, 5), 0.4, &camera());
    match result {
      Err(PlacementError::OutOfBoundsPlacement { region, .. }) => assert!(region.left < 0),
      other => panic!("unexpected result: {other:?}"),
    }
  }

  #[test]
  fn extreme_anchor_columns_are_out_of_bounds() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(20, 40, 1.0);
    for x in [i64::MAX, i64::MIN, 1_000_000] {
      let anchor: Anchor = format!("400,{x}").parse().unwrap();
      let result = place_object(&bg, &color, &alpha, anchor, 0.4, &camera());
      assert!(
        matches!(result, Err(PlacementError::OutOfBoundsPlacement { .. })),
        "x = {x}: {result:?}"
      );
    }
  }

  #[test]
  fn extreme_anchor_rows_fail_without_panic() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(20, 40, 1.0);

    // 极远处的地面深度退化为 0，或区域越过底边，两者都是类型化的失败
    let result = place_object(&bg, &color, &alpha, Anchor::new(i64::MAX, 320), 0.4, &camera());
    assert!(matches!(
      result,
      Err(PlacementError::OutOfBoundsPlacement { .. } | PlacementError::UnplaceableGeometry(_))
    ));

    let result = place_object(&bg, &color, &alpha, Anchor::new(i64::MIN, 320), 0.4, &camera());
    assert!(matches!(
      result,
      Err(PlacementError::UnplaceableGeometry(_))
    ));
  }

  #[test]
  fn region_saturates_instead_of_wrapping() {
    let region = destination_region(Anchor::new(i64::MIN, i64::MAX), 41, 40);
    assert_eq!(region.top, i64::MIN);
    assert_eq!(region.right(), i64::MAX);
    assert!(!region.fits_within(BG_W, BG_H));
  }

  #[test]
  fn bottom_overflow_is_rejected() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(10, 10, 1.0);
    let result = place_object(&bg, &color, &alpha, Anchor::new(481, 320), 0.4, &camera());
    assert!(matches!(
      result,
      Err(PlacementError::OutOfBoundsPlacement { .. })
    ));
  }

  #[test]
  fn top_row_anchor_is_unplaceable() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(10, 20, 1.0);
    for x in [0, 100, 639] {
      let result = place_object(&bg, &color, &alpha, Anchor::new(0, x), 0.4, &camera());
      assert!(matches!(
        result,
        Err(PlacementError::UnplaceableGeometry(_))
      ));
    }
  }

  #[test]
  fn collapsed_width_is_unplaceable() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(1, 200, 1.0);
    // 高 2px 的物体宽度舍入为 0
    let result = place_object(&bg, &color, &alpha, Anchor::new(248, 320), 0.4, &camera());
    assert!(matches!(
      result,
      Err(PlacementError::UnplaceableGeometry(_))
    ));
  }

  #[test]
  fn malformed_inputs_are_reported() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(10, 20, 1.0);
    let anchor = Anchor::new(400, 320);

    let bad_camera = CameraParams {
      focal_length_mm: 0.0,
      ..camera()
    };
    let err = place_object(&bg, &color, &alpha, anchor, 0.4, &bad_camera).unwrap_err();
    assert!(matches!(err, PlacementError::InvalidCamera(_)));
    assert!(err.is_malformed_input());

    let err = place_object(&bg, &color, &AlphaMask::new(10, 19), anchor, 0.4, &camera()).unwrap_err();
    assert!(matches!(err, PlacementError::InvalidObject(_)));

    let err = place_object(&RgbImage::new(0, 0), &color, &alpha, anchor, 0.4, &camera()).unwrap_err();
    assert!(matches!(err, PlacementError::EmptyBackground));

    for height in [0.0, -1.0, f64::NAN] {
      let err = place_object(&bg, &color, &alpha, anchor, height, &camera()).unwrap_err();
      assert!(matches!(err, PlacementError::InvalidObjectHeight(_)));
    }

    let err = place_object(&bg, &color, &alpha, Anchor::new(0, 0), 0.4, &camera()).unwrap_err();
    assert!(!err.is_malformed_input());
  }

  #[test]
  fn compositor_places_through_trait() {
    let bg = background(BG_W, BG_H);
    let (color, alpha) = object(20, 40, 1.0);
    let layer = ObjectLayer::new(color, alpha).unwrap();
    let compositor = Compositor::new(camera(), &bg, &layer, 0.4);

    let composite = compositor.place(Anchor::new(400, 320)).unwrap();
    assert_eq!(composite.anchor, Anchor::new(400, 320));
    assert_eq!(composite.region.height, 40);
    assert_eq!(composite.horizon_row, 240.0);
    assert!(compositor.place(Anchor::new(100, 320)).is_err());
  }
}
