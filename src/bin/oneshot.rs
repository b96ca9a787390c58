// 该文件是 Dimian （地面） 项目的一部分。
// src/bin/oneshot.rs - 单次放置程序
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

use anyhow::Result;
use clap::Parser;
use tracing::info;

use dimian::{
  FromUrl,
  args::Args,
  compose::Compositor,
  input::ImageFileInput,
  output::OutputWrapper,
  task::{OneShotTask, Task},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("背景图像: {}", args.background);
  info!("物体图像: {}", args.object);
  info!("输出路径: {}", args.output);

  let camera = args.camera.to_camera()?;
  let background = ImageFileInput::from_url(&args.background)?.into_background();
  let object = ImageFileInput::from_url(&args.object)?.into_object_layer()?;
  let output = OutputWrapper::from_url(&args.output)?;

  let compositor = Compositor::new(camera, &background, &object, args.height);
  OneShotTask.run_task(args.positions.into_iter(), compositor, output)?;

  Ok(())
}
