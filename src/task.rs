// 该文件是 Dimian （地面） 项目的一部分。
// src/task.rs - 放置任务驱动
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

use std::sync::mpsc::Receiver;
use std::time::Instant;

use tracing::{info, warn};

use crate::{
  compose::{Anchor, Placer},
  output::Render,
};

pub trait Task<I, P, O>: Sized {
  type Error;
  fn run_task(self, anchors: I, placer: P, output: O) -> Result<TaskSummary, Self::Error>;
}

#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct TaskSummary {
  pub rendered: usize,
  pub skipped: usize,
}

/// 只放置第一个锚点，任何失败都作为错误返回
pub struct OneShotTask;

impl<
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Anchor>,
  P: Placer<Error = PE>,
  O: Render<Error = RE>,
> Task<I, P, O> for OneShotTask
{
  type Error = anyhow::Error;

  fn run_task(self, mut anchors: I, placer: P, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let anchor = anchors.next().ok_or_else(|| anyhow::anyhow!("没有锚点"))?;
    let now = Instant::now();
    let composite = placer.place(anchor)?;
    info!("锚点 {} 放置完成，耗时: {:.2?}", anchor, now.elapsed());
    output.render_result(0, &composite)?;

    Ok(TaskSummary {
      rendered: 1,
      skipped: 0,
    })
  }
}

/// 依次放置所有锚点；单个锚点放置失败时记录并跳过，输出失败则中止
#[derive(Default, Debug)]
pub struct BatchTask {
  stop_signal: Option<Receiver<()>>,
}

impl BatchTask {
  pub fn with_stop_signal(mut self, stop_signal: Receiver<()>) -> Self {
    self.stop_signal = Some(stop_signal);
    self
  }

  fn should_stop(&self) -> bool {
    self
      .stop_signal
      .as_ref()
      .map(|rx| rx.try_recv().is_ok())
      .unwrap_or(false)
  }
}

impl<
  PE: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Anchor>,
  P: Placer<Error = PE>,
  O: Render<Error = RE>,
> Task<I, P, O> for BatchTask
{
  type Error = anyhow::Error;

  fn run_task(self, anchors: I, placer: P, output: O) -> Result<TaskSummary, Self::Error> {
    info!("开始任务...");
    let mut summary = TaskSummary::default();

    for (index, anchor) in anchors.enumerate() {
      if self.should_stop() {
        warn!("中断信号接收，退出任务循环");
        break;
      }

      let now = Instant::now();
      match placer.place(anchor) {
        Ok(composite) => {
          info!(
            "({}) 锚点 {} 放置完成，区域 {}，耗时: {:.2?}",
            index,
            anchor,
            composite.region,
            now.elapsed()
          );
          output.render_result(index, &composite)?;
          summary.rendered += 1;
        }
        Err(e) => {
          warn!("({}) 跳过锚点 {}: {}", index, anchor, e);
          summary.skipped += 1;
        }
      }
    }

    info!(
      "任务完成: 输出 {} 张, 跳过 {} 个锚点",
      summary.rendered, summary.skipped
    );
    Ok(summary)
  }
}
