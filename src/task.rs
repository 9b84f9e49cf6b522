// 该文件是 Owlet （枭目） 项目的一部分。
// src/task.rs - 推理任务
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

use tracing::{debug, info};

use crate::{
  frame::Frame,
  model::{DetectResult, Detector, Query},
  output::Render,
  postprocess::PostProcessor,
};

pub trait Task<I, M, O>: Sized {
  type Output;
  type Error;
  fn run_task(self, input: I, model: M, output: O) -> Result<Self::Output, Self::Error>;
}

/// 取一帧，推理、后处理、渲染各一次
pub struct OneShotTask {
  query: Query,
  post_processor: PostProcessor,
}

impl OneShotTask {
  pub fn new(query: Query) -> Self {
    Self {
      query,
      post_processor: PostProcessor::default(),
    }
  }

  pub fn with_post_processor(mut self, post_processor: PostProcessor) -> Self {
    self.post_processor = post_processor;
    self
  }
}

impl<
  ME: std::error::Error + Sync + Send + 'static,
  RE: std::error::Error + Sync + Send + 'static,
  I: Iterator<Item = Frame>,
  M: Detector<Error = ME>,
  O: Render<Frame, DetectResult, Error = RE>,
> Task<I, M, O> for OneShotTask
{
  type Output = DetectResult;
  type Error = anyhow::Error;

  fn run_task(self, mut input: I, model: M, output: O) -> Result<Self::Output, Self::Error> {
    info!("开始任务...");
    let frame = input.next().ok_or_else(|| anyhow::anyhow!("没有输入帧"))?;
    info!(
      "输入帧获取成功: {} ({}x{})，开始推理...",
      frame.source(),
      frame.width(),
      frame.height()
    );

    let now = std::time::Instant::now();
    let detections = model.detect(frame.image(), &self.query)?;
    info!(
      "推理完成，耗时: {:.2?}，原始检测 {} 个",
      now.elapsed(),
      detections.len()
    );

    let items = self
      .post_processor
      .filter(&detections, frame.target_size());
    let result = DetectResult::new(items, self.query.text_queries());
    for item in result.items.iter() {
      debug!(
        "  - {}: {:.2}% at [{:.0}, {:.0}, {:.0}, {:.0}]",
        result.label_str(item),
        item.score * 100.0,
        item.bbox[0],
        item.bbox[1],
        item.bbox[2],
        item.bbox[3]
      );
    }
    info!("后处理完成，保留 {} 个检测", result.len());

    let now = std::time::Instant::now();
    output.render_result(&frame, &result)?;
    info!("渲染完成，耗时: {:.2?}", now.elapsed());

    Ok(result)
  }
}
