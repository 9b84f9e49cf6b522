// 该文件是 Owlet （枭目） 项目的一部分。
// src/bin/image_oneshot.rs - 图像查询的单次推理
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

use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use url::Url;

use owlet::{
  FromUrl,
  input::InputWrapper,
  model::{Query, ReplayDetector},
  output::OutputWrapper,
  postprocess::{PostProcessor, parse_threshold},
  task::{OneShotTask, Task},
};
use tracing::info;

/// 以参考图像检测目标图像
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 检测器，例如 replay:///path/detections.json
  #[arg(long, value_name = "MODEL")]
  pub model: Url,
  /// 目标图像，image:///path 或 http(s)://
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,
  /// 参考图像
  #[arg(long, value_name = "SOURCE")]
  pub query_image: Url,
  /// 输出路径
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,
  /// 置信度阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.6", value_name = "THRESHOLD", value_parser = parse_threshold)]
  pub score_threshold: f32,
  /// NMS IOU 阈值 (0.0 - 1.0)
  #[arg(long, default_value = "0.3", value_name = "THRESHOLD", value_parser = parse_threshold)]
  pub nms_threshold: f32,
  /// 网络下载超时（秒）
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout_secs: u64,
}

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = Args::parse();

  info!("模型: {}", args.model);
  info!("输入来源: {}", args.input);
  info!("参考图像: {}", args.query_image);
  info!("输出路径: {}", args.output);
  info!(
    "置信度阈值: {}, NMS 阈值: {}",
    args.score_threshold, args.nms_threshold
  );

  let timeout = Duration::from_secs(args.timeout_secs);
  let input = InputWrapper::from_url_with_timeout(&args.input, timeout)?;
  let reference = InputWrapper::from_url_with_timeout(&args.query_image, timeout)?
    .into_frame()
    .context("参考图像为空")?;
  let model = ReplayDetector::from_url(&args.model)?;
  let output = OutputWrapper::from_url(&args.output)?;
  let post_processor = PostProcessor::new(args.score_threshold, args.nms_threshold)?;

  let result = OneShotTask::new(Query::Image(reference))
    .with_post_processor(post_processor)
    .run_task(input, model, output)?;
  info!("检测到 {} 个匹配", result.len());

  Ok(())
}
