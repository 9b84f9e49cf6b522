// 该文件是 Owlet （枭目） 项目的一部分。
// src/postprocess.rs - 检测结果后处理
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

use thiserror::Error;
use tracing::debug;

use crate::model::{DetectItem, RawDetection};

pub const DEFAULT_SCORE_THRESHOLD: f32 = 0.6;
pub const DEFAULT_NMS_THRESHOLD: f32 = 0.3;

#[derive(Error, Debug, PartialEq)]
pub enum PostProcessError {
  #[error("{name} 必须在 [0, 1] 范围内, 实际为 {value}")]
  InvalidThreshold { name: &'static str, value: f32 },
}

/// 将模型输出缩放到像素坐标，按分数过滤并做非极大值抑制
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PostProcessor {
  score_threshold: f32,
  nms_threshold: f32,
}

impl Default for PostProcessor {
  fn default() -> Self {
    Self {
      score_threshold: DEFAULT_SCORE_THRESHOLD,
      nms_threshold: DEFAULT_NMS_THRESHOLD,
    }
  }
}

fn check_threshold(name: &'static str, value: f32) -> Result<f32, PostProcessError> {
  if (0.0..=1.0).contains(&value) {
    Ok(value)
  } else {
    Err(PostProcessError::InvalidThreshold { name, value })
  }
}

/// 命令行阈值解析，用于 clap 的 `value_parser`
pub fn parse_threshold(s: &str) -> Result<f32, String> {
  let value: f32 = s.parse().map_err(|e| format!("{}", e))?;
  check_threshold("threshold", value).map_err(|e| e.to_string())
}

impl PostProcessor {
  pub fn new(score_threshold: f32, nms_threshold: f32) -> Result<Self, PostProcessError> {
    Ok(Self {
      score_threshold: check_threshold("score_threshold", score_threshold)?,
      nms_threshold: check_threshold("nms_threshold", nms_threshold)?,
    })
  }

  pub fn score_threshold(&self) -> f32 {
    self.score_threshold
  }

  pub fn nms_threshold(&self) -> f32 {
    self.nms_threshold
  }

  /// `target_size` 为 (height, width)。保留的检测保持输入顺序。
  pub fn filter(&self, detections: &[RawDetection], target_size: (u32, u32)) -> Vec<DetectItem> {
    let mut items: Vec<DetectItem> = detections
      .iter()
      .filter(|det| det.score >= self.score_threshold)
      .map(|det| {
        DetectItem::new(to_pixel_corners(&det.bbox, target_size), det.score).with_label(det.label)
      })
      .collect();
    debug!(
      "分数过滤: {} -> {} (阈值 {})",
      detections.len(),
      items.len(),
      self.score_threshold
    );

    // 阈值为 1 时等同于关闭抑制
    if self.nms_threshold < 1.0 {
      let keep = non_maximum_suppression(&items, self.nms_threshold);
      let mut keep_iter = keep.iter();
      items.retain(|_| keep_iter.next().copied().unwrap_or(false));
      debug!("NMS 之后剩余 {} 个检测", items.len());
    }

    items
  }
}

/// 归一化中心坐标 [cx, cy, w, h] 转为像素角点坐标，并裁剪到图像范围内
pub fn to_pixel_corners(bbox: &[f32; 4], (height, width): (u32, u32)) -> [f32; 4] {
  let [cx, cy, w, h] = *bbox;
  let max_x = width.saturating_sub(1) as f32;
  let max_y = height.saturating_sub(1) as f32;

  let x0 = ((cx - w / 2.0) * width as f32).clamp(0.0, max_x);
  let y0 = ((cy - h / 2.0) * height as f32).clamp(0.0, max_y);
  let x1 = ((cx + w / 2.0) * width as f32).clamp(0.0, max_x);
  let y1 = ((cy + h / 2.0) * height as f32).clamp(0.0, max_y);

  [x0.min(x1), y0.min(y1), x0.max(x1), y0.max(y1)]
}

/// 两个 [x_min, y_min, x_max, y_max] 框的交并比
pub fn intersection_over_union(a: &[f32; 4], b: &[f32; 4]) -> f32 {
  let x1 = a[0].max(b[0]);
  let y1 = a[1].max(b[1]);
  let x2 = a[2].min(b[2]);
  let y2 = a[3].min(b[3]);

  let inter_area = (x2 - x1).max(0.0) * (y2 - y1).max(0.0);
  let area_a = (a[2] - a[0]).max(0.0) * (a[3] - a[1]).max(0.0);
  let area_b = (b[2] - b[0]).max(0.0) * (b[3] - b[1]).max(0.0);
  let union_area = area_a + area_b - inter_area;

  if union_area > 0.0 {
    inter_area / union_area
  } else {
    0.0
  }
}

/// 贪心非极大值抑制，返回与输入等长的保留掩码
///
/// 按分数从高到低访问，分数相同时先出现的优先。只在标签相同的检测之间抑制，
/// 图像查询的检测都没有标签，因此彼此之间都会比较。
pub fn non_maximum_suppression(items: &[DetectItem], iou_threshold: f32) -> Vec<bool> {
  let mut order: Vec<usize> = (0..items.len()).collect();
  order.sort_by(|&a, &b| items[b].score.total_cmp(&items[a].score));

  let mut keep = vec![true; items.len()];
  for (rank, &current) in order.iter().enumerate() {
    if !keep[current] {
      continue;
    }
    for &other in &order[rank + 1..] {
      if !keep[other] || items[current].label != items[other].label {
        continue;
      }
      if intersection_over_union(&items[current].bbox, &items[other].bbox) > iou_threshold {
        keep[other] = false;
      }
    }
  }
  keep
}
