// 该文件是 Owlet （枭目） 项目的一部分。
// src/model.rs - 检测模型接口
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

use image::RgbImage;
use serde::{Deserialize, Serialize};

use crate::frame::Frame;

/// 开放词汇检测器
///
/// 模型本体（骨干网络、文本编码、检测头）不在本库中实现，
/// 实现者只需把模型输出转换为 [`RawDetection`]。
pub trait Detector {
  type Error;

  /// 以文本查询检测，`label` 为 `queries` 中的下标
  fn detect_by_text(
    &self,
    image: &RgbImage,
    queries: &[String],
  ) -> Result<Vec<RawDetection>, Self::Error>;

  /// 以参考图像检测，分数表示与参考图像的视觉相似度
  fn detect_by_image(
    &self,
    target: &RgbImage,
    query: &RgbImage,
  ) -> Result<Vec<RawDetection>, Self::Error>;

  fn detect(&self, image: &RgbImage, query: &Query) -> Result<Vec<RawDetection>, Self::Error> {
    match query {
      Query::Text(queries) => self.detect_by_text(image, queries),
      Query::Image(reference) => self.detect_by_image(image, reference.image()),
    }
  }
}

/// 每次推理只使用一种查询方式
#[derive(Debug, Clone)]
pub enum Query {
  Text(Vec<String>),
  Image(Frame),
}

impl Query {
  /// 文本查询列表，图像查询时为空
  pub fn text_queries(&self) -> &[String] {
    match self {
      Query::Text(queries) => queries,
      Query::Image(_) => &[],
    }
  }
}

/// 模型原始输出
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RawDetection {
  pub bbox: [f32; 4], // 归一化中心坐标 [cx, cy, w, h]
  pub score: f32,
  #[serde(default)]
  pub label: Option<usize>,
}

/// 后处理之后的检测结果
#[derive(Debug, Clone, PartialEq)]
pub struct DetectItem {
  pub label: Option<usize>,
  pub score: f32,
  pub bbox: [f32; 4], // 像素坐标 [x_min, y_min, x_max, y_max]
}

impl DetectItem {
  pub fn new(bbox: [f32; 4], score: f32) -> Self {
    Self {
      label: None,
      score,
      bbox,
    }
  }

  pub fn with_label(mut self, label: Option<usize>) -> Self {
    self.label = label;
    self
  }
}

#[derive(Debug, Clone, Default)]
pub struct DetectResult {
  pub items: Box<[DetectItem]>,
  pub queries: Box<[String]>,
}

impl DetectResult {
  pub fn new(items: Vec<DetectItem>, queries: &[String]) -> Self {
    Self {
      items: items.into_boxed_slice(),
      queries: queries.into(),
    }
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn len(&self) -> usize {
    self.items.len()
  }

  /// 标签名；图像查询或标签越界时为 "match"
  pub fn label_str(&self, item: &DetectItem) -> &str {
    item
      .label
      .and_then(|id| self.queries.get(id))
      .map(String::as_str)
      .unwrap_or("match")
  }
}

mod replay;
pub use self::replay::{ReplayDetector, ReplayDetectorError};

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn label_str_falls_back_to_match() {
    let queries = vec!["a photo of a cat".to_string()];
    let result = DetectResult::new(
      vec![
        DetectItem::new([0.0, 0.0, 1.0, 1.0], 0.9).with_label(Some(0)),
        DetectItem::new([0.0, 0.0, 1.0, 1.0], 0.8),
        DetectItem::new([0.0, 0.0, 1.0, 1.0], 0.7).with_label(Some(3)),
      ],
      &queries,
    );
    assert_eq!(result.label_str(&result.items[0]), "a photo of a cat");
    assert_eq!(result.label_str(&result.items[1]), "match");
    assert_eq!(result.label_str(&result.items[2]), "match");
  }

  #[test]
  fn raw_detection_label_defaults_to_none() {
    let det: RawDetection =
      serde_json::from_str(r#"{"bbox": [0.5, 0.5, 0.2, 0.2], "score": 0.4}"#).unwrap();
    assert_eq!(det.label, None);
  }
}
