// 该文件是 Owlet （枭目） 项目的一部分。
// src/model/replay.rs - 回放预先导出的检测结果
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
use serde::Deserialize;
use thiserror::Error;
use tracing::{debug, error, info};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  model::{Detector, RawDetection},
};

#[derive(Error, Debug)]
pub enum ReplayDetectorError {
  #[error("模型路径错误: {0}")]
  ModelPathError(String),
  #[error("读取检测记录失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("检测记录格式错误: {0}")]
  JsonError(#[from] serde_json::Error),
  #[error("文本查询为空")]
  EmptyQuery,
  #[error("第 {index} 个检测缺少文本标签")]
  MissingLabel { index: usize },
  #[error("第 {index} 个检测的标签 {label} 超出查询数量 {queries}")]
  LabelOutOfRange {
    index: usize,
    label: usize,
    queries: usize,
  },
  #[error("第 {index} 个检测包含非有限数值")]
  NonFinite { index: usize },
}

#[derive(Debug, Default, Deserialize)]
struct Recording {
  #[serde(default)]
  text: Vec<RawDetection>,
  #[serde(default)]
  image: Vec<RawDetection>,
}

/// 从 JSON 文件回放预训练模型导出的检测结果，`replay:///path/to/detections.json`
///
/// 文件格式:
/// ```json
/// {
///   "text":  [{"bbox": [cx, cy, w, h], "score": 0.9, "label": 0}],
///   "image": [{"bbox": [cx, cy, w, h], "score": 0.7}]
/// }
/// ```
#[derive(Debug)]
pub struct ReplayDetector {
  recording: Recording,
}

impl FromUrlWithScheme for ReplayDetector {
  const SCHEME: &'static str = "replay";
}

impl FromUrl for ReplayDetector {
  type Error = ReplayDetectorError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      return Err(ReplayDetectorError::ModelPathError(format!(
        "模型路径必须使用 {} 方案",
        Self::SCHEME
      )));
    }

    info!("加载检测记录: {}", url.path());
    let data = std::fs::read(url.path())?;
    Self::from_json(&data)
  }
}

impl ReplayDetector {
  pub fn from_json(data: &[u8]) -> Result<Self, ReplayDetectorError> {
    let recording: Recording = serde_json::from_slice(data)?;
    debug!(
      "检测记录: 文本查询 {} 条, 图像查询 {} 条",
      recording.text.len(),
      recording.image.len()
    );
    Ok(Self { recording })
  }
}

fn check_finite(detections: &[RawDetection]) -> Result<(), ReplayDetectorError> {
  for (index, det) in detections.iter().enumerate() {
    if !det.score.is_finite() || det.bbox.iter().any(|v| !v.is_finite()) {
      error!("第 {} 个检测包含非有限数值: {:?}", index, det);
      return Err(ReplayDetectorError::NonFinite { index });
    }
  }
  Ok(())
}

impl Detector for ReplayDetector {
  type Error = ReplayDetectorError;

  fn detect_by_text(
    &self,
    image: &RgbImage,
    queries: &[String],
  ) -> Result<Vec<RawDetection>, Self::Error> {
    if queries.is_empty() {
      return Err(ReplayDetectorError::EmptyQuery);
    }
    debug!(
      "文本查询 {:?}, 目标图像 {}x{}",
      queries,
      image.width(),
      image.height()
    );

    let detections = &self.recording.text;
    check_finite(detections)?;
    for (index, det) in detections.iter().enumerate() {
      match det.label {
        None => return Err(ReplayDetectorError::MissingLabel { index }),
        Some(label) if label >= queries.len() => {
          return Err(ReplayDetectorError::LabelOutOfRange {
            index,
            label,
            queries: queries.len(),
          });
        }
        Some(_) => {}
      }
    }

    Ok(detections.clone())
  }

  fn detect_by_image(
    &self,
    target: &RgbImage,
    query: &RgbImage,
  ) -> Result<Vec<RawDetection>, Self::Error> {
    debug!(
      "图像查询 {}x{}, 目标图像 {}x{}",
      query.width(),
      query.height(),
      target.width(),
      target.height()
    );

    let detections = &self.recording.image;
    check_finite(detections)?;

    // 图像查询没有类别
    Ok(
      detections
        .iter()
        .map(|det| RawDetection {
          label: None,
          ..det.clone()
        })
        .collect(),
    )
  }
}
