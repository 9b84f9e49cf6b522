// 该文件是 Owlet （枭目） 项目的一部分。
// src/output/draw.rs - 检测结果可视化
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

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage};
use imageproc::drawing::{draw_hollow_rect_mut, draw_text_mut};
use imageproc::rect::Rect;
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
  frame::Frame,
  model::{DetectItem, DetectResult},
};

const BOX_COLOR: [u8; 3] = [255, 0, 0]; // 红色
const BOX_STROKE_WIDTH: i32 = 5;
const CAPTION_FONT_SIZE: f32 = 20.0;
// 标签基线默认在框底边下方；放不下时移到底边上方
const CAPTION_OFFSET_BELOW: i32 = 25;
const CAPTION_OFFSET_ABOVE: i32 = 10;

const BUILTIN_FONT: &[u8] = include_bytes!("../../assets/DejaVuSans.ttf");

#[derive(Error, Debug)]
pub enum DrawError {
  #[error("读取字体文件失败: {0}")]
  IoError(#[from] std::io::Error),
  #[error("字体文件无效: {0}")]
  InvalidFont(#[from] ab_glyph::InvalidFont),
}

/// 单个检测框在图像上的实际位置
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoxLayout {
  pub x_min: i32,
  pub y_min: i32,
  pub x_max: i32,
  pub y_max: i32,
  /// 标签基线起点 (x, y)
  pub caption: (i32, i32),
}

/// 在图像上绘制检测框
///
/// 框坐标会先裁剪到图像范围内，越界的检测不会导致失败。
/// 只有设置了字体时才绘制 `"<查询> <分数>"` 标签。
#[derive(Clone)]
pub struct Draw {
  color: [u8; 3],
  stroke_width: i32,
  font_size: f32,
  font: Option<FontArc>,
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      color: BOX_COLOR,
      stroke_width: BOX_STROKE_WIDTH,
      font_size: CAPTION_FONT_SIZE,
      font: None,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  pub fn load_font(path: impl AsRef<Path>) -> Result<FontArc, DrawError> {
    let data = std::fs::read(path.as_ref())?;
    debug!("加载字体 {}: {} 字节", path.as_ref().display(), data.len());
    Ok(FontArc::try_from_vec(data)?)
  }

  /// 随库附带的 DejaVu Sans
  pub fn builtin_font() -> Result<FontArc, DrawError> {
    Ok(FontArc::try_from_slice(BUILTIN_FONT)?)
  }

  /// 计算裁剪后的框与标签位置，图像为空时返回 `None`
  ///
  /// 宽或高为零的框（包括裁剪后贴在图像边缘的框）按一像素宽的线绘制。
  pub fn layout(&self, bbox: &[f32; 4], width: u32, height: u32) -> Option<BoxLayout> {
    if width == 0 || height == 0 {
      return None;
    }
    let (w, h) = (width as i32, height as i32);

    let x_min = (bbox[0].min(bbox[2]).floor() as i32).clamp(0, w - 1);
    let y_min = (bbox[1].min(bbox[3]).floor() as i32).clamp(0, h - 1);
    let x_max = (bbox[0].max(bbox[2]).ceil() as i32).clamp(0, w - 1);
    let y_max = (bbox[1].max(bbox[3]).ceil() as i32).clamp(0, h - 1);


    let caption_y = if y_max + CAPTION_OFFSET_BELOW > h {
      y_max - CAPTION_OFFSET_ABOVE
    } else {
      y_max + CAPTION_OFFSET_BELOW
    };

    Some(BoxLayout {
      x_min,
      y_min,
      x_max,
      y_max,
      caption: (x_min, caption_y),
    })
  }

  fn draw_bbox_with_label(&self, image: &mut RgbImage, item: &DetectItem, label: &str) {
    let Some(layout) = self.layout(&item.bbox, image.width(), image.height()) else {
      warn!("图像为空，跳过检测框 {:?}", item.bbox);
      return;
    };

    // 边框向内加粗
    for t in 0..self.stroke_width {
      let (left, top) = (layout.x_min + t, layout.y_min + t);
      let (right, bottom) = (layout.x_max - t, layout.y_max - t);
      if left > right || top > bottom {
        break;
      }
      let rect = Rect::at(left, top).of_size((right - left + 1) as u32, (bottom - top + 1) as u32);
      draw_hollow_rect_mut(image, rect, Rgb(self.color));
    }

    if let Some(font) = &self.font {
      let text = format!("{} {:.2}", label, item.score);
      let (x, baseline) = layout.caption;
      draw_text_mut(
        image,
        Rgb(self.color),
        x,
        baseline - self.font_size as i32,
        PxScale::from(self.font_size),
        font,
        &text,
      );
    }
  }
}

pub trait DrawDetectionOnImage {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult);

  /// 在帧的副本上绘制，原帧不变
  fn draw_detection(&self, frame: &Frame, result: &DetectResult) -> RgbImage {
    let mut image = frame.image().clone();
    self.draw_detections_on_image(&mut image, result);
    image
  }
}

impl DrawDetectionOnImage for Draw {
  fn draw_detections_on_image(&self, image: &mut RgbImage, result: &DetectResult) {
    for item in result.items.iter() {
      self.draw_bbox_with_label(image, item, result.label_str(item));
    }
  }
}

/// 把检测结果写成文本记录，每行 `标签, 分数, x_min, y_min, x_max, y_max`
pub struct Record {
  pub label_with_name: bool,
}

impl Record {
  pub fn record(&self, result: &DetectResult, path: &Path) -> Result<(), std::io::Error> {
    let mut records = Vec::new();
    for item in result.items.iter() {
      let name = match (self.label_with_name, item.label) {
        (true, _) => result.label_str(item).to_string(),
        (false, Some(id)) => id.to_string(),
        (false, None) => "-1".to_string(),
      };
      records.push(format!(
        "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
        name, item.score, item.bbox[0], item.bbox[1], item.bbox[2], item.bbox[3]
      ));
    }
    std::fs::write(path.with_extension("txt"), records.join("\n"))?;
    Ok(())
  }
}
