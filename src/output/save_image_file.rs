// 该文件是 Owlet （枭目） 项目的一部分。
// src/output/save_image_file.rs - 保存图像文件
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

use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::{
  FromUrl, FromUrlWithScheme,
  frame::Frame,
  model::DetectResult,
  output::{
    Render,
    draw::{Draw, DrawDetectionOnImage, DrawError, Record},
  },
  query_value,
};

/// 绘制检测结果并保存，`image:///path/out.png?record=name&font=/path/font.ttf`
///
/// - `record=name|id`：同时写出同名 `.txt` 记录
/// - `font=<path>|builtin`：绘制标签文字，`builtin` 使用随库附带的字体
pub struct SaveImageFileOutput {
  path: String,
  draw: Draw,
  record: Option<Record>,
}

#[derive(Error, Debug)]
pub enum SaveImageFileError {
  #[error("I/O 错误: {0}")]
  IoError(#[from] std::io::Error),
  #[error("图像错误: {0}")]
  ImageError(#[from] image::ImageError),
  #[error("字体错误: {0}")]
  FontError(#[from] DrawError),
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("未知的记录方式: {0}")]
  UnknownRecord(String),
}

impl FromUrlWithScheme for SaveImageFileOutput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn from_url(uri: &Url) -> Result<Self, Self::Error> {
    if uri.scheme() != Self::SCHEME {
      return Err(SaveImageFileError::SchemeMismatch(format!(
        "期望保存方式 '{}', 实际保存方式 '{}'",
        Self::SCHEME,
        uri.scheme()
      )));
    }

    let record = match query_value(uri, "record").as_deref() {
      None => None,
      Some("name") => Some(Record {
        label_with_name: true,
      }),
      Some("id") => Some(Record {
        label_with_name: false,
      }),
      Some(other) => return Err(SaveImageFileError::UnknownRecord(other.to_string())),
    };

    let mut draw = Draw::default();
    match query_value(uri, "font").as_deref() {
      None => {}
      Some("builtin") => draw = draw.with_font(Draw::builtin_font()?),
      Some(font_path) => draw = draw.with_font(Draw::load_font(font_path)?),
    }

    Ok(SaveImageFileOutput {
      path: uri.path().to_string(),
      draw,
      record,
    })
  }
}

impl SaveImageFileOutput {
  fn save_image(&self, image: image::RgbImage) -> Result<(), SaveImageFileError> {
    if let Some(parent) = Path::new(&self.path).parent()
      && !parent.as_os_str().is_empty()
    {
      std::fs::create_dir_all(parent)?;
    }

    image.save(&self.path)?;

    info!("保存图像到文件: {}", self.path);

    Ok(())
  }
}

impl Render<Frame, DetectResult> for SaveImageFileOutput {
  type Error = SaveImageFileError;

  fn render_result(&self, frame: &Frame, result: &DetectResult) -> Result<(), Self::Error> {
    if result.is_empty() {
      warn!("没有检测结果，保存原图");
    }
    let image = self.draw.draw_detection(frame, result);
    self.save_image(image)?;

    if let Some(record) = &self.record {
      record.record(result, Path::new(&self.path))?;
    }
    Ok(())
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::DetectItem;
  use image::{Rgb, RgbImage};

  #[test]
  fn saves_drawn_image_and_record() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("nested").join("out.png");
    let url = Url::parse(&format!("image://{}?record=name", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let frame = Frame::new(
      RgbImage::from_pixel(64, 48, Rgb([255, 255, 255])),
      Url::parse("image:///tmp/in.png").unwrap(),
    );
    let result = DetectResult::new(
      vec![DetectItem::new([4.0, 4.0, 40.0, 30.0], 0.8).with_label(Some(0))],
      &["remote".to_string()],
    );
    output.render_result(&frame, &result).unwrap();

    let saved = image::open(&path).unwrap().to_rgb8();
    assert_eq!(saved.dimensions(), (64, 48));
    assert_eq!(saved.get_pixel(4, 4), &Rgb([255, 0, 0]));
    let record = std::fs::read_to_string(path.with_extension("txt")).unwrap();
    assert!(record.starts_with("remote, 0.8000"));
  }

  #[test]
  fn builtin_font_draws_caption() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("out.png");
    let url = Url::parse(&format!("image://{}?font=builtin", path.display())).unwrap();
    let output = SaveImageFileOutput::from_url(&url).unwrap();

    let white = Rgb([255, 255, 255]);
    let frame = Frame::new(
      RgbImage::from_pixel(200, 100, white),
      Url::parse("image:///tmp/in.png").unwrap(),
    );
    let result = DetectResult::new(
      vec![DetectItem::new([4.0, 4.0, 60.0, 40.0], 0.8).with_label(Some(0))],
      &["remote".to_string()],
    );
    output.render_result(&frame, &result).unwrap();

    // 标签基线在 y = 65，文字占据 45..65 附近
    let saved = image::open(&path).unwrap().to_rgb8();
    let inked = (41..=70).any(|y| (4..150).any(|x| *saved.get_pixel(x, y) != white));
    assert!(inked);
  }

  #[test]
  fn unknown_record_kind_is_rejected() {
    let url = Url::parse("image:///tmp/out.png?record=yaml").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::UnknownRecord(kind)) if kind == "yaml"
    ));
  }

  #[test]
  fn missing_font_is_an_error() {
    let url = Url::parse("image:///tmp/out.png?font=/no/such/font.ttf").unwrap();
    assert!(matches!(
      SaveImageFileOutput::from_url(&url),
      Err(SaveImageFileError::FontError(DrawError::IoError(_)))
    ));
  }
}
