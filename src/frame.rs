// 该文件是 Owlet （枭目） 项目的一部分。
// src/frame.rs - 帧定义
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
use url::Url;

/// 一次推理使用的 RGB 图像，加载后在整个推理过程中保持不变
#[derive(Debug, Clone)]
pub struct Frame {
  image: RgbImage,
  source: Url,
}

impl Frame {
  pub fn new(image: RgbImage, source: Url) -> Self {
    Self { image, source }
  }

  pub fn image(&self) -> &RgbImage {
    &self.image
  }

  /// 图像来源
  pub fn source(&self) -> &Url {
    &self.source
  }

  pub fn height(&self) -> u32 {
    self.image.height()
  }

  pub fn width(&self) -> u32 {
    self.image.width()
  }

  /// 目标尺寸 (height, width)，后处理按此缩放检测框
  pub fn target_size(&self) -> (u32, u32) {
    (self.image.height(), self.image.width())
  }
}
