// 该文件是 Owlet （枭目） 项目的一部分。
// src/input.rs - 图像输入
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

use thiserror::Error;
use url::Url;

use crate::{FromUrl, frame::Frame};

#[cfg(feature = "read_image_file")]
mod read_image_file;
#[cfg(feature = "read_image_file")]
pub use self::read_image_file::{ImageFileInput, ImageFileInputError};

#[cfg(feature = "fetch_http")]
mod http_fetch;
#[cfg(feature = "fetch_http")]
pub use self::http_fetch::{HttpImageInput, HttpImageInputBuilder, HttpImageInputError};

#[derive(Error, Debug)]
pub enum InputError {
  #[cfg(feature = "read_image_file")]
  #[error("Image file input error: {0}")]
  ImageFileInputError(#[from] ImageFileInputError),
  #[cfg(feature = "fetch_http")]
  #[error("HTTP image input error: {0}")]
  HttpImageInputError(#[from] HttpImageInputError),
  #[error("URI scheme mismatch: {0}")]
  SchemeMismatch(String),
}

pub enum InputWrapper {
  #[cfg(feature = "read_image_file")]
  ReadImageFile(ImageFileInput),
  #[cfg(feature = "fetch_http")]
  HttpImage(HttpImageInput),
}

impl FromUrl for InputWrapper {
  type Error = InputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    #[cfg(feature = "read_image_file")]
    {
      use crate::FromUrlWithScheme;

      if url.scheme() == ImageFileInput::SCHEME {
        let input = ImageFileInput::from_url(url)?;
        return Ok(InputWrapper::ReadImageFile(input));
      }
    }
    #[cfg(feature = "fetch_http")]
    {
      if HttpImageInputBuilder::accepts(url.scheme()) {
        let input = HttpImageInputBuilder::from_url(url)?.build()?;
        return Ok(InputWrapper::HttpImage(input));
      }
    }
    Err(InputError::SchemeMismatch(url.scheme().to_string()))
  }
}

impl InputWrapper {
  /// 与 `from_url` 相同，但网络输入使用指定的超时时间
  pub fn from_url_with_timeout(url: &Url, timeout: Duration) -> Result<Self, InputError> {
    #[cfg(feature = "fetch_http")]
    {
      if HttpImageInputBuilder::accepts(url.scheme()) {
        let input = HttpImageInputBuilder::from_url(url)?
          .timeout(timeout)
          .build()?;
        return Ok(InputWrapper::HttpImage(input));
      }
    }
    #[cfg(not(feature = "fetch_http"))]
    let _ = timeout;
    Self::from_url(url)
  }

  /// 取出唯一的一帧
  pub fn into_frame(mut self) -> Option<Frame> {
    self.next()
  }
}

impl Iterator for InputWrapper {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    match self {
      #[cfg(feature = "read_image_file")]
      InputWrapper::ReadImageFile(input) => input.next(),
      #[cfg(feature = "fetch_http")]
      InputWrapper::HttpImage(input) => input.next(),
    }
  }
}
