// 该文件是 Owlet （枭目） 项目的一部分。
// src/input/http_fetch.rs - 网络图像输入
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
use tracing::{debug, error, info};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme, frame::Frame};

const DEFAULT_FETCH_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Error, Debug)]
pub enum HttpImageInputError {
  #[error("URI 方案不匹配: {0}")]
  SchemeMismatch(String),
  #[error("HTTP 请求失败: {0}")]
  RequestError(#[from] reqwest::Error),
  #[error("HTTP 状态异常: {0}")]
  StatusError(reqwest::StatusCode),
  #[error("图像解码失败: {0}")]
  DecodeError(#[from] image::ImageError),
}

/// 通过 HTTP(S) 下载的单帧输入
///
/// 只请求一次，不重试；响应在读取完字节后立即释放。
pub struct HttpImageInput {
  frame: Option<Frame>,
}

pub struct HttpImageInputBuilder {
  url: Url,
  timeout: Duration,
}

impl FromUrlWithScheme for HttpImageInputBuilder {
  const SCHEME: &'static str = "http";
}

impl HttpImageInputBuilder {
  pub fn accepts(scheme: &str) -> bool {
    scheme == Self::SCHEME || scheme == "https"
  }

  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> Result<HttpImageInput, HttpImageInputError> {
    info!("下载图像: {}", self.url);
    let client = reqwest::blocking::Client::builder()
      .timeout(self.timeout)
      .build()?;

    let bytes = {
      let response = client.get(self.url.clone()).send()?;
      let status = response.status();
      if !status.is_success() {
        error!("下载 {} 失败, 状态码: {}", self.url, status);
        return Err(HttpImageInputError::StatusError(status));
      }
      response.bytes()?
    };
    debug!("下载完成: {} 字节", bytes.len());

    let image = image::load_from_memory(&bytes)?.to_rgb8();
    debug!("图像尺寸: {}x{}", image.width(), image.height());

    Ok(HttpImageInput {
      frame: Some(Frame::new(image, self.url)),
    })
  }
}

impl FromUrl for HttpImageInputBuilder {
  type Error = HttpImageInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if !Self::accepts(url.scheme()) {
      return Err(HttpImageInputError::SchemeMismatch(format!(
        "期望 'http' 或 'https', 实际为 '{}'",
        url.scheme()
      )));
    }

    Ok(HttpImageInputBuilder {
      url: url.clone(),
      timeout: DEFAULT_FETCH_TIMEOUT,
    })
  }
}

impl Iterator for HttpImageInput {
  type Item = Frame;

  fn next(&mut self) -> Option<Self::Item> {
    self.frame.take()
  }
}
