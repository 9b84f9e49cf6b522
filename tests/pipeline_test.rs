// 该文件是 Owlet （枭目） 项目的一部分。
// tests/pipeline_test.rs - 单次检测流程测试
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

use image::{Rgb, RgbImage};
use owlet::{
  FromUrl,
  frame::Frame,
  input::InputWrapper,
  model::{Query, ReplayDetector},
  output::OutputWrapper,
  postprocess::PostProcessor,
  task::{OneShotTask, Task},
};
use url::Url;

const WHITE: Rgb<u8> = Rgb([255, 255, 255]);
const RED: Rgb<u8> = Rgb([255, 0, 0]);

fn image_url(path: &Path) -> Url {
  Url::parse(&format!("image://{}", path.display())).unwrap()
}

fn write_fixture(dir: &Path, recording: &str) -> (Url, Url, Url) {
  let input = dir.join("target.png");
  RgbImage::from_pixel(1024, 768, WHITE).save(&input).unwrap();

  let detections = dir.join("detections.json");
  std::fs::write(&detections, recording).unwrap();

  let model = Url::parse(&format!("replay://{}", detections.display())).unwrap();
  let output = dir.join("out").join("result.png");
  (image_url(&input), model, image_url(&output))
}

#[test]
fn test_text_query_pipeline() {
  let dir = tempfile::tempdir().unwrap();
  // 框 0 和 2 不重叠，框 1 分数低于阈值
  let (input, model, output) = write_fixture(
    dir.path(),
    r#"{"text": [
      {"bbox": [0.0537109375, 0.0716145833, 0.087890625, 0.1171875], "score": 0.9, "label": 0},
      {"bbox": [0.5, 0.5, 0.1, 0.1], "score": 0.5, "label": 1},
      {"bbox": [0.8, 0.8, 0.1, 0.1], "score": 0.65, "label": 1}
    ]}"#,
  );

  let result = OneShotTask::new(Query::Text(vec!["cat".into(), "remote".into()]))
    .with_post_processor(PostProcessor::new(0.6, 0.3).unwrap())
    .run_task(
      InputWrapper::from_url(&input).unwrap(),
      ReplayDetector::from_url(&model).unwrap(),
      OutputWrapper::from_url(&output).unwrap(),
    )
    .unwrap();

  let scores: Vec<f32> = result.items.iter().map(|item| item.score).collect();
  assert_eq!(scores, vec![0.9, 0.65]);
  assert_eq!(result.label_str(&result.items[0]), "cat");
  assert_eq!(result.label_str(&result.items[1]), "remote");

  // 第一个框约为 (10, 10) - (100, 100)
  let bbox = result.items[0].bbox;
  assert!((bbox[0] - 10.0).abs() < 0.5 && (bbox[3] - 100.0).abs() < 0.5);

  let saved = image::open(dir.path().join("out").join("result.png"))
    .unwrap()
    .to_rgb8();
  assert_eq!(saved.dimensions(), (1024, 768));
  assert_eq!(saved.get_pixel(55, 10), &RED);
  assert_eq!(saved.get_pixel(55, 55), &WHITE);
}

#[test]
fn test_image_query_pipeline_suppresses_overlaps() {
  let dir = tempfile::tempdir().unwrap();
  let (input, model, output) = write_fixture(
    dir.path(),
    r#"{"image": [
      {"bbox": [0.50, 0.50, 0.2, 0.2], "score": 0.7},
      {"bbox": [0.51, 0.51, 0.2, 0.2], "score": 0.95},
      {"bbox": [0.10, 0.10, 0.1, 0.1], "score": 0.8}
    ]}"#,
  );
  let reference = Frame::new(RgbImage::new(32, 32), Url::parse("image:///ref.png").unwrap());

  let result = OneShotTask::new(Query::Image(reference))
    .run_task(
      InputWrapper::from_url(&input).unwrap(),
      ReplayDetector::from_url(&model).unwrap(),
      OutputWrapper::from_url(&output).unwrap(),
    )
    .unwrap();

  let scores: Vec<f32> = result.items.iter().map(|item| item.score).collect();
  assert_eq!(scores, vec![0.95, 0.8]);
  assert!(result.items.iter().all(|item| item.label.is_none()));
}

#[test]
fn test_empty_result_saves_original() {
  let dir = tempfile::tempdir().unwrap();
  let (input, model, output) = write_fixture(
    dir.path(),
    r#"{"text": [{"bbox": [0.5, 0.5, 0.2, 0.2], "score": 0.1, "label": 0}]}"#,
  );

  let result = OneShotTask::new(Query::Text(vec!["cat".into()]))
    .run_task(
      InputWrapper::from_url(&input).unwrap(),
      ReplayDetector::from_url(&model).unwrap(),
      OutputWrapper::from_url(&output).unwrap(),
    )
    .unwrap();
  assert!(result.is_empty());

  let original = image::open(dir.path().join("target.png")).unwrap().to_rgb8();
  let saved = image::open(dir.path().join("out").join("result.png"))
    .unwrap()
    .to_rgb8();
  assert_eq!(original, saved);
}

#[test]
fn test_missing_input_frame_is_an_error() {
  let dir = tempfile::tempdir().unwrap();
  let (_, model, output) = write_fixture(dir.path(), "{}");

  let result = OneShotTask::new(Query::Text(vec!["cat".into()])).run_task(
    std::iter::empty::<Frame>(),
    ReplayDetector::from_url(&model).unwrap(),
    OutputWrapper::from_url(&output).unwrap(),
  );
  assert!(result.is_err());
}

#[test]
fn test_detector_error_propagates() {
  let dir = tempfile::tempdir().unwrap();
  let (input, model, output) = write_fixture(
    dir.path(),
    r#"{"text": [{"bbox": [0.5, 0.5, 0.2, 0.2], "score": 0.9, "label": 5}]}"#,
  );

  let result = OneShotTask::new(Query::Text(vec!["cat".into()])).run_task(
    InputWrapper::from_url(&input).unwrap(),
    ReplayDetector::from_url(&model).unwrap(),
    OutputWrapper::from_url(&output).unwrap(),
  );
  assert!(result.is_err());
  assert!(!dir.path().join("out").join("result.png").exists());
}
