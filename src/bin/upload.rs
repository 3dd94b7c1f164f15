// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/bin/upload.rs - 上传检测命令行工具
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

use std::path::PathBuf;

use anyhow::{Result, bail};
use clap::Parser;
use tracing::{debug, info};

use guardian_eye::{
  FromUrl,
  annotate::RasterCanvas,
  api::HttpApi,
  args::ConnectArgs,
  logging::setup_logging,
  media::{AcceptPolicy, LocalFile},
  model::UploadResult,
  workflow::UploadWorkflow,
};

/// 上传图像或视频进行防护装备检测
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 待检测的文件（JPEG、PNG、MP4 或 AVI）
  #[arg(long, value_name = "FILE")]
  file: PathBuf,

  /// 标注图像的保存路径，仅对图像有效
  #[arg(long, default_value = "annotated.png", value_name = "OUTPUT")]
  output: PathBuf,

  /// 标签字体文件，覆盖 GUARDIAN_FONT；未指定时使用内置字体
  #[arg(long, value_name = "FONT")]
  font: Option<PathBuf>,

  /// 只接受图像
  #[arg(long)]
  images_only: bool,

  /// 以 JSON 输出检测结果
  #[arg(long)]
  json: bool,

  #[command(flatten)]
  connect: ConnectArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let config = args.connect.config()?;
  setup_logging(config.log_format);

  info!("检测服务: {}", config.api_base);
  info!("输入文件: {}", args.file.display());

  let session = args.connect.session()?;
  let api = HttpApi::from_url(&config.api_base)?;
  let policy = if args.images_only {
    AcceptPolicy::ImagesOnly
  } else {
    AcceptPolicy::ImagesAndVideos
  };
  let workflow = UploadWorkflow::new(session, api)
    .with_accept_policy(policy)
    .with_response_ordering(config.response_ordering);

  workflow.select_file(LocalFile::from_path(&args.file)?)?;

  let now = std::time::Instant::now();
  if let Err(e) = workflow.submit().await {
    bail!("{}", e.user_message());
  }
  info!("检测完成，耗时: {:.2?}", now.elapsed());

  let Some(result) = workflow.result() else {
    bail!("检测服务没有返回结果");
  };
  print_result(&result, args.json)?;

  let mut canvas = match args.font.as_ref().or(config.font_path.as_ref()) {
    Some(font) => RasterCanvas::from_font_file(font)?,
    None => {
      debug!("未指定字体，使用内置字体");
      RasterCanvas::with_default_font()?
    }
  };
  if workflow.render(&mut canvas).await? {
    canvas.save(&args.output)?;
    info!("标注图像已保存: {}", args.output.display());
  }

  Ok(())
}

fn print_result(result: &UploadResult, json: bool) -> Result<()> {
  if json {
    // 返回的图像已写入标注文件，不再输出
    let printable = UploadResult {
      result_image_base64: None,
      ..result.clone()
    };
    println!("{}", serde_json::to_string_pretty(&printable)?);
    return Ok(());
  }

  if let Some(upload_id) = result.upload_id {
    println!("上传编号: {}", upload_id);
  }
  println!("检测结果: {} 个", result.detections.len());
  for detection in &result.detections {
    let [x_min, y_min, x_max, y_max] = detection.bbox;
    println!(
      "  {:<24} [{:.1}, {:.1}, {:.1}, {:.1}]",
      detection.label_text(),
      x_min,
      y_min,
      x_max,
      y_max
    );
  }
  Ok(())
}
