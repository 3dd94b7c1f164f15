// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/bin/analytics.rs - 合规统计命令行工具
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

use anyhow::{Result, bail};
use clap::Parser;

use guardian_eye::{
  FromUrl,
  analytics::{ANALYTICS_FAILED_MESSAGE, AnalyticsView},
  api::HttpApi,
  args::ConnectArgs,
  history::parse_date_filter,
  logging::setup_logging,
};

/// 查看检测统计
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 起始日期（YYYY-MM-DD）
  #[arg(long, default_value = "", value_name = "DATE")]
  start_date: String,

  /// 结束日期（YYYY-MM-DD）
  #[arg(long, default_value = "", value_name = "DATE")]
  end_date: String,

  #[command(flatten)]
  connect: ConnectArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let config = args.connect.config()?;
  setup_logging(config.log_format);

  let start_date = parse_date_filter(&args.start_date)?;
  let end_date = parse_date_filter(&args.end_date)?;
  let session = args.connect.session()?;
  let api = HttpApi::from_url(&config.api_base)?;
  let mut view = AnalyticsView::new(session, api);

  if let Err(e) = view.apply_filters(start_date, end_date).await {
    bail!("{}", e.user_message(ANALYTICS_FAILED_MESSAGE));
  }

  println!("上传总数: {}", view.report().total_uploads);

  let bars = view.bar_series();
  println!();
  println!("{}", bars.title);
  for (label, value) in bars.labels.iter().zip(&bars.values) {
    println!("  {:<24} {}", label, value);
  }

  let chart = view.trend_chart();
  if chart.dates.is_empty() {
    return Ok(());
  }
  println!();
  print!("{:<12}", "日期");
  for series in &chart.series {
    print!(" {:>12}", series.label);
  }
  println!();
  for (index, date) in chart.dates.iter().enumerate() {
    print!("{:<12}", date);
    for series in &chart.series {
      print!(" {:>12}", series.values[index]);
    }
    println!();
  }

  Ok(())
}
