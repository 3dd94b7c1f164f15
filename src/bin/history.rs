// 该文件是 Guardian Eye （守望之眼） 项目的一部分。
// src/bin/history.rs - 上传历史命令行工具
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
use tracing::info;

use guardian_eye::{
  FromUrl,
  api::HttpApi,
  args::ConnectArgs,
  history::{HISTORY_FAILED_MESSAGE, HistoryFilters, HistoryView},
  logging::setup_logging,
};

/// 浏览上传历史
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
  /// 页码，从 1 开始
  #[arg(long, default_value = "1", value_name = "PAGE")]
  page: u32,

  /// 每页条数，覆盖 GUARDIAN_PER_PAGE
  #[arg(long, value_name = "COUNT")]
  per_page: Option<u32>,

  /// 按文件名筛选
  #[arg(long, default_value = "", value_name = "NAME")]
  filename: String,

  /// 起始日期（YYYY-MM-DD）
  #[arg(long, default_value = "", value_name = "DATE")]
  start_date: String,

  /// 结束日期（YYYY-MM-DD）
  #[arg(long, default_value = "", value_name = "DATE")]
  end_date: String,

  /// 显示每次上传的检测明细
  #[arg(long)]
  expand: bool,

  #[command(flatten)]
  connect: ConnectArgs,
}

#[tokio::main]
async fn main() -> Result<()> {
  let args = Args::parse();
  let config = args.connect.config()?;
  setup_logging(config.log_format);

  let filters = HistoryFilters::parse(&args.filename, &args.start_date, &args.end_date)?;
  let session = args.connect.session()?;
  let api = HttpApi::from_url(&config.api_base)?;
  let mut view = HistoryView::new(session, api).with_per_page(args.per_page.unwrap_or(config.per_page));

  if let Err(e) = view.apply_filters(filters).await {
    bail!("{}", e.user_message(HISTORY_FAILED_MESSAGE));
  }
  if args.page > 1
    && let Err(e) = view.go_to_page(args.page).await
  {
    bail!("{}", e.user_message(HISTORY_FAILED_MESSAGE));
  }
  info!("第 {}/{} 页", view.page(), view.total_pages());

  if args.expand {
    let ids: Vec<i64> = view.uploads().iter().map(|upload| upload.upload_id).collect();
    for id in ids {
      view.toggle_row(id);
    }
  }

  println!("{:<8} {:<32} {:<20} 检测", "编号", "文件名", "上传时间");
  for row in view.rows() {
    println!(
      "{:<8} {:<32} {:<20} {}",
      row.upload_id, row.filename, row.upload_time, row.summary
    );
    if row.expanded {
      for detail in &row.details {
        println!("         - {} {} {}", detail.label, detail.confidence, detail.bbox);
      }
    }
  }
  println!("第 {} 页，共 {} 页", view.page(), view.total_pages());

  Ok(())
}
