//! pdx - Playdia 光盘流提取命令行工具
//!
//! 读取 CUE 描述的 CD-XA 光盘镜像, 列出根目录文件,
//! 并按需提取原始文件、XA-ADPCM 音轨、视频帧数据与解码后的视频帧.

mod extract;
mod logging;

use std::path::PathBuf;
use std::process;

use anyhow::{Context, Result};
use clap::Parser;
use log::{error, info, warn};
use pdx_codec::decoders::jpeg::JpegHeaderConfig;
use pdx_format::IsoImage;

use extract::{Tasks, process_file};

#[derive(Parser, Debug)]
#[command(name = "pdx", about = "Playdia 光盘流提取工具")]
struct Cli {
    /// 输入 CUE 文件路径
    #[arg(short, long)]
    cue: Option<PathBuf>,

    /// 输出目录
    #[arg(short, long, default_value = "output")]
    destination: PathBuf,

    /// 最多处理的文件数 (0 表示不限)
    #[arg(short, long, default_value_t = 0)]
    limit: usize,

    /// 提取音轨 (WAV)
    #[arg(short, long)]
    audio: bool,

    /// 提取视频帧原始数据
    #[arg(short = 'V', long)]
    video: bool,

    /// 解码视频帧为 PNG (需要 --jpeg-config)
    #[arg(short, long)]
    frame: bool,

    /// JPEG 头信息快照 (JSON), 用于解码视频帧
    #[arg(short, long = "jpeg-config")]
    jpeg_config: Option<PathBuf>,

    /// 只列出根目录文件
    #[arg(long)]
    list: bool,

    /// 显示版本信息
    #[arg(long)]
    build_info: bool,

    /// 日志级别 (-v debug, -vv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,
}

fn main() {
    let cli = Cli::parse();
    if let Err(e) = logging::init("pdx-cli", cli.verbose) {
        eprintln!("警告: 日志初始化失败: {e:#}");
    }

    if cli.build_info {
        print_build_info();
        return;
    }

    if let Err(e) = run(&cli) {
        error!("{e:#}");
        process::exit(1);
    }
}

fn print_build_info() {
    println!("pdx {}", env!("CARGO_PKG_VERSION"));
    println!("  解码器: adpcm_xa, jpeg");
    println!("  输入: CUE + MODE2/2352 轨道");
}

/// 根据命令行参数确定提取任务
fn build_tasks(cli: &Cli) -> Result<Tasks> {
    let frames = if cli.frame {
        let path = cli
            .jpeg_config
            .as_ref()
            .context("--frame 需要同时指定 --jpeg-config")?;
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("读取 {} 失败", path.display()))?;
        Some(JpegHeaderConfig::from_json(&text).context("解析 JPEG 头信息快照失败")?)
    } else {
        None
    };
    Ok(Tasks {
        raw: !cli.list && !cli.audio && !cli.video && !cli.frame,
        audio: !cli.list && cli.audio,
        video: !cli.list && cli.video,
        frames: if cli.list { None } else { frames },
    })
}

fn run(cli: &Cli) -> Result<()> {
    let cue = cli.cue.as_ref().context("必须指定 CUE 文件 (-c <文件>)")?;
    let tasks = build_tasks(cli)?;

    let mut image =
        IsoImage::open_cue(cue).with_context(|| format!("打开镜像 {} 失败", cue.display()))?;
    if image.primary().is_none() {
        warn!("{}: 没有 ISO9660 文件系统", cue.display());
        return Ok(());
    }
    if !cli.list {
        std::fs::create_dir_all(&cli.destination)
            .with_context(|| format!("创建 {} 失败", cli.destination.display()))?;
    }

    let files = image.files();
    let limit = if cli.limit == 0 { files.len() } else { cli.limit };
    let mut failed = 0;
    for record in files.iter().take(limit) {
        println!("{}", record);
        if let Err(e) = process_file(&mut image, record, &cli.destination, &tasks) {
            error!("{e:#}");
            failed += 1;
        }
    }

    info!(
        "完成: {} 个文件, {} 个失败",
        files.len().min(limit),
        failed
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_参数解析() {
        let cli = Cli::parse_from(["pdx", "-c", "disc.cue", "-a", "-V", "-l", "3", "-vv"]);
        assert_eq!(cli.cue, Some(PathBuf::from("disc.cue")));
        assert!(cli.audio && cli.video && !cli.frame);
        assert_eq!(cli.limit, 3);
        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.destination, PathBuf::from("output"));

        let tasks = build_tasks(&cli).unwrap();
        assert!(!tasks.raw && tasks.audio && tasks.video && tasks.frames.is_none());
    }

    #[test]
    fn test_默认提取原始文件() {
        let cli = Cli::parse_from(["pdx", "--cue", "disc.cue"]);
        assert!(build_tasks(&cli).unwrap().raw);

        let cli = Cli::parse_from(["pdx", "--cue", "disc.cue", "--list", "-a"]);
        let tasks = build_tasks(&cli).unwrap();
        assert!(!tasks.raw && !tasks.audio);
    }

    #[test]
    fn test_解码帧需要头信息快照() {
        let cli = Cli::parse_from(["pdx", "-c", "disc.cue", "-f"]);
        assert!(build_tasks(&cli).is_err());
    }

    #[test]
    fn test_命令定义有效() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
