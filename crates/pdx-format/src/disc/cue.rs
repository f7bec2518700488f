//! CUE 表读写.
//!
//! 只识别数据轨道条目:
//! ```text
//! FILE "name.bin" BINARY
//!   TRACK 01 MODE2/2352
//!     INDEX 01 00:00:00
//! ```
//! 其他轨道类型 (AUDIO 等) 与多余的 INDEX 行被跳过.

use std::path::{Path, PathBuf};

use log::debug;
use pdx_core::{PdxError, PdxResult};

/// CUE 中的一个数据轨道
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CueTrack {
    /// 轨道文件名 (相对 CUE 所在目录)
    pub file: String,
    /// 轨道号
    pub number: u8,
    /// 模式 (1 或 2)
    pub mode: u8,
    /// 扇区大小
    pub sector_size: u32,
    /// INDEX 编号
    pub index: u8,
    /// INDEX 位置 (分, 秒, 帧)
    pub msf: (u8, u8, u8),
}

/// CUE 表
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CueSheet {
    /// 数据轨道, 按出现顺序
    pub tracks: Vec<CueTrack>,
    /// CUE 文件所在目录
    pub base_dir: PathBuf,
}

fn parse_num<T: std::str::FromStr>(text: &str, line: usize, what: &str) -> PdxResult<T> {
    text.parse()
        .map_err(|_| PdxError::Format(format!("CUE 第 {} 行: 无效的{} '{}'", line, what, text)))
}

fn parse_msf(text: &str, line: usize) -> PdxResult<(u8, u8, u8)> {
    let parts: Vec<&str> = text.split(':').collect();
    if parts.len() != 3 {
        return Err(PdxError::Format(format!(
            "CUE 第 {} 行: 无效的时间 '{}'",
            line, text
        )));
    }
    Ok((
        parse_num(parts[0], line, "分")?,
        parse_num(parts[1], line, "秒")?,
        parse_num(parts[2], line, "帧")?,
    ))
}

impl CueSheet {
    /// 解析 CUE 文本
    pub fn parse(text: &str) -> PdxResult<Self> {
        let mut tracks = Vec::new();
        // FILE 行给出文件名, TRACK 行给出轨道信息, 第一个 INDEX 行完成一个条目
        let mut file: Option<String> = None;
        let mut track: Option<(u8, u8, u32)> = None;

        for (no, raw) in text.lines().enumerate() {
            let line_no = no + 1;
            let line = raw.trim();
            if let Some(rest) = line.strip_prefix("FILE ") {
                track = None;
                file = None;
                let rest = rest.trim();
                let Some(body) = rest.strip_prefix('"') else {
                    return Err(PdxError::Format(format!(
                        "CUE 第 {} 行: 文件名缺少引号",
                        line_no
                    )));
                };
                let Some(end) = body.rfind('"') else {
                    return Err(PdxError::Format(format!(
                        "CUE 第 {} 行: 文件名引号未闭合",
                        line_no
                    )));
                };
                let kind = body[end + 1..].trim();
                if kind == "BINARY" {
                    file = Some(body[..end].to_string());
                } else {
                    debug!("CUE 第 {} 行: 跳过 {} 类型的文件", line_no, kind);
                }
            } else if let Some(rest) = line.strip_prefix("TRACK ") {
                let mut parts = rest.split_whitespace();
                let number: u8 = parse_num(parts.next().unwrap_or(""), line_no, "轨道号")?;
                let kind = parts.next().unwrap_or("");
                track = match kind.strip_prefix("MODE").and_then(|m| m.split_once('/')) {
                    Some((mode, size)) => Some((
                        number,
                        parse_num(mode, line_no, "模式")?,
                        parse_num(size, line_no, "扇区大小")?,
                    )),
                    None => {
                        debug!("CUE 第 {} 行: 跳过 {} 轨道", line_no, kind);
                        None
                    }
                };
            } else if let Some(rest) = line.strip_prefix("INDEX ") {
                let (Some(name), Some((number, mode, sector_size))) = (file.take(), track.take())
                else {
                    continue;
                };
                let mut parts = rest.split_whitespace();
                let index = parse_num(parts.next().unwrap_or(""), line_no, "INDEX 编号")?;
                let msf = parse_msf(parts.next().unwrap_or(""), line_no)?;
                tracks.push(CueTrack {
                    file: name,
                    number,
                    mode,
                    sector_size,
                    index,
                    msf,
                });
            }
        }

        Ok(Self {
            tracks,
            base_dir: PathBuf::new(),
        })
    }

    /// 读取 CUE 文件, 轨道路径相对其所在目录解析
    pub fn load(path: &Path) -> PdxResult<Self> {
        let text = std::fs::read_to_string(path)?;
        let mut sheet = Self::parse(&text)?;
        sheet.base_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Ok(sheet)
    }

    /// 各轨道文件的完整路径
    pub fn track_paths(&self) -> Vec<PathBuf> {
        self.tracks
            .iter()
            .map(|t| self.base_dir.join(&t.file))
            .collect()
    }

    /// 生成 MODE2/2352 格式的 CUE 文本
    pub fn write(file_names: &[String]) -> String {
        let mut out = String::new();
        for (i, name) in file_names.iter().enumerate() {
            out.push_str(&format!("FILE \"{}\" BINARY\n", name));
            out.push_str(&format!("  TRACK {:02} MODE2/2352\n", i + 1));
            out.push_str("    INDEX 01 00:00:00\n");
        }
        out
    }

    /// 在目录中写出 `<name>.cue`, 返回文件路径
    pub fn save(dir: &Path, name: &str, file_names: &[String]) -> PdxResult<PathBuf> {
        let path = dir.join(format!("{}.cue", name));
        std::fs::write(&path, Self::write(file_names))?;
        Ok(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SHEET: &str = "FILE \"Game (Track 01).bin\" BINARY\r\n  TRACK 01 MODE2/2352\r\n    INDEX 01 00:00:00\r\nFILE \"Game (Track 02).bin\" BINARY\r\n  TRACK 02 AUDIO\r\n    INDEX 00 00:00:00\r\n    INDEX 01 00:02:00\r\nFILE \"Game (Track 03).bin\" BINARY\r\n  TRACK 03 MODE1/2352\r\n    INDEX 01 01:02:03\r\n";

    #[test]
    fn test_解析数据轨道() {
        let sheet = CueSheet::parse(SHEET).unwrap();
        assert_eq!(sheet.tracks.len(), 2);
        assert_eq!(
            sheet.tracks[0],
            CueTrack {
                file: "Game (Track 01).bin".into(),
                number: 1,
                mode: 2,
                sector_size: 2352,
                index: 1,
                msf: (0, 0, 0),
            }
        );
        assert_eq!(sheet.tracks[1].number, 3);
        assert_eq!(sheet.tracks[1].mode, 1);
        assert_eq!(sheet.tracks[1].msf, (1, 2, 3));
    }

    #[test]
    fn test_写出后可重新解析() {
        let names = vec!["a (Track 01).bin".to_string(), "a (Track 02).bin".to_string()];
        let text = CueSheet::write(&names);
        assert!(text.starts_with("FILE \"a (Track 01).bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n"));
        let sheet = CueSheet::parse(&text).unwrap();
        let files: Vec<_> = sheet.tracks.iter().map(|t| t.file.clone()).collect();
        assert_eq!(files, names);
        assert_eq!(sheet.tracks[1].number, 2);
    }

    #[test]
    fn test_轨道路径相对_cue_目录() {
        let dir = tempfile::tempdir().unwrap();
        let path = CueSheet::save(dir.path(), "disc", &["disc.bin".to_string()]).unwrap();
        let sheet = CueSheet::load(&path).unwrap();
        assert_eq!(sheet.track_paths(), vec![dir.path().join("disc.bin")]);
    }

    #[test]
    fn test_无效时间() {
        let text = "FILE \"x.bin\" BINARY\n TRACK 01 MODE2/2352\n INDEX 01 00:00\n";
        assert!(matches!(CueSheet::parse(text), Err(PdxError::Format(_))));
    }
}
