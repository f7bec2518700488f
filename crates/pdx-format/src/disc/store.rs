//! 按 LBA 索引的扇区存储.
//!
//! 打开时以 2352 字节步长扫描每个轨道, 只读取 24 字节扇区头,
//! 建立跨轨道的扁平 LBA 表. 负载与 EDC/ECC 按需读取.

use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

use bytes::Bytes;
use log::{debug, info, warn};
use pdx_core::{PdxError, PdxResult};

use super::cue::CueSheet;
use super::sector::{Sector, SectorHeader};
use super::{RAW_SECTOR_SIZE, SECTOR_HEADER_SIZE};
use crate::io::TrackStream;

/// 扇区存储
#[derive(Debug)]
pub struct SectorStore {
    /// 轨道, 按 CUE 顺序
    tracks: Vec<TrackStream>,
    /// 所有轨道的扇区, 按 LBA 排列
    sectors: Vec<Sector>,
}

impl SectorStore {
    /// 扫描轨道建立扇区表
    ///
    /// 轨道末尾不足 24 字节的残片被忽略.
    pub fn open(mut tracks: Vec<TrackStream>) -> PdxResult<Self> {
        let mut sectors = Vec::new();
        for (track_id, track) in tracks.iter_mut().enumerate() {
            let mut offset = 0u64;
            let mut header = [0u8; SECTOR_HEADER_SIZE];
            while offset < track.len() {
                let n = track.read_at(offset, &mut header)?;
                if n < SECTOR_HEADER_SIZE {
                    warn!(
                        "轨道 {} 末尾残留 {} 字节, 不足一个扇区头",
                        track.name(),
                        n
                    );
                    break;
                }
                sectors.push(Sector::from_header(SectorHeader::parse(
                    &header, track_id, offset,
                )?));
                offset += RAW_SECTOR_SIZE as u64;
            }
            debug!("轨道 {}: {} 字节", track.name(), track.len());
        }
        info!("扇区表: {} 个轨道, {} 个扇区", tracks.len(), sectors.len());
        Ok(Self { tracks, sectors })
    }

    /// 读取 CUE 表并以只读方式打开所有轨道
    pub fn open_cue(path: &Path) -> PdxResult<Self> {
        let sheet = CueSheet::load(path)?;
        if sheet.tracks.is_empty() {
            return Err(PdxError::Format(format!(
                "CUE 中没有数据轨道: {}",
                path.display()
            )));
        }
        if let Some(track) = sheet
            .tracks
            .iter()
            .find(|t| t.sector_size as usize != RAW_SECTOR_SIZE)
        {
            return Err(PdxError::Unsupported(format!(
                "轨道 {} ({}): 扇区大小 {}, 只支持 {} 字节原始扇区",
                track.number, track.file, track.sector_size, RAW_SECTOR_SIZE
            )));
        }
        let tracks = sheet
            .track_paths()
            .iter()
            .map(|p| TrackStream::open(p))
            .collect::<PdxResult<Vec<_>>>()?;
        Self::open(tracks)
    }

    /// 扇区总数
    pub fn len(&self) -> usize {
        self.sectors.len()
    }

    /// 是否没有任何扇区
    pub fn is_empty(&self) -> bool {
        self.sectors.is_empty()
    }

    /// 轨道列表
    pub fn tracks(&self) -> &[TrackStream] {
        &self.tracks
    }

    /// 所有轨道的总字节数
    pub fn total_length(&self) -> u64 {
        self.tracks.iter().map(TrackStream::len).sum()
    }

    fn check_lba(&self, lba: usize) -> PdxResult<()> {
        if lba >= self.sectors.len() {
            return Err(PdxError::OutOfRange {
                what: "LBA",
                index: lba,
                len: self.sectors.len(),
            });
        }
        Ok(())
    }

    /// 扇区头
    pub fn header(&self, lba: usize) -> PdxResult<&SectorHeader> {
        self.check_lba(lba)?;
        Ok(&self.sectors[lba].header)
    }

    /// 从轨道读取负载与 EDC/ECC, 不写入缓存
    fn load_body(&mut self, lba: usize) -> PdxResult<(Bytes, Bytes)> {
        self.check_lba(lba)?;
        let header = &self.sectors[lba].header;
        let payload_len = header.payload_len();
        let mut body = vec![0u8; RAW_SECTOR_SIZE - SECTOR_HEADER_SIZE];
        let track = &mut self.tracks[header.track];
        let n = track.read_at(header.offset + SECTOR_HEADER_SIZE as u64, &mut body)?;
        if n < body.len() {
            debug!(
                "LBA {}: 扇区被截断 ({} / {} 字节), 其余补零",
                lba,
                n,
                body.len()
            );
        }
        let mut data = Bytes::from(body);
        let ecc = data.split_off(payload_len);
        Ok((data, ecc))
    }

    /// 读取完整扇区 (负载与 EDC/ECC 缓存在扇区表中)
    pub fn read_sector(&mut self, lba: usize) -> PdxResult<&Sector> {
        self.check_lba(lba)?;
        if !self.sectors[lba].is_loaded() {
            let (data, ecc) = self.load_body(lba)?;
            let sector = &mut self.sectors[lba];
            sector.data = Some(data);
            sector.ecc = Some(ecc);
        }
        Ok(&self.sectors[lba])
    }

    /// 释放扇区缓存的负载
    pub fn release(&mut self, lba: usize) {
        if let Some(sector) = self.sectors.get_mut(lba) {
            sector.data = None;
            sector.ecc = None;
        }
    }

    /// 从 `start_lba` 开始连续读取 `count` 字节的负载 (跳过扇区头与校验)
    ///
    /// 最后一个扇区只取需要的部分. 读到最后一个扇区之后返回 `OutOfRange`.
    pub fn read_bytes(&mut self, buf: &mut [u8], start_lba: usize, count: usize) -> PdxResult<usize> {
        if count > buf.len() {
            return Err(PdxError::InvalidArgument(format!(
                "读取 {} 字节, 缓冲区只有 {} 字节",
                count,
                buf.len()
            )));
        }
        let mut read = 0;
        let mut lba = start_lba;
        while read < count {
            let cached = self.sectors.get(lba).and_then(|s| s.data.clone());
            let data = match cached {
                Some(data) => data,
                None => self.load_body(lba)?.0,
            };
            let take = data.len().min(count - read);
            buf[read..read + take].copy_from_slice(&data[..take]);
            read += take;
            lba += 1;
        }
        Ok(read)
    }

    /// 重新写出所有轨道与对应的 CUE 表, 返回 CUE 路径
    ///
    /// 轨道文件命名为 `<name> (Track NN).bin`.
    pub fn write_tracks(&mut self, dir: &Path, name: &str) -> PdxResult<PathBuf> {
        let names: Vec<String> = (0..self.tracks.len())
            .map(|i| format!("{} (Track {:02}).bin", name, i + 1))
            .collect();
        let mut outputs = names
            .iter()
            .map(|n| Ok(BufWriter::new(std::fs::File::create(dir.join(n))?)))
            .collect::<PdxResult<Vec<_>>>()?;

        for lba in 0..self.sectors.len() {
            let raw = match self.sectors[lba].to_bytes() {
                Ok(raw) => raw,
                Err(_) => {
                    let (data, ecc) = self.load_body(lba)?;
                    let mut sector = Sector::from_header(self.sectors[lba].header.clone());
                    sector.data = Some(data);
                    sector.ecc = Some(ecc);
                    sector.to_bytes()?
                }
            };
            outputs[self.sectors[lba].header.track].write_all(&raw)?;
        }
        for mut out in outputs {
            out.flush()?;
        }

        let cue = CueSheet::save(dir, name, &names)?;
        info!("已写出 {} 个轨道: {}", names.len(), cue.display());
        Ok(cue)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::disc::SYNC_PATTERN;
    use crate::disc::sector::Submode;

    /// 构造一个原始扇区, 负载为 `fill(i)`
    fn raw_sector(submode: Submode, fill: impl Fn(usize) -> u8) -> Vec<u8> {
        let mut s = SYNC_PATTERN.to_vec();
        s.extend([0x00, 0x02, 0x00, 0x02, 0x01, 0x00, submode.bits(), 0x00]);
        s.extend([0x01, 0x00, submode.bits(), 0x00]);
        let payload_len = if submode.contains(Submode::FORM) { 2324 } else { 2048 };
        s.extend((0..payload_len).map(&fill));
        s.resize(RAW_SECTOR_SIZE, 0xEE);
        s
    }

    fn store(sectors: &[Vec<u8>]) -> SectorStore {
        let track = TrackStream::from_memory("t.bin", sectors.concat());
        SectorStore::open(vec![track]).unwrap()
    }

    #[test]
    fn test_扫描扇区头() {
        let s = store(&[
            raw_sector(Submode::DATA, |_| 0),
            raw_sector(Submode::AUDIO | Submode::FORM, |_| 0),
        ]);
        assert_eq!(s.len(), 2);
        assert_eq!(s.total_length(), 2 * RAW_SECTOR_SIZE as u64);
        assert_eq!(s.header(1).unwrap().offset, RAW_SECTOR_SIZE as u64);
        assert!(s.header(1).unwrap().is_form2());
        assert!(matches!(
            s.header(2),
            Err(PdxError::OutOfRange { what: "LBA", index: 2, len: 2 })
        ));
    }

    #[test]
    fn test_读取完整扇区() {
        let mut s = store(&[raw_sector(Submode::DATA, |i| (i % 256) as u8)]);
        assert!(!s.sectors[0].is_loaded());
        let sector = s.read_sector(0).unwrap();
        assert_eq!(sector.payload().len(), 2048);
        assert_eq!(sector.payload()[255], 255);
        assert_eq!(sector.ecc.as_ref().unwrap().len(), 280);
        assert!(sector.ecc.as_ref().unwrap().iter().all(|&b| b == 0xEE));
        assert!(s.sectors[0].is_loaded());
        s.release(0);
        assert!(!s.sectors[0].is_loaded());
    }

    #[test]
    fn test_连续读取等于单扇区负载() {
        let mut s = store(&[
            raw_sector(Submode::DATA, |i| (i % 256) as u8),
            raw_sector(Submode::DATA, |_| 0x77),
        ]);
        let mut buf = vec![0u8; 2048];
        assert_eq!(s.read_bytes(&mut buf, 0, 2048).unwrap(), 2048);
        let expected: Vec<u8> = (0..2048).map(|i| (i % 256) as u8).collect();
        assert_eq!(buf, expected);
        assert_eq!(buf, s.read_sector(0).unwrap().payload());
    }

    #[test]
    fn test_跨扇区读取() {
        let mut s = store(&[
            raw_sector(Submode::DATA, |_| 0x11),
            raw_sector(Submode::DATA | Submode::FORM, |_| 0x22),
            raw_sector(Submode::DATA, |_| 0x33),
        ]);
        let mut buf = vec![0u8; 2049];
        assert_eq!(s.read_bytes(&mut buf, 0, 2049).unwrap(), 2049);
        assert_eq!(buf[2047], 0x11);
        assert_eq!(buf[2048], 0x22);

        // Form 2 扇区贡献 2324 字节
        let mut buf = vec![0u8; 2325];
        s.read_bytes(&mut buf, 1, 2325).unwrap();
        assert_eq!(buf[2323], 0x22);
        assert_eq!(buf[2324], 0x33);
    }

    #[test]
    fn test_读取超出最后扇区() {
        let mut s = store(&[raw_sector(Submode::DATA, |_| 0)]);
        let mut buf = vec![0u8; 4096];
        assert!(matches!(
            s.read_bytes(&mut buf, 0, 4096),
            Err(PdxError::OutOfRange { index: 1, .. })
        ));
        assert!(matches!(
            s.read_bytes(&mut buf, 0, 5000),
            Err(PdxError::InvalidArgument(_))
        ));
        assert_eq!(s.read_bytes(&mut buf, 5, 0).unwrap(), 0);
    }

    #[test]
    fn test_多轨道_lba_连续() {
        let t1 = TrackStream::from_memory("a.bin", raw_sector(Submode::DATA, |_| 1));
        let t2 = TrackStream::from_memory(
            "b.bin",
            [raw_sector(Submode::DATA, |_| 2), raw_sector(Submode::DATA, |_| 3)].concat(),
        );
        let mut s = SectorStore::open(vec![t1, t2]).unwrap();
        assert_eq!(s.len(), 3);
        assert_eq!(s.header(2).unwrap().track, 1);
        assert_eq!(s.header(2).unwrap().offset, RAW_SECTOR_SIZE as u64);
        assert_eq!(s.read_sector(2).unwrap().payload()[0], 3);
    }

    #[test]
    fn test_末尾残片被忽略() {
        let mut data = raw_sector(Submode::DATA, |_| 0);
        data.extend([0u8; 10]);
        let s = SectorStore::open(vec![TrackStream::from_memory("t.bin", data)]).unwrap();
        assert_eq!(s.len(), 1);
    }

    #[test]
    fn test_截断扇区补零() {
        let mut data = raw_sector(Submode::DATA, |_| 0x55);
        data.truncate(100);
        let mut s = SectorStore::open(vec![TrackStream::from_memory("t.bin", data)]).unwrap();
        let payload = s.read_sector(0).unwrap().payload().to_vec();
        assert_eq!(payload[75], 0x55);
        assert_eq!(payload[76], 0);
    }

    #[test]
    fn test_重新写出轨道与_cue() {
        let sectors = [
            raw_sector(Submode::DATA, |i| i as u8),
            raw_sector(Submode::VIDEO | Submode::FORM, |i| (i * 3) as u8),
        ];
        let mut s = store(&sectors);
        s.read_sector(1).unwrap();

        let dir = tempfile::tempdir().unwrap();
        let cue = s.write_tracks(dir.path(), "copy").unwrap();
        let written = std::fs::read(dir.path().join("copy (Track 01).bin")).unwrap();
        assert_eq!(written, sectors.concat());

        let reopened = SectorStore::open_cue(&cue).unwrap();
        assert_eq!(reopened.len(), 2);
        assert_eq!(reopened.tracks()[0].name(), "copy (Track 01).bin");
    }

    #[test]
    fn test_非原始扇区大小的轨道被拒绝() {
        let dir = tempfile::tempdir().unwrap();
        let data = raw_sector(Submode::DATA, |_| 0);
        std::fs::write(dir.path().join("a.bin"), &data).unwrap();
        std::fs::write(dir.path().join("b.bin"), &data).unwrap();
        let cue = dir.path().join("disc.cue");
        std::fs::write(
            &cue,
            "FILE \"a.bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n\
             FILE \"b.bin\" BINARY\n  TRACK 02 MODE2/2336\n    INDEX 01 00:00:00\n",
        )
        .unwrap();
        assert!(matches!(
            SectorStore::open_cue(&cue),
            Err(PdxError::Unsupported(_))
        ));

        std::fs::write(
            &cue,
            "FILE \"a.bin\" BINARY\n  TRACK 01 MODE2/2352\n    INDEX 01 00:00:00\n",
        )
        .unwrap();
        assert_eq!(SectorStore::open_cue(&cue).unwrap().len(), 1);
    }
}
