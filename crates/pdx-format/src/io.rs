//! 轨道 I/O 抽象层.
//!
//! 光盘镜像的每个轨道是一个可随机访问的字节流, 由 `IoBackend` 提供,
//! 支持文件与内存缓冲区两种后端. `TrackStream` 在其上记录轨道名称与总长度.

use std::io::{self, Read, Seek, SeekFrom};
use std::path::Path;

use pdx_core::PdxResult;

/// I/O 后端 trait
///
/// 实现此 trait 以支持不同的轨道数据来源 (文件、内存等).
pub trait IoBackend: Send {
    /// 读取数据到缓冲区
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize>;
    /// 定位 (seek)
    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64>;
    /// 获取总大小 (如果可知)
    fn size(&self) -> Option<u64>;
}

/// 文件 I/O 后端 (只读)
pub struct FileBackend {
    file: std::fs::File,
    size: Option<u64>,
}

impl FileBackend {
    /// 包装已打开的文件
    pub fn new(file: std::fs::File) -> Self {
        let size = file.metadata().ok().map(|m| m.len());
        Self { file, size }
    }
}

impl IoBackend for FileBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        self.file.read(buf)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        self.file.seek(pos)
    }

    fn size(&self) -> Option<u64> {
        self.size
    }
}

/// 内存缓冲区 I/O 后端
///
/// 用于测试和内存中构造的镜像.
pub struct MemoryBackend {
    /// 数据缓冲区
    data: Vec<u8>,
    /// 当前位置
    pos: usize,
}

impl MemoryBackend {
    /// 从已有数据创建
    pub fn from_data(data: Vec<u8>) -> Self {
        Self { data, pos: 0 }
    }

    /// 获取内部数据的引用
    pub fn data(&self) -> &[u8] {
        &self.data
    }
}

impl IoBackend for MemoryBackend {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        let available = self.data.len().saturating_sub(self.pos);
        let to_read = buf.len().min(available);
        if to_read == 0 {
            return Ok(0);
        }
        buf[..to_read].copy_from_slice(&self.data[self.pos..self.pos + to_read]);
        self.pos += to_read;
        Ok(to_read)
    }

    fn seek(&mut self, pos: SeekFrom) -> io::Result<u64> {
        let new_pos = match pos {
            SeekFrom::Start(offset) => offset as i64,
            SeekFrom::Current(offset) => self.pos as i64 + offset,
            SeekFrom::End(offset) => self.data.len() as i64 + offset,
        };
        if new_pos < 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "seek 位置不能为负数",
            ));
        }
        self.pos = new_pos as usize;
        Ok(self.pos as u64)
    }

    fn size(&self) -> Option<u64> {
        Some(self.data.len() as u64)
    }
}

/// 轨道字节流
///
/// 由所属的镜像独占, 随镜像释放而关闭.
pub struct TrackStream {
    /// 轨道文件名
    name: String,
    /// 底层后端
    backend: Box<dyn IoBackend>,
    /// 总长度 (字节)
    length: u64,
}

impl TrackStream {
    /// 从后端创建轨道, 长度取后端报告的大小, 未知时 seek 到末尾测量
    pub fn new(name: impl Into<String>, mut backend: Box<dyn IoBackend>) -> PdxResult<Self> {
        let length = match backend.size() {
            Some(size) => size,
            None => {
                let end = backend.seek(SeekFrom::End(0))?;
                backend.seek(SeekFrom::Start(0))?;
                end
            }
        };
        Ok(Self {
            name: name.into(),
            backend,
            length,
        })
    }

    /// 以只读方式打开轨道文件
    pub fn open(path: &Path) -> PdxResult<Self> {
        let file = std::fs::File::open(path)?;
        let name = path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();
        Self::new(name, Box::new(FileBackend::new(file)))
    }

    /// 从内存数据创建轨道
    pub fn from_memory(name: impl Into<String>, data: Vec<u8>) -> Self {
        let length = data.len() as u64;
        Self {
            name: name.into(),
            backend: Box::new(MemoryBackend::from_data(data)),
            length,
        }
    }

    /// 轨道文件名
    pub fn name(&self) -> &str {
        &self.name
    }

    /// 总长度 (字节)
    pub fn len(&self) -> u64 {
        self.length
    }

    /// 是否为空轨道
    pub fn is_empty(&self) -> bool {
        self.length == 0
    }

    /// 从指定偏移读取, 尽量填满缓冲区, 返回实际读取的字节数
    ///
    /// 只有到达轨道末尾时返回值才会小于缓冲区长度.
    pub fn read_at(&mut self, offset: u64, buf: &mut [u8]) -> PdxResult<usize> {
        self.backend.seek(SeekFrom::Start(offset))?;
        let mut total = 0;
        while total < buf.len() {
            let n = self.backend.read(&mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
        }
        Ok(total)
    }
}

impl std::fmt::Debug for TrackStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TrackStream")
            .field("name", &self.name)
            .field("length", &self.length)
            .finish()
    }
}
