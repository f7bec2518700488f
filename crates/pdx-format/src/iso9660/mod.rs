//! ISO9660 文件系统 (只读, 单层根目录).
//!
//! 从 LBA 16 开始遍历卷描述符直到终止符, 取主卷描述符中的根目录记录,
//! 读取根目录的所有记录 (不递归子目录).

pub mod descriptor;
pub mod directory;

use std::path::Path;

use log::{debug, info, warn};
use pdx_core::{PdxError, PdxResult};

pub use descriptor::{PrimaryVolumeDescriptor, VolumeDescriptor, VolumeDescriptorType};
pub use directory::{DirectoryRecord, FileFlags, XaAttributes, XaExtension};

use crate::disc::store::SectorStore;
use crate::disc::FORM1_PAYLOAD_SIZE;

/// 第一个卷描述符所在 LBA
pub const VOLUME_DESCRIPTOR_START: usize = 16;

/// ISO9660 镜像
#[derive(Debug)]
pub struct IsoImage {
    /// 扇区存储
    store: SectorStore,
    /// 已识别的卷描述符 (含终止符)
    descriptors: Vec<VolumeDescriptor>,
    /// 主卷描述符
    primary: Option<PrimaryVolumeDescriptor>,
}

impl IsoImage {
    /// 在扇区存储上解析文件系统
    pub fn open(mut store: SectorStore) -> PdxResult<Self> {
        let mut descriptors = Vec::new();
        let mut primary: Option<PrimaryVolumeDescriptor> = None;

        let mut lba = VOLUME_DESCRIPTOR_START;
        while lba < store.len() {
            let data = store.read_sector(lba)?.payload().to_vec();
            store.release(lba);
            let vd = VolumeDescriptor::parse(&data)?;
            if !vd.is_standard() {
                debug!("LBA {}: 非 CD001 描述符, 跳过", lba);
                lba += 1;
                continue;
            }
            match vd.kind {
                VolumeDescriptorType::SetTerminator => {
                    descriptors.push(vd);
                    break;
                }
                VolumeDescriptorType::Primary => {
                    let pvd = PrimaryVolumeDescriptor::parse(&data)?;
                    info!(
                        "主卷描述符: 卷 '{}', 系统 '{}', {} 个逻辑块",
                        pvd.volume_id, pvd.system_id, pvd.space_size
                    );
                    if primary.is_none() {
                        primary = Some(pvd);
                    }
                    descriptors.push(vd);
                }
                VolumeDescriptorType::Other(kind) => {
                    warn!("LBA {}: 未知的卷描述符类型 {}", lba, kind);
                }
                _ => {
                    debug!("LBA {}: 卷描述符 {:?}", lba, vd.kind);
                    descriptors.push(vd);
                }
            }
            lba += 1;
        }

        let mut image = Self {
            store,
            descriptors,
            primary,
        };
        if image.primary.is_some() {
            image.read_root_directory()?;
        } else {
            warn!("未找到主卷描述符");
        }
        Ok(image)
    }

    /// 读取 CUE 描述的镜像
    pub fn open_cue(path: &Path) -> PdxResult<Self> {
        Self::open(SectorStore::open_cue(path)?)
    }

    /// 读取根目录的全部记录
    ///
    /// 记录不跨扇区; 扇区内遇到长度 0 表示该扇区剩余部分为填充.
    fn read_root_directory(&mut self) -> PdxResult<()> {
        let Some(primary) = self.primary.as_mut() else {
            return Ok(());
        };
        let extent = primary.root.extent as usize;
        let sectors = (primary.root.data_length as usize).div_ceil(FORM1_PAYLOAD_SIZE).max(1);

        let mut children = Vec::new();
        for lba in extent..extent + sectors {
            let data = self.store.read_sector(lba)?.payload().to_vec();
            self.store.release(lba);
            let mut offset = 0;
            while offset < data.len() && data[offset] != 0 {
                let length = data[offset] as usize;
                let Some(raw) = data.get(offset..offset + length) else {
                    warn!("LBA {}: 目录记录越过扇区末尾", lba);
                    break;
                };
                let record = DirectoryRecord::parse(raw)?;
                debug!("{}", record);
                children.push(record);
                offset += length;
            }
        }
        info!("根目录: {} 条记录", children.len());
        primary.root.children = children;
        Ok(())
    }

    /// 扇区存储
    pub fn store(&self) -> &SectorStore {
        &self.store
    }

    /// 扇区存储 (可变)
    pub fn store_mut(&mut self) -> &mut SectorStore {
        &mut self.store
    }

    /// 已识别的卷描述符
    pub fn descriptors(&self) -> &[VolumeDescriptor] {
        &self.descriptors
    }

    /// 主卷描述符
    pub fn primary(&self) -> Option<&PrimaryVolumeDescriptor> {
        self.primary.as_ref()
    }

    /// 根目录
    pub fn root(&self) -> Option<&DirectoryRecord> {
        self.primary.as_ref().map(|p| &p.root)
    }

    /// 根目录中的文件 (不含目录)
    pub fn files(&self) -> Vec<DirectoryRecord> {
        self.root()
            .map(|root| {
                root.children
                    .iter()
                    .filter(|r| !r.is_directory())
                    .cloned()
                    .collect()
            })
            .unwrap_or_default()
    }

    /// 读取文件的全部内容
    pub fn read_file(&mut self, record: &DirectoryRecord) -> PdxResult<Vec<u8>> {
        let size = record.data_length as usize;
        let mut buf = vec![0u8; size];
        self.store
            .read_bytes(&mut buf, record.extent as usize, size)?;
        Ok(buf)
    }

    /// 将文件内容写到目标路径
    pub fn extract_file(&mut self, record: &DirectoryRecord, destination: &Path) -> PdxResult<()> {
        if record.is_directory() {
            return Err(PdxError::InvalidArgument(format!(
                "{} 是目录",
                record.identifier
            )));
        }
        let data = self.read_file(record)?;
        std::fs::write(destination, data)?;
        Ok(())
    }
}
