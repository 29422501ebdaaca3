use std::convert::Infallible;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use log::{info, warn};
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::description::{Description, DescriptorSet, Frame};
use crate::error::{Error, Result};

const DESCRIPTION_MAGIC: &[u8; 4] = b"LHDS";
const FRAME_MAGIC: &[u8; 4] = b"LHFR";
const FORMAT_VERSION: u16 = 1;
const HEADER_LEN: usize = 6;

/// 与图像描述相关、但分别管理的资源文件
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Asset {
    /// 图像描述的二进制数据（ID、特征点、描述符、直方图）
    Data,
    /// 语音标签
    VoiceLabel,
    /// 提取描述时使用的原始图像
    SourceImage,
}

impl Asset {
    pub fn file_name(self) -> &'static str {
        match self {
            Self::Data => "description.bin",
            Self::VoiceLabel => "voice-label.aiff",
            Self::SourceImage => "frame.bin",
        }
    }
}

/// 数据目录，每个图像描述占用一个以 ID 命名的子目录
#[derive(Debug, Clone)]
pub struct DataDir {
    path: PathBuf,
}

impl DataDir {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        self.path.as_path()
    }

    /// 创建数据目录
    pub fn create(&self) -> Result<()> {
        fs::create_dir_all(&self.path)?;
        Ok(())
    }

    /// 返回图像描述所在目录
    pub fn description_dir(&self, id: &str) -> PathBuf {
        self.path.join(id)
    }

    /// 返回图像描述资源文件的路径
    pub fn asset(&self, id: &str, asset: Asset) -> PathBuf {
        self.description_dir(id).join(asset.file_name())
    }

    /// 返回所有子目录，按名称排序
    pub fn subfolders(&self) -> Vec<PathBuf> {
        WalkDir::new(&self.path)
            .min_depth(1)
            .max_depth(1)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|entry| {
                entry.inspect_err(|e| warn!("无法读取数据目录 {}: {}", self.path.display(), e)).ok()
            })
            .filter(|entry| entry.file_type().is_dir())
            .map(|entry| entry.into_path())
            .collect()
    }

    /// 保存图像描述到对应的子目录
    pub fn save(&self, description: &Description) -> Result<()> {
        save(description, self.description_dir(description.id()))
    }

    /// 扫描数据目录并加载所有图像描述，损坏的条目会被跳过
    pub fn load_all(&self) -> LoadReport {
        let mut report = LoadReport::default();
        for folder in self.subfolders() {
            match load(&folder) {
                Ok(description) => report.loaded.push(description),
                Err(e) => {
                    warn!("无法加载 {}，跳过: {}", folder.display(), e);
                    report.skipped.push((folder, e));
                }
            }
        }
        info!("已加载 {} 个图像描述，跳过 {} 个", report.loaded.len(), report.skipped.len());
        report
    }
}

impl FromStr for DataDir {
    type Err = Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(Self::new(s))
    }
}

/// 启动加载的结果
#[derive(Debug, Default)]
pub struct LoadReport {
    pub loaded: Vec<Description>,
    pub skipped: Vec<(PathBuf, Error)>,
}

#[derive(Serialize)]
struct RecordRef<'a> {
    id: &'a str,
    descriptor_set: &'a DescriptorSet,
}

#[derive(Deserialize)]
struct Record {
    id: String,
    descriptor_set: DescriptorSet,
}

/// 从目录中加载图像描述
pub fn load(folder: impl AsRef<Path>) -> Result<Description> {
    let folder = folder.as_ref();
    let data_path = folder.join(Asset::Data.file_name());
    let record: Record = read_record(&data_path, DESCRIPTION_MAGIC)?;

    let set = &record.descriptor_set;
    if set.is_empty() {
        return Err(Error::corrupt(&data_path, "描述符为空"));
    }
    if set.keypoints.len() != set.descriptors.len() {
        return Err(Error::corrupt(&data_path, "特征点与描述符数量不一致"));
    }
    if folder.file_name().is_some_and(|name| name != record.id.as_str()) {
        return Err(Error::corrupt(&data_path, format!("ID {} 与目录名不一致", record.id)));
    }

    let mut description = Description::with_id(record.id, record.descriptor_set);
    let frame_path = folder.join(Asset::SourceImage.file_name());
    if frame_path.is_file() {
        let frame: Frame = read_record(&frame_path, FRAME_MAGIC)?;
        description = description.with_source_image(frame);
    }
    Ok(description)
}

/// 保存图像描述到目录
///
/// 原始图像先于描述写入，描述文件存在即代表记录完整
pub fn save(description: &Description, folder: impl AsRef<Path>) -> Result<()> {
    let folder = folder.as_ref();
    fs::create_dir_all(folder)?;

    if let Some(frame) = description.source_image() {
        write_record(&folder.join(Asset::SourceImage.file_name()), FRAME_MAGIC, frame)?;
    }

    let record = RecordRef { id: description.id(), descriptor_set: description.descriptor_set() };
    write_record(&folder.join(Asset::Data.file_name()), DESCRIPTION_MAGIC, &record)
}

fn read_record<T: for<'de> Deserialize<'de>>(path: &Path, magic: &[u8; 4]) -> Result<T> {
    let data = fs::read(path)?;
    if data.len() < HEADER_LEN || &data[..4] != magic {
        return Err(Error::corrupt(path, "文件头无效"));
    }
    let version = u16::from_le_bytes([data[4], data[5]]);
    if version != FORMAT_VERSION {
        return Err(Error::corrupt(path, format!("不支持的版本 {}", version)));
    }
    bincode::deserialize(&data[HEADER_LEN..]).map_err(|e| Error::corrupt(path, e))
}

/// 先写入临时文件，同步后再重命名，避免留下写了一半的文件
fn write_record<T: Serialize>(path: &Path, magic: &[u8; 4], value: &T) -> Result<()> {
    let payload = bincode::serialize(value).map_err(io::Error::other)?;
    let tmp_path = path.with_extension("tmp");
    {
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(magic)?;
        file.write_all(&FORMAT_VERSION.to_le_bytes())?;
        file.write_all(&payload)?;
        file.sync_all()?;
    }
    fs::rename(&tmp_path, path)?;
    Ok(())
}
