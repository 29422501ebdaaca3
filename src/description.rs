use std::time::{SystemTime, UNIX_EPOCH};

use bytemuck::cast_slice;
use serde::{Deserialize, Serialize};

/// 描述符位数
pub const DESCRIPTOR_BITS: usize = 256;

/// 单个二进制特征描述符
pub type Descriptor = [u8; DESCRIPTOR_BITS / 8];

/// 特征点
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct KeyPoint {
    pub x: f32,
    pub y: f32,
    pub size: f32,
    pub angle: f32,
    pub response: f32,
    pub octave: i32,
}

/// 特征提取结果：特征点、对应的描述符，以及整幅图像的直方图
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DescriptorSet {
    pub keypoints: Vec<KeyPoint>,
    pub descriptors: Vec<Descriptor>,
    pub histogram: Vec<f32>,
}

impl DescriptorSet {
    pub fn len(&self) -> usize {
        self.descriptors.len()
    }

    pub fn is_empty(&self) -> bool {
        self.descriptors.is_empty()
    }
}

/// 摄像头采集的原始图像
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Frame {
    pub width: u32,
    pub height: u32,
    pub channels: u8,
    pub data: Vec<u8>,
}

impl Frame {
    pub fn new(width: u32, height: u32, channels: u8, data: Vec<u8>) -> Self {
        Self { width, height, channels, data }
    }
}

/// 图像描述
///
/// 创建后不可变，在目录和工作线程之间通过 `Arc` 共享
#[derive(Debug, Clone, PartialEq)]
pub struct Description {
    id: String,
    descriptor_set: DescriptorSet,
    source_image: Option<Frame>,
}

impl Description {
    /// 使用新生成的 ID 创建描述
    pub fn new(descriptor_set: DescriptorSet) -> Self {
        let id = generate_id(&descriptor_set);
        Self { id, descriptor_set, source_image: None }
    }

    /// 使用已有 ID 创建描述，用于从磁盘加载
    pub fn with_id(id: impl Into<String>, descriptor_set: DescriptorSet) -> Self {
        Self { id: id.into(), descriptor_set, source_image: None }
    }

    /// 附加原始图像
    pub fn with_source_image(mut self, frame: Frame) -> Self {
        self.source_image = Some(frame);
        self
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn descriptor_set(&self) -> &DescriptorSet {
        &self.descriptor_set
    }

    pub fn source_image(&self) -> Option<&Frame> {
        self.source_image.as_ref()
    }
}

/// ID 为描述符内容与当前时间的 blake3 哈希的前 16 位十六进制
fn generate_id(descriptor_set: &DescriptorSet) -> String {
    let nanos = SystemTime::now().duration_since(UNIX_EPOCH).map(|d| d.as_nanos()).unwrap_or(0);
    let mut hasher = blake3::Hasher::new();
    hasher.update(cast_slice(&descriptor_set.descriptors));
    hasher.update(&nanos.to_le_bytes());
    hasher.finalize().to_hex().as_str()[..16].to_string()
}
