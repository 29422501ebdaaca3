use std::sync::Arc;

use log::debug;

use crate::catalog::{Catalog, Match};
use crate::config::MatchingOptions;
use crate::description::{Description, DescriptorSet, Frame};
use crate::error::{Error, Result};

/// 特征提取器，将原始图像转换为描述符
///
/// 提取算法本身不在本库范围内
pub trait Extractor: Send + Sync {
    /// 特征不足时应返回 `Error::Quality`
    fn describe(&self, frame: &Frame) -> Result<DescriptorSet>;
}

impl<F> Extractor for F
where
    F: Fn(&Frame) -> Result<DescriptorSet> + Send + Sync,
{
    fn describe(&self, frame: &Frame) -> Result<DescriptorSet> {
        self(frame)
    }
}

/// 图像匹配器：特征提取 + 图像描述目录
pub struct ImageMatcher {
    catalog: Catalog,
    extractor: Arc<dyn Extractor>,
    min_keypoints: usize,
}

impl ImageMatcher {
    pub fn new(opts: &MatchingOptions, extractor: Arc<dyn Extractor>) -> Self {
        Self::with_catalog(Catalog::new(opts), extractor, opts.min_keypoints as usize)
    }

    pub fn with_catalog(
        catalog: Catalog,
        extractor: Arc<dyn Extractor>,
        min_keypoints: usize,
    ) -> Self {
        Self { catalog, extractor, min_keypoints }
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    /// 从图像中提取描述，特征不足时返回 `Error::Quality`
    pub fn describe(&self, frame: &Frame) -> Result<Description> {
        let set = self.extractor.describe(frame)?;
        check_quality(&set, self.min_keypoints)?;
        debug!("extracted {} descriptors from {}x{} frame", set.len(), frame.width, frame.height);
        Ok(Description::new(set))
    }

    pub fn insert(&mut self, description: Description) -> bool {
        self.catalog.insert(description)
    }

    pub fn get(&self, id: &str) -> Result<Arc<Description>> {
        self.catalog.get(id)
    }

    pub fn find_matches(&self, description: &Description) -> Vec<Match> {
        self.catalog.find_matches(description)
    }

    pub fn find_matches_frame(&self, frame: &Frame) -> Result<Vec<Match>> {
        Ok(self.find_matches(&self.describe(frame)?))
    }
}

fn check_quality(set: &DescriptorSet, min_keypoints: usize) -> Result<()> {
    if set.is_empty() || set.len() < min_keypoints {
        return Err(Error::Quality(format!("特征点少于 {}: {}", min_keypoints, set.len())));
    }
    if set.keypoints.len() != set.descriptors.len() {
        return Err(Error::Quality("特征点与描述符数量不一致".to_owned()));
    }
    if set.histogram.iter().any(|v| !v.is_finite()) || set.histogram.iter().all(|&v| v == 0.) {
        return Err(Error::Quality("直方图无效".to_owned()));
    }
    Ok(())
}
