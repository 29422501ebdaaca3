use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use crate::config::MatchingOptions;
use crate::description::{Description, DescriptorSet};
use crate::error::{Error, Result};
use crate::hamming::nearest_two;

/// 一条匹配结果：(分数, 图像描述)
pub type Match = (f32, Arc<Description>);

/// 两组描述符之间的相似度，越大越相似
pub trait Similarity: Send + Sync {
    fn score(&self, query: &DescriptorSet, candidate: &DescriptorSet) -> f32;
}

/// 比率测试的特征匹配与直方图相关性的加权组合，分数范围 0 到 1
#[derive(Debug, Clone)]
pub struct OrbSimilarity {
    pub ratio: f32,
    pub distance: u32,
    pub histogram_weight: f32,
}

impl From<&MatchingOptions> for OrbSimilarity {
    fn from(opts: &MatchingOptions) -> Self {
        Self {
            ratio: opts.ratio,
            distance: opts.distance,
            histogram_weight: opts.histogram_weight.clamp(0., 1.),
        }
    }
}

impl OrbSimilarity {
    /// 通过比率测试的查询描述符所占比例
    fn feature_score(&self, query: &DescriptorSet, candidate: &DescriptorSet) -> f32 {
        if query.is_empty() {
            return 0.;
        }
        let good = query
            .descriptors
            .iter()
            .filter(|des| match nearest_two(des, &candidate.descriptors) {
                Some((d0, None)) => d0 <= self.distance,
                Some((d0, Some(d1))) => d0 <= self.distance && (d0 as f32) < self.ratio * d1 as f32,
                None => false,
            })
            .count();
        good as f32 / query.len() as f32
    }
}

impl Similarity for OrbSimilarity {
    fn score(&self, query: &DescriptorSet, candidate: &DescriptorSet) -> f32 {
        let feature = self.feature_score(query, candidate);
        let histogram = (correlation(&query.histogram, &candidate.histogram) + 1.) / 2.;
        (1. - self.histogram_weight) * feature + self.histogram_weight * histogram
    }
}

/// 两个直方图的皮尔逊相关系数，长度不同或方差为零时返回 -1
pub fn correlation(ha: &[f32], hb: &[f32]) -> f32 {
    if ha.len() != hb.len() || ha.is_empty() {
        return -1.;
    }
    let n = ha.len() as f64;
    let mean_a = ha.iter().map(|&v| v as f64).sum::<f64>() / n;
    let mean_b = hb.iter().map(|&v| v as f64).sum::<f64>() / n;
    let (mut cov, mut var_a, mut var_b) = (0., 0., 0.);
    for (&a, &b) in ha.iter().zip(hb) {
        let (da, db) = (a as f64 - mean_a, b as f64 - mean_b);
        cov += da * db;
        var_a += da * da;
        var_b += db * db;
    }
    let denom = (var_a * var_b).sqrt();
    if denom <= f64::EPSILON {
        return -1.;
    }
    (cov / denom).clamp(-1., 1.) as f32
}

/// 内存中的图像描述目录
///
/// 保留插入顺序，分数相同时先插入的排在前面
pub struct Catalog {
    entries: Vec<Arc<Description>>,
    positions: HashMap<String, usize>,
    similarity: Arc<dyn Similarity>,
    min_score: f32,
}

impl Catalog {
    pub fn new(opts: &MatchingOptions) -> Self {
        Self::with_similarity(Arc::new(OrbSimilarity::from(opts)), opts.min_score)
    }

    pub fn with_similarity(similarity: Arc<dyn Similarity>, min_score: f32) -> Self {
        Self { entries: vec![], positions: HashMap::new(), similarity, min_score }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// 按插入顺序遍历
    pub fn iter(&self) -> impl Iterator<Item = &Arc<Description>> {
        self.entries.iter()
    }

    /// 插入图像描述，ID 已存在时覆盖旧的记录并保留原来的位置
    ///
    /// 返回是否为新插入
    pub fn insert(&mut self, description: Description) -> bool {
        let description = Arc::new(description);
        match self.positions.get(description.id()) {
            Some(&pos) => {
                self.entries[pos] = description;
                false
            }
            None => {
                self.positions.insert(description.id().to_owned(), self.entries.len());
                self.entries.push(description);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Result<Arc<Description>> {
        self.positions
            .get(id)
            .map(|&pos| self.entries[pos].clone())
            .ok_or_else(|| Error::NotFound(id.to_owned()))
    }

    /// 计算查询与所有条目的相似度，按分数从高到低排序
    pub fn find_matches(&self, query: &Description) -> Vec<Match> {
        let query = query.descriptor_set();
        // NOTE: par_iter + collect 保持原有顺序，后面的稳定排序依赖这一点
        let mut results = self
            .entries
            .par_iter()
            .map(|entry| (self.similarity.score(query, entry.descriptor_set()), entry.clone()))
            .filter(|(score, _)| score.is_finite() && *score >= self.min_score)
            .collect::<Vec<_>>();
        results.sort_by(|a, b| b.0.total_cmp(&a.0));
        results
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::description::KeyPoint;

    const KP: KeyPoint = KeyPoint { x: 0., y: 0., size: 31., angle: 0., response: 1., octave: 0 };

    fn set(descriptors: Vec<[u8; 32]>, histogram: Vec<f32>) -> DescriptorSet {
        DescriptorSet { keypoints: vec![KP; descriptors.len()], descriptors, histogram }
    }

    /// 根据候选描述的第一个描述符的首字节查表打分
    struct TableSimilarity(HashMap<u8, f32>);

    impl Similarity for TableSimilarity {
        fn score(&self, _query: &DescriptorSet, candidate: &DescriptorSet) -> f32 {
            self.0[&candidate.descriptors[0][0]]
        }
    }

    fn table_catalog(scores: &[(u8, f32)]) -> Catalog {
        let table = TableSimilarity(scores.iter().copied().collect());
        Catalog::with_similarity(Arc::new(table), 0.)
    }

    fn tagged(id: &str, tag: u8) -> Description {
        Description::with_id(id, set(vec![[tag; 32]], vec![1., 2.]))
    }

    #[test]
    fn test_ranked_by_score() {
        let mut catalog = table_catalog(&[(1, 0.74), (2, 0.91)]);
        catalog.insert(tagged("B", 1));
        catalog.insert(tagged("A", 2));

        let result = catalog.find_matches(&tagged("query", 0));
        let result: Vec<_> = result.iter().map(|(s, d)| (*s, d.id())).collect();
        assert_eq!(result, vec![(0.91, "A"), (0.74, "B")]);
    }

    #[test]
    fn test_ties_keep_insertion_order() {
        let mut catalog = table_catalog(&[(1, 0.5), (2, 0.5), (3, 0.8)]);
        catalog.insert(tagged("first", 1));
        catalog.insert(tagged("second", 2));
        catalog.insert(tagged("best", 3));

        let ids: Vec<_> =
            catalog.find_matches(&tagged("q", 0)).iter().map(|(_, d)| d.id().to_owned()).collect();
        assert_eq!(ids, vec!["best", "first", "second"]);
    }

    #[test]
    fn test_empty_catalog() {
        let catalog = Catalog::new(&MatchingOptions::default());
        assert!(catalog.find_matches(&tagged("q", 0)).is_empty());
    }

    #[test]
    fn test_insert_overwrites() {
        let mut catalog = table_catalog(&[(1, 0.1), (2, 0.2), (9, 0.9)]);
        assert!(catalog.insert(tagged("a", 1)));
        assert!(catalog.insert(tagged("b", 2)));
        assert!(!catalog.insert(tagged("a", 9)));

        assert_eq!(catalog.len(), 2);
        assert_eq!(catalog.get("a").unwrap().descriptor_set().descriptors[0][0], 9);
        let ids: Vec<_> = catalog.iter().map(|d| d.id().to_owned()).collect();
        assert_eq!(ids, vec!["a", "b"]);
    }

    #[test]
    fn test_get_not_found() {
        let catalog = table_catalog(&[]);
        assert!(matches!(catalog.get("missing"), Err(Error::NotFound(id)) if id == "missing"));
    }

    #[test]
    fn test_min_score_filter() {
        let table = TableSimilarity([(1, 0.2), (2, 0.6)].into_iter().collect());
        let mut catalog = Catalog::with_similarity(Arc::new(table), 0.5);
        catalog.insert(tagged("low", 1));
        catalog.insert(tagged("high", 2));
        let result = catalog.find_matches(&tagged("q", 0));
        assert_eq!(result.len(), 1);
        assert_eq!(result[0].1.id(), "high");
    }

    #[test]
    fn test_orb_similarity_prefers_same_descriptors() {
        let opts = MatchingOptions::default();
        let mut catalog = Catalog::new(&opts);

        let same: Vec<[u8; 32]> = (0..16u8).map(|i| [i.wrapping_mul(37); 32]).collect();
        let other: Vec<[u8; 32]> = (0..16u8).map(|i| [i.wrapping_mul(53) ^ 0x5a; 32]).collect();
        catalog.insert(Description::with_id("other", set(other, vec![4., 3., 2., 1.])));
        catalog.insert(Description::with_id("same", set(same.clone(), vec![1., 2., 3., 4.])));

        let query = Description::with_id("q", set(same, vec![1., 2., 3., 4.]));
        let result = catalog.find_matches(&query);
        assert_eq!(result.len(), 2);
        assert_eq!(result[0].1.id(), "same");
        assert!((result[0].0 - 1.).abs() < 1e-6);
        assert!(result[0].0 > result[1].0);
    }

    #[test]
    fn test_find_matches_deterministic() {
        let opts = MatchingOptions::default();
        let mut catalog = Catalog::new(&opts);
        for i in 0..20u8 {
            let des: Vec<[u8; 32]> = (0..8u8).map(|j| [i ^ j.wrapping_mul(31); 32]).collect();
            catalog.insert(Description::with_id(format!("d{i}"), set(des, vec![i as f32, 1., 2.])));
        }
        let query = Description::with_id("q", set(vec![[3; 32], [17; 32]], vec![1., 1., 2.]));

        let first = catalog.find_matches(&query);
        for _ in 0..5 {
            let again = catalog.find_matches(&query);
            let a: Vec<_> = first.iter().map(|(s, d)| (*s, d.id())).collect();
            let b: Vec<_> = again.iter().map(|(s, d)| (*s, d.id())).collect();
            assert_eq!(a, b);
        }
        assert!(first.windows(2).all(|w| w[0].0 >= w[1].0));
    }

    #[test]
    fn test_correlation() {
        assert!((correlation(&[1., 2., 3.], &[2., 4., 6.]) - 1.).abs() < 1e-6);
        assert!((correlation(&[1., 2., 3.], &[3., 2., 1.]) + 1.).abs() < 1e-6);
        assert_eq!(correlation(&[1., 2.], &[1., 2., 3.]), -1.);
        assert_eq!(correlation(&[1., 1.], &[1., 2.]), -1.);
    }
}
