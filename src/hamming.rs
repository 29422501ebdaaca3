use bytemuck::cast_slice;

use crate::description::{DESCRIPTOR_BITS, Descriptor};

#[inline(always)]
pub fn hamming<const N: usize>(va: &[u8], vb: &[u8]) -> u32 {
    match N {
        256 => hamming_256(va, vb),
        _ => hamming_naive::<N>(va, vb),
    }
}

#[inline(always)]
pub fn hamming_naive<const N: usize>(va: &[u8], vb: &[u8]) -> u32 {
    let mut sum = 0;
    for i in 0..N / 8 {
        sum += (va[i] ^ vb[i]).count_ones();
    }
    sum
}

#[inline(always)]
pub fn hamming_256(va: &[u8], vb: &[u8]) -> u32 {
    // 描述符来自 Vec<[u8; 32]>，不保证 8 字节对齐，所以这里逐字读取
    let mut sum = 0;
    for (a, b) in va.chunks_exact(8).zip(vb.chunks_exact(8)) {
        let a = u64::from_le_bytes(a.try_into().unwrap_or_default());
        let b = u64::from_le_bytes(b.try_into().unwrap_or_default());
        sum += (a ^ b).count_ones();
    }
    sum
}

/// 计算向量 va 和 vb 的汉明距离，并返回距离最小的 k 个索引和距离
///
/// 参数：
/// - va: N 位的向量 va
/// - vb: 若干组 N 位的向量 vb
/// - k: 返回的最近邻居数量
pub fn knn_hamming<const N: usize>(va: &[u8], vb: &[u8], k: usize) -> (Vec<usize>, Vec<u32>) {
    assert!(k <= 8, "k must be less than 8");
    let mut dis = [u32::MAX; 8];
    let mut idx = [0; 8];
    for (i, chunk) in vb.chunks_exact(N / 8).enumerate() {
        let d = hamming::<N>(va, chunk);
        if d > dis[0] {
            continue;
        }
        // 此处维护一个长度为 K 的单调递减数组
        // 寻找插入点时，从后往前遍历
        // 插入时，将前面的元素向左移动，保证最大的元素在前面
        for j in (0..k).rev() {
            if d < dis[j] {
                dis[..=j].rotate_left(1);
                dis[j] = d;
                idx[..=j].rotate_left(1);
                idx[j] = i;
                break;
            }
        }
    }
    idx.into_iter().zip(dis).filter(|(_, d)| *d != u32::MAX).rev().take(k).unzip()
}

/// 查询描述符在候选集合中的最近和次近距离
///
/// 候选集合为空时返回 None，只有一个候选时次近距离为 None
pub fn nearest_two(query: &Descriptor, candidates: &[Descriptor]) -> Option<(u32, Option<u32>)> {
    let (_, dis) = knn_hamming::<DESCRIPTOR_BITS>(query, cast_slice(candidates), 2);
    match dis.as_slice() {
        [] => None,
        [d0] => Some((*d0, None)),
        [d0, d1, ..] => Some((*d0, Some(*d1))),
    }
}
