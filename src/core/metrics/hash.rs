//! 差值哈希 (dhash) 及哈希数字向量之间的距离
//!
//! 哈希值按十进制展开成数字序列，只保留前 15 位。下游分类模型就是用这种
//! 数字序列训练的，编码方式不能改成位数组。

use super::error::MetricsError;
use super::frame::Frame;
use image::imageops::{self, FilterType};
use serde::{Deserialize, Serialize};

/// 保留的十进制位数
pub const HASH_DIGITS: usize = 15;

/// 哈希网格的采样方式
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HashGrid {
    /// 把交错样本缓冲区直接重排成网格（不足时循环重复，超出时截断）
    #[default]
    Reshape,
    /// V 通道平面双线性缩放到网格尺寸
    Interpolate,
}

/// 计算 dhash 数字序列（最多 15 位，每位 0-9）
///
/// 网格为 `hash_size + 1` 行 × `hash_size` 列，每行相邻两列比较得到
/// `(hash_size + 1) × (hash_size - 1)` 个比特，第 k 个比特权重为 2^k。
pub fn dhash(frame: &Frame, hash_size: u32, grid: HashGrid) -> Result<Vec<u8>, MetricsError> {
    if hash_size < 2 {
        return Err(MetricsError::InvalidConfig(format!(
            "hash_size must be at least 2, got {}",
            hash_size
        )));
    }
    frame.validate()?;

    let rows = hash_size as usize + 1;
    let cols = hash_size as usize;

    let samples: Vec<u8> = match grid {
        HashGrid::Reshape => frame.data.iter().copied().cycle().take(rows * cols).collect(),
        HashGrid::Interpolate => {
            let plane = frame.value_plane()?;
            imageops::resize(&plane, cols as u32, rows as u32, FilterType::Triangle).into_raw()
        }
    };

    let bits: Vec<bool> = samples
        .chunks_exact(cols)
        .flat_map(|row| row.windows(2).map(|pair| pair[1] > pair[0]))
        .collect();

    Ok(leading_decimal_digits(&bits, HASH_DIGITS))
}

/// `Σ bits[k]·2^k` 的十进制前 `max_digits` 位
///
/// 比特数随 hash_size 平方增长（默认 255 位），用 10^9 进制的小端 limb 累加。
fn leading_decimal_digits(bits: &[bool], max_digits: usize) -> Vec<u8> {
    const BASE: u64 = 1_000_000_000;

    let mut limbs: Vec<u64> = vec![0];
    for &bit in bits.iter().rev() {
        let mut carry = bit as u64;
        for limb in limbs.iter_mut() {
            let value = *limb * 2 + carry;
            *limb = value % BASE;
            carry = value / BASE;
        }
        if carry > 0 {
            limbs.push(carry);
        }
    }

    let mut text = String::with_capacity(limbs.len() * 9);
    let mut iter = limbs.iter().rev();
    if let Some(top) = iter.next() {
        text.push_str(&top.to_string());
    }
    for limb in iter {
        text.push_str(&format!("{:09}", limb));
    }

    text.bytes().take(max_digits).map(|b| b - b'0').collect()
}

/// 长度不同时短的一方在末尾补 0
fn padded(u: &[u8], v: &[u8]) -> (Vec<f64>, Vec<f64>) {
    let len = u.len().max(v.len());
    let widen = |digits: &[u8]| -> Vec<f64> {
        let mut out: Vec<f64> = digits.iter().map(|&d| d as f64).collect();
        out.resize(len, 0.0);
        out
    };
    (widen(u), widen(v))
}

pub fn euclidean_distance(u: &[u8], v: &[u8]) -> f64 {
    let (u, v) = padded(u, v);
    u.iter()
        .zip(v.iter())
        .map(|(a, b)| (a - b).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// 不同位置所占比例
pub fn hamming_distance(u: &[u8], v: &[u8]) -> f64 {
    let (u, v) = padded(u, v);
    if u.is_empty() {
        return 0.0;
    }
    let differing = u.iter().zip(v.iter()).filter(|(a, b)| a != b).count();
    differing as f64 / u.len() as f64
}

pub fn cosine_distance(u: &[u8], v: &[u8]) -> f64 {
    let (u, v) = padded(u, v);
    if u == v {
        return 0.0;
    }

    let dot: f64 = u.iter().zip(v.iter()).map(|(a, b)| a * b).sum();
    let norm_u = u.iter().map(|a| a * a).sum::<f64>().sqrt();
    let norm_v = v.iter().map(|b| b * b).sum::<f64>().sqrt();

    if norm_u == 0.0 || norm_v == 0.0 {
        return 1.0;
    }
    (1.0 - dot / (norm_u * norm_v)).clamp(0.0, 2.0)
}
