use std::fs;
use std::path::Path;
use std::str::FromStr;

use crate::error::{TopologyError, TopologyResult};

/// Reads a pseudo-file and strips the trailing newline the kernel appends.
pub fn read_trimmed(path: &Path) -> TopologyResult<String> {
    let content = fs::read_to_string(path).map_err(|e| TopologyError::io_at(path, e))?;
    Ok(content.trim().to_string())
}

pub fn read_int<T: FromStr>(path: &Path) -> TopologyResult<T> {
    let content = read_trimmed(path)?;
    content.parse::<T>().map_err(|_| TopologyError::Parse {
        path: path.to_path_buf(),
        value: content,
    })
}

/// Reads a hex value such as `0x8086`. The `0x` prefix is optional.
pub fn read_hex_u32(path: &Path) -> TopologyResult<u32> {
    let content = read_trimmed(path)?;
    let digits = content
        .strip_prefix("0x")
        .or_else(|| content.strip_prefix("0X"))
        .unwrap_or(&content);
    u32::from_str_radix(digits, 16).map_err(|_| TopologyError::Parse {
        path: path.to_path_buf(),
        value: content.clone(),
    })
}

/// Parse a kernel list-format string like "0-3,5,7-8" into a sorted Vec of values.
pub fn parse_list_format(s: &str) -> TopologyResult<Vec<u32>> {
    let s = s.trim();
    if s.is_empty() {
        return Ok(Vec::new());
    }
    let mut result = Vec::new();
    for part in s.split(',') {
        let part = part.trim();
        if let Some((start, end)) = part.split_once('-') {
            let start: u32 = start
                .trim()
                .parse()
                .map_err(|e| TopologyError::InvalidList(format!("range start '{start}': {e}")))?;
            let end: u32 = end
                .trim()
                .parse()
                .map_err(|e| TopologyError::InvalidList(format!("range end '{end}': {e}")))?;
            if start > end {
                return Err(TopologyError::InvalidList(format!("range {start}-{end}")));
            }
            result.extend(start..=end);
        } else {
            let val: u32 = part
                .parse()
                .map_err(|e| TopologyError::InvalidList(format!("value '{part}': {e}")))?;
            result.push(val);
        }
    }
    result.sort_unstable();
    result.dedup();
    Ok(result)
}
