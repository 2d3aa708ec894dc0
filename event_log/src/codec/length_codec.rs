//! MySQL 协议的 length-encoded integer。
//!
//! 编码宽度只取决于数值大小：
//! - `v < 251`：1 字节，值内联
//! - `v < 2^16`：`0xFC` + 小端 2 字节
//! - `v < 2^24`：`0xFD` + 小端 3 字节
//! - 其余：`0xFE` + 小端 8 字节

use byteorder::{LittleEndian, ReadBytesExt};

use common::err::CResult;
use common::err::log_error::LogError;

/// `write_encoded` 将要写出的字节数
pub fn encoded_len(v: u64) -> u8 {
    if v < 251 {
        1
    } else if v < 65_536 {
        3
    } else if v < 16_777_216 {
        4
    } else {
        9
    }
}

/// 追加编码后的字节
pub fn write_encoded(buf: &mut Vec<u8>, v: u64) {
    match encoded_len(v) {
        1 => buf.push(v as u8),
        3 => {
            buf.push(0xFC);
            buf.extend_from_slice(&(v as u16).to_le_bytes());
        }
        4 => {
            buf.push(0xFD);
            buf.extend_from_slice(&(v as u32).to_le_bytes()[..3]);
        }
        _ => {
            buf.push(0xFE);
            buf.extend_from_slice(&v.to_le_bytes());
        }
    }
}

/// 解码一个 length-encoded integer，返回（消耗的字节数，值）
pub fn read_encoded(input: &[u8]) -> CResult<(usize, u64)> {
    let first = *input
        .first()
        .ok_or_else(|| LogError::Incomplete("empty length-encoded integer".to_string()))?;
    match first {
        0xFC => {
            let mut rest = input
                .get(1..3)
                .ok_or_else(|| LogError::Incomplete("short 2-byte integer".to_string()))?;
            Ok((3, rest.read_u16::<LittleEndian>()? as u64))
        }
        0xFD => {
            let mut rest = input
                .get(1..4)
                .ok_or_else(|| LogError::Incomplete("short 3-byte integer".to_string()))?;
            Ok((4, rest.read_u24::<LittleEndian>()? as u64))
        }
        0xFE => {
            let mut rest = input
                .get(1..9)
                .ok_or_else(|| LogError::Incomplete("short 8-byte integer".to_string()))?;
            Ok((9, rest.read_u64::<LittleEndian>()?))
        }
        0xFB | 0xFF => Err(LogError::InvalidData(format!(
            "unexpected length prefix byte 0x{:02X}",
            first
        ))),
        v => Ok((1, v as u64)),
    }
}
