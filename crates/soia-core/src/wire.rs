//! 线格式底层：数字标签方案、写入器与带位置的读取器。
//!
//! # 设计意图（Why）
//! - 所有整型量（长度、槽位计数、变体编号、有符号/无符号数值）共享同一套
//!   单字节前缀方案：小数值直接以字面量字节表达，大数值由标签字节声明显式宽度；
//! - 跳过未识别数据时只需要知道每个标签的固定负载宽度，以及列表 / 结构体 /
//!   枚举形态标签的递归宽度，完全不需要理解数值语义。
//!
//! # 标签速览（What）
//! - `0..=231`：字面量无符号数值；
//! - `232`/`233`/`234`：后随 2/4/8 字节小端无符号数；
//! - `235`/`236`：小负数（值 − 256 / 值 − 65536）；
//! - `237`/`238`：4/8 字节小端有符号数；
//! - `239`：时间戳（8 字节小端毫秒）；
//! - `240`/`241`：IEEE-754 32/64 位浮点位型；
//! - `242..=245`：字符串 / 字节串（空与非空各一）；
//! - `246..=250`：列表与结构体槽位计数（0/1/2/3 项与显式长度）；
//! - `248`、`251..=254`：枚举带负载变体；`255`：可选类型的空值标记。
//!
//! # 风险提示（Trade-offs）
//! - `skip_value` 对嵌套形态递归下降，递归深度受输入嵌套深度约束；
//! - 读取器基于切片与显式游标，未识别字节段的捕获退化为一次切片截取。

use alloc::vec::Vec;

use crate::error::{Result, SoiaError, codes};

/// 写入器：在可增长缓冲上顺序产出小端线格式。
#[derive(Default, Debug)]
pub(crate) struct Writer {
    buf: Vec<u8>,
}

impl Writer {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    pub(crate) fn write_u8(&mut self, value: u8) {
        self.buf.push(value);
    }

    pub(crate) fn write_u16_le(&mut self, value: u16) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_u32_le(&mut self, value: u32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_u64_le(&mut self, value: u64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_i32_le(&mut self, value: i32) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_i64_le(&mut self, value: i64) {
        self.buf.extend_from_slice(&value.to_le_bytes());
    }

    pub(crate) fn write_slice(&mut self, bytes: &[u8]) {
        self.buf.extend_from_slice(bytes);
    }

    /// 按有符号 32 位阶梯编码：负数走 235/236/237 分支，非负走字面量与 232/233。
    pub(crate) fn encode_int32(&mut self, input: i32) {
        if input < 0 {
            if input >= -256 {
                self.write_u8(235);
                self.write_u8((input + 256) as u8);
            } else if input >= -65536 {
                self.write_u8(236);
                self.write_u16_le((input + 65536) as u16);
            } else {
                self.write_u8(237);
                self.write_i32_le(input);
            }
        } else if input < 232 {
            self.write_u8(input as u8);
        } else if input < 65536 {
            self.write_u8(232);
            self.write_u16_le(input as u16);
        } else {
            self.write_u8(233);
            self.write_u32_le(input as u32);
        }
    }

    /// 有符号 64 位：落在 32 位范围内复用 int32 阶梯，否则标签 238 + 8 字节。
    pub(crate) fn encode_int64(&mut self, input: i64) {
        if (i64::from(i32::MIN)..=i64::from(i32::MAX)).contains(&input) {
            self.encode_int32(input as i32);
        } else {
            self.write_u8(238);
            self.write_i64_le(input);
        }
    }

    /// 无符号 64 位使用自身的阈值阶梯：不存在负数分支，且在 2^32 处直接跳到
    /// 8 字节形态（标签 234），与 int64 的 238 路径刻意保持不同。
    pub(crate) fn encode_uint64(&mut self, input: u64) {
        if input < 232 {
            self.write_u8(input as u8);
        } else if input < 65536 {
            self.write_u8(232);
            self.write_u16_le(input as u16);
        } else if input < 0x1_0000_0000 {
            self.write_u8(233);
            self.write_u32_le(input as u32);
        } else {
            self.write_u8(234);
            self.write_u64_le(input);
        }
    }

    /// 长度前缀只复用非负分支：字面量 / 232 + u16 / 233 + u32。
    pub(crate) fn encode_length_prefix(&mut self, length: usize) -> Result<()> {
        if length < 232 {
            self.write_u8(length as u8);
        } else if length < 65536 {
            self.write_u8(232);
            self.write_u16_le(length as u16);
        } else if u64::try_from(length).unwrap_or(u64::MAX) <= u64::from(u32::MAX) {
            self.write_u8(233);
            self.write_u32_le(length as u32);
        } else {
            return Err(SoiaError::new(
                codes::ENCODE_LENGTH_OVERFLOW,
                "length exceeds the 32-bit length-prefix limit",
            ));
        }
        Ok(())
    }

    pub(crate) fn len(&self) -> usize {
        self.buf.len()
    }

    pub(crate) fn into_vec(self) -> Vec<u8> {
        self.buf
    }

    pub(crate) fn as_slice(&self) -> &[u8] {
        &self.buf
    }
}

/// 读取器：带显式游标的切片视图。
///
/// # 契约说明（What）
/// - 所有读取方法在缓冲耗尽时返回 `decode.buffer_underflow`，绝不越界；
/// - [`position`](Self::position) / [`slice_between`](Self::slice_between)
///   支撑未识别字节段的零拷贝定位：记录起始游标、跳过、再截取原切片区间。
#[derive(Debug)]
pub(crate) struct Reader<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Reader<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn position(&self) -> usize {
        self.pos
    }

    pub(crate) fn remaining(&self) -> usize {
        self.data.len() - self.pos
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.remaining() == 0
    }

    /// 截取两个游标之间的原始字节区间。
    pub(crate) fn slice_between(&self, start: usize, end: usize) -> &'a [u8] {
        &self.data[start..end]
    }

    fn underflow(&self, needed: usize) -> SoiaError {
        SoiaError::new(
            codes::DECODE_BUFFER_UNDERFLOW,
            alloc::format!(
                "need {needed} more byte(s) at offset {}, only {} left",
                self.pos,
                self.remaining()
            ),
        )
    }

    pub(crate) fn read_u8(&mut self) -> Result<u8> {
        let byte = *self
            .data
            .get(self.pos)
            .ok_or_else(|| self.underflow(1))?;
        self.pos += 1;
        Ok(byte)
    }

    pub(crate) fn peek_u8(&self) -> Result<u8> {
        self.data
            .get(self.pos)
            .copied()
            .ok_or_else(|| self.underflow(1))
    }

    pub(crate) fn read_exact(&mut self, len: usize) -> Result<&'a [u8]> {
        if self.remaining() < len {
            return Err(self.underflow(len));
        }
        let slice = &self.data[self.pos..self.pos + len];
        self.pos += len;
        Ok(slice)
    }

    pub(crate) fn skip(&mut self, len: usize) -> Result<()> {
        self.read_exact(len).map(|_| ())
    }

    pub(crate) fn read_u16_le(&mut self) -> Result<u16> {
        let bytes = self.read_exact(2)?;
        Ok(u16::from_le_bytes([bytes[0], bytes[1]]))
    }

    pub(crate) fn read_u32_le(&mut self) -> Result<u32> {
        let bytes = self.read_exact(4)?;
        Ok(u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]))
    }

    pub(crate) fn read_i32_le(&mut self) -> Result<i32> {
        Ok(self.read_u32_le()? as i32)
    }

    pub(crate) fn read_u64_le(&mut self) -> Result<u64> {
        let bytes = self.read_exact(8)?;
        let mut raw = [0u8; 8];
        raw.copy_from_slice(bytes);
        Ok(u64::from_le_bytes(raw))
    }

    pub(crate) fn read_i64_le(&mut self) -> Result<i64> {
        Ok(self.read_u64_le()? as i64)
    }
}

/// 数字标签解码结果，保留符号类别以便各原语按原样转换。
///
/// # 设计意图（Why）
/// - 同一个标签空间同时服务 int32/int64/uint64/浮点/时间戳，消费方需要知道
///   解出的数值属于哪一类，才能按位重释或数值转换得到与编码方一致的结果。
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum WireNumber {
    Signed(i64),
    Unsigned(u64),
    Float(f64),
}

impl WireNumber {
    /// 转为有符号 64 位：无符号按位重释，浮点向零截断并饱和。
    pub(crate) fn as_i64(self) -> i64 {
        match self {
            WireNumber::Signed(value) => value,
            WireNumber::Unsigned(value) => value as i64,
            WireNumber::Float(value) => value as i64,
        }
    }

    /// 转为有符号 32 位：整数取低 32 位，浮点向零截断并在 32 位范围饱和。
    pub(crate) fn as_i32(self) -> i32 {
        match self {
            WireNumber::Signed(value) => value as i32,
            WireNumber::Unsigned(value) => value as i32,
            WireNumber::Float(value) => value as i32,
        }
    }

    /// 转为无符号 64 位：有符号按位重释，浮点先截断为有符号再重释。
    pub(crate) fn as_u64(self) -> u64 {
        match self {
            WireNumber::Signed(value) => value as u64,
            WireNumber::Unsigned(value) => value,
            WireNumber::Float(value) => (value as i64) as u64,
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            WireNumber::Signed(value) => value as f64,
            WireNumber::Unsigned(value) => value as f64,
            WireNumber::Float(value) => value,
        }
    }

    pub(crate) fn is_zero(self) -> bool {
        match self {
            WireNumber::Signed(value) => value == 0,
            WireNumber::Unsigned(value) => value == 0,
            WireNumber::Float(value) => value == 0.0,
        }
    }

    /// 作为长度使用：拒绝负数与浮点形态。
    pub(crate) fn as_length(self) -> Result<usize> {
        match self {
            WireNumber::Signed(value) if value >= 0 => usize::try_from(value).map_err(|_| {
                SoiaError::new(codes::DECODE_LENGTH_OVERFLOW, "length exceeds usize range")
            }),
            WireNumber::Unsigned(value) => usize::try_from(value).map_err(|_| {
                SoiaError::new(codes::DECODE_LENGTH_OVERFLOW, "length exceeds usize range")
            }),
            WireNumber::Signed(value) => Err(SoiaError::new(
                codes::DECODE_LENGTH_OVERFLOW,
                alloc::format!("negative length: {value}"),
            )),
            WireNumber::Float(_) => Err(SoiaError::new(
                codes::DECODE_UNEXPECTED_WIRE,
                "float tag where a length was expected",
            )),
        }
    }
}

/// 解码一个数字标签及其负载。
///
/// # 契约说明（What）
/// - 仅接受标签 `0..=241`；字符串、字节串、列表等形态标签返回
///   `decode.unexpected_wire` 并在消息中注明偏移与字节值。
pub(crate) fn decode_number(reader: &mut Reader<'_>) -> Result<WireNumber> {
    let wire = reader.read_u8()?;
    match wire {
        0..=231 => Ok(WireNumber::Unsigned(u64::from(wire))),
        232 => Ok(WireNumber::Unsigned(u64::from(reader.read_u16_le()?))),
        233 => Ok(WireNumber::Unsigned(u64::from(reader.read_u32_le()?))),
        234 => Ok(WireNumber::Unsigned(reader.read_u64_le()?)),
        235 => Ok(WireNumber::Signed(i64::from(reader.read_u8()?) - 256)),
        236 => Ok(WireNumber::Signed(i64::from(reader.read_u16_le()?) - 65536)),
        237 => Ok(WireNumber::Signed(i64::from(reader.read_i32_le()?))),
        238 | 239 => Ok(WireNumber::Signed(reader.read_i64_le()?)),
        240 => Ok(WireNumber::Float(f64::from(f32::from_bits(
            reader.read_u32_le()?,
        )))),
        241 => Ok(WireNumber::Float(f64::from_bits(reader.read_u64_le()?))),
        _ => Err(SoiaError::new(
            codes::DECODE_UNEXPECTED_WIRE,
            alloc::format!("expected a number tag, wire byte: {wire}"),
        )),
    }
}

/// 跳过一个完整的值，不解释其语义。
///
/// # 执行逻辑（How）
/// - 定宽标签直接按宽度跳过；
/// - 字符串 / 字节串先读长度前缀再跳过负载；
/// - 列表与结构体计数标签递归跳过对应数量的子值；
/// - 枚举带负载标签（248、251..=254）递归跳过编号与负载。
pub(crate) fn skip_value(reader: &mut Reader<'_>) -> Result<()> {
    let wire = reader.read_u8()?;
    match wire {
        0..=231 => Ok(()),
        232 | 236 => reader.skip(2),
        233 | 237 | 240 => reader.skip(4),
        234 | 238 | 239 | 241 => reader.skip(8),
        235 => reader.skip(1),
        // 242 / 244：空字符串与空字节串，无负载。
        242 | 244 => Ok(()),
        243 | 245 => {
            let length = decode_number(reader)?.as_length()?;
            reader.skip(length)
        }
        246 => Ok(()),
        // 247：单项列表；251..=254：编号 1..=4 的带负载变体 —— 均为一个子值。
        247 | 251..=254 => skip_value(reader),
        // 248：双项列表，或 `248 + 编号 + 负载` 的带负载变体，两种形态都等价于
        // 连续两个子值。
        248 => {
            skip_value(reader)?;
            skip_value(reader)
        }
        249 => {
            skip_value(reader)?;
            skip_value(reader)?;
            skip_value(reader)
        }
        250 => {
            let count = decode_number(reader)?.as_length()?;
            for _ in 0..count {
                skip_value(reader)?;
            }
            Ok(())
        }
        // 255：可选类型的空值标记，无负载。
        255 => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use alloc::vec;

    fn encode_i32(value: i32) -> Vec<u8> {
        let mut writer = Writer::new();
        writer.encode_int32(value);
        writer.into_vec()
    }

    fn decode(bytes: &[u8]) -> WireNumber {
        let mut reader = Reader::new(bytes);
        let number = decode_number(&mut reader).expect("decode");
        assert!(reader.is_empty(), "decoder must consume the whole input");
        number
    }

    #[test]
    fn int32_ladder_thresholds() {
        // Why: 每条阶梯分支都必须在阈值两侧保持稳定的字节形态。
        assert_eq!(encode_i32(0), vec![0]);
        assert_eq!(encode_i32(231), vec![231]);
        assert_eq!(encode_i32(232), vec![232, 232, 0]);
        assert_eq!(encode_i32(65535), vec![232, 255, 255]);
        assert_eq!(encode_i32(65536), vec![233, 0, 0, 1, 0]);
        assert_eq!(encode_i32(-1), vec![235, 255]);
        assert_eq!(encode_i32(-256), vec![235, 0]);
        assert_eq!(encode_i32(-257), vec![236, 255, 254]);
        assert_eq!(encode_i32(-65536), vec![236, 0, 0]);
        assert_eq!(encode_i32(-65537), vec![237, 255, 255, 254, 255]);
    }

    #[test]
    fn int32_ladder_round_trips() {
        for value in [
            0, 1, 231, 232, 65535, 65536, i32::MAX, -1, -256, -257, -65536, -65537, i32::MIN,
        ] {
            assert_eq!(decode(&encode_i32(value)).as_i64(), i64::from(value));
        }
    }

    #[test]
    fn uint64_ladder_skips_the_238_path() {
        // Why: uint64 在 2^32 处直接进入 8 字节形态，与 int64 的 238 分支不同，
        //      该不对称是既有线上数据的一部分，必须逐字节锁定。
        let mut writer = Writer::new();
        writer.encode_uint64(u64::from(u32::MAX));
        assert_eq!(writer.as_slice()[0], 233);
        let mut writer = Writer::new();
        writer.encode_uint64(u64::from(u32::MAX) + 1);
        assert_eq!(writer.as_slice()[0], 234);
        let mut writer = Writer::new();
        writer.encode_uint64(u64::MAX);
        assert_eq!(decode(writer.as_slice()).as_u64(), u64::MAX);
    }

    #[test]
    fn int64_uses_238_outside_the_32_bit_range() {
        let mut writer = Writer::new();
        writer.encode_int64(i64::from(i32::MAX) + 1);
        assert_eq!(writer.as_slice()[0], 238);
        assert_eq!(
            decode(writer.as_slice()).as_i64(),
            i64::from(i32::MAX) + 1
        );
        let mut writer = Writer::new();
        writer.encode_int64(i64::from(i32::MIN));
        assert_eq!(writer.as_slice()[0], 237);
    }

    #[test]
    fn length_prefix_rejects_nothing_in_range() {
        let mut writer = Writer::new();
        writer.encode_length_prefix(3).expect("small length");
        writer.encode_length_prefix(70000).expect("u32 length");
        let mut reader = Reader::new(writer.as_slice());
        assert_eq!(decode_number(&mut reader).unwrap().as_length().unwrap(), 3);
        assert_eq!(
            decode_number(&mut reader).unwrap().as_length().unwrap(),
            70000
        );
    }

    #[test]
    fn skip_value_handles_nested_shapes() {
        // How: 构造 [i32, "ab", [1, 2]] 三个连续值，逐个跳过后缓冲应恰好耗尽。
        let mut writer = Writer::new();
        writer.encode_int32(-70000);
        writer.write_u8(243);
        writer.encode_length_prefix(2).unwrap();
        writer.write_slice(b"ab");
        writer.write_u8(248);
        writer.encode_int32(1);
        writer.encode_int32(2);
        let bytes = writer.into_vec();
        let mut reader = Reader::new(&bytes);
        skip_value(&mut reader).unwrap();
        skip_value(&mut reader).unwrap();
        skip_value(&mut reader).unwrap();
        assert!(reader.is_empty());
    }

    #[test]
    fn underflow_is_reported_with_offset() {
        let mut reader = Reader::new(&[233, 1]);
        let err = decode_number(&mut reader).unwrap_err();
        assert_eq!(err.code(), codes::DECODE_BUFFER_UNDERFLOW);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn int32_ladder_is_lossless(value in any::<i32>()) {
                prop_assert_eq!(decode(&encode_i32(value)).as_i32(), value);
            }

            #[test]
            fn int64_ladder_is_lossless(value in any::<i64>()) {
                let mut writer = Writer::new();
                writer.encode_int64(value);
                prop_assert_eq!(decode(writer.as_slice()).as_i64(), value);
            }

            #[test]
            fn uint64_ladder_is_lossless(value in any::<u64>()) {
                let mut writer = Writer::new();
                writer.encode_uint64(value);
                prop_assert_eq!(decode(writer.as_slice()).as_u64(), value);
            }

            #[test]
            fn skip_value_consumes_exactly_one_int(value in any::<i32>()) {
                let bytes = encode_i32(value);
                let mut reader = Reader::new(&bytes);
                skip_value(&mut reader).unwrap();
                prop_assert!(reader.is_empty());
            }
        }
    }
}
