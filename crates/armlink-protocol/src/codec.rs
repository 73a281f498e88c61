//! 文本编解码
//!
//! 编码：记录 → 以空格分隔的整数 + 换行符。
//!
//! 解码：在多次读取之间维护滚动缓冲区，扫描数值 token（可选前导 `-` + 数字），
//! token 之间以 ASCII 空白分隔。收集满一条记录的字段后立即产出记录，
//! 未消费的尾部保留到下一次调用。
//!
//! 解码器对分块边界不敏感：同一字节流无论如何切分，产出的记录序列和错误序列都相同。
//! 为此，位于缓冲区末尾的 token 必须等到后续分隔符到达后才被接受。

use crate::ProtocolError;
use crate::constants::{FIELD_SEPARATOR, MESSAGE_TERMINATOR};
use bytes::{Buf, BufMut, Bytes, BytesMut};
use smallvec::SmallVec;
use std::marker::PhantomData;

/// 单条记录的字段缓冲区（栈上分配）
pub type FieldBuffer = SmallVec<[i32; 9]>;

/// 单个数值 token 的最大字节数（含符号）
///
/// i32 最多 11 字节，超出部分不可能是合法数值。
const MAX_TOKEN_LEN: usize = 16;

/// 可在线格式上传输的定长整数记录
pub trait WireRecord: Sized {
    /// 每条记录的字段数
    const FIELD_COUNT: usize;

    /// 按固定顺序输出字段
    fn to_fields(&self) -> FieldBuffer;

    /// 从恰好 `FIELD_COUNT` 个字段构造
    fn from_fields(fields: &[i32]) -> Result<Self, ProtocolError>;
}

/// 记录编码器
pub struct PointEncoder;

impl PointEncoder {
    /// 编码到已有缓冲区
    pub fn encode<T: WireRecord>(record: &T, dst: &mut BytesMut) {
        let fields = record.to_fields();
        for (i, v) in fields.iter().enumerate() {
            if i > 0 {
                dst.put_u8(FIELD_SEPARATOR);
            }
            dst.extend_from_slice(v.to_string().as_bytes());
        }
        dst.put_u8(MESSAGE_TERMINATOR);
    }

    /// 编码为独立的字节块
    pub fn encode_to_bytes<T: WireRecord>(record: &T) -> Bytes {
        let mut dst = BytesMut::with_capacity(T::FIELD_COUNT * 8);
        Self::encode(record, &mut dst);
        dst.freeze()
    }
}

/// 容错流式解码器
///
/// # Example
///
/// ```
/// use armlink_protocol::{Point, PointDecoder};
///
/// let mut decoder = PointDecoder::new();
/// decoder.extend(b"985000 0 940000 -180000 ");
/// assert_eq!(decoder.decode().unwrap(), None);
///
/// decoder.extend(b"0 0 10 2 0\n");
/// assert_eq!(decoder.decode().unwrap(), Some(Point::home()));
/// ```
pub struct RecordDecoder<T: WireRecord> {
    buf: BytesMut,
    tokens: FieldBuffer,
    /// 帧错误后丢弃字节直到下一个换行符
    discarding: bool,
    _record: PhantomData<fn() -> T>,
}

/// 位姿点解码器
pub type PointDecoder = RecordDecoder<crate::point::Point>;

impl<T: WireRecord> Default for RecordDecoder<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: WireRecord> RecordDecoder<T> {
    pub fn new() -> Self {
        Self {
            buf: BytesMut::with_capacity(256),
            tokens: FieldBuffer::new(),
            discarding: false,
            _record: PhantomData,
        }
    }

    /// 追加新读取的字节
    pub fn extend(&mut self, data: &[u8]) {
        self.buf.extend_from_slice(data);
    }

    /// 缓冲区中尚未消费的字节数
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    /// 清空所有状态（重连后调用）
    pub fn reset(&mut self) {
        self.buf.clear();
        self.tokens.clear();
        self.discarding = false;
    }

    /// 尝试解码下一条记录
    ///
    /// - `Ok(Some(record))`: 解码出一条完整记录
    /// - `Ok(None)`: 数据不足（IncompleteData），等待更多字节
    /// - `Err(Framing)`: 遇到非数字、非分隔符字节；当前消息被丢弃，下一次调用从下一行继续
    /// - `Err(InvalidNumber)` / `Err(InvalidField)`: 数值或字段无效；同样不影响后续解码
    pub fn decode(&mut self) -> Result<Option<T>, ProtocolError> {
        loop {
            if self.discarding {
                match self.buf.iter().position(|b| *b == MESSAGE_TERMINATOR) {
                    Some(pos) => {
                        self.buf.advance(pos + 1);
                        self.discarding = false;
                    },
                    None => {
                        self.buf.clear();
                        return Ok(None);
                    },
                }
            }

            let skip = self.buf.iter().take_while(|b| b.is_ascii_whitespace()).count();
            self.buf.advance(skip);

            let Some(&first) = self.buf.first() else {
                return Ok(None);
            };
            if first != b'-' && !first.is_ascii_digit() {
                self.resync(0);
                return Err(ProtocolError::Framing { byte: first });
            }

            let end = 1 + self.buf[1..].iter().take_while(|b| b.is_ascii_digit()).count();
            if end > MAX_TOKEN_LEN {
                return Err(self.invalid_number(MAX_TOKEN_LEN));
            }

            // token 可能还未结束
            let Some(&next) = self.buf.get(end) else {
                return Ok(None);
            };
            if !next.is_ascii_whitespace() {
                self.resync(end);
                return Err(ProtocolError::Framing { byte: next });
            }

            let value = std::str::from_utf8(&self.buf[..end])
                .ok()
                .and_then(|s| s.parse::<i32>().ok());
            let Some(value) = value else {
                return Err(self.invalid_number(end));
            };

            self.tokens.push(value);
            self.buf.advance(end);

            if self.tokens.len() == T::FIELD_COUNT {
                let fields = std::mem::take(&mut self.tokens);
                return T::from_fields(&fields).map(Some);
            }
        }
    }

    fn invalid_number(&mut self, len: usize) -> ProtocolError {
        let token = String::from_utf8_lossy(&self.buf[..len]).into_owned();
        self.resync(len);
        ProtocolError::InvalidNumber { token }
    }

    /// 丢弃到 `at` 为止的字节和已收集的字段，进入丢弃模式
    fn resync(&mut self, at: usize) {
        self.buf.advance(at);
        self.tokens.clear();
        self.discarding = true;
    }
}

impl<T: WireRecord> Iterator for RecordDecoder<T> {
    type Item = Result<T, ProtocolError>;

    /// 依次产出缓冲区中的记录和错误，数据不足时结束
    fn next(&mut self) -> Option<Self::Item> {
        self.decode().transpose()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::point::{MotionParams, MotionType, Point};

    fn decode_all(decoder: &mut PointDecoder) -> Vec<Result<Point, ProtocolError>> {
        decoder.by_ref().collect()
    }

    #[test]
    fn test_encode_format() {
        let p = Point::new(
            [1, -2, 3, -4, 5, -6],
            MotionParams::new(20, MotionType::Fine, 1).unwrap(),
        );
        let bytes = PointEncoder::encode_to_bytes(&p);
        assert_eq!(&bytes[..], b"1 -2 3 -4 5 -6 20 0 1\n");
    }

    #[test]
    fn test_decode_two_messages_in_one_chunk() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"1 2 3 4 5 6 10 2 0\n7 8 9 10 11 12 10 0 0\n");
        let out = decode_all(&mut decoder);
        assert_eq!(out.len(), 2);
        assert_eq!(out[0].as_ref().unwrap().coords(), [1, 2, 3, 4, 5, 6]);
        assert_eq!(out[1].as_ref().unwrap().coords(), [7, 8, 9, 10, 11, 12]);
        assert_eq!(decoder.buffered(), 0);
    }

    #[test]
    fn test_token_split_across_chunks_waits() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"12");
        assert_eq!(decoder.decode().unwrap(), None);
        decoder.extend(b"34 0 0 0 0 0 10 2 0\n");
        let p = decoder.decode().unwrap().unwrap();
        assert_eq!(p.coords()[0], 1234);
    }

    #[test]
    fn test_framing_error_then_resync() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"1 2 x 4 5 6 10 2 0\n1 1 1 1 1 1 10 2 0\n");
        assert_eq!(
            decoder.decode(),
            Err(ProtocolError::Framing { byte: b'x' })
        );
        let p = decoder.decode().unwrap().unwrap();
        assert_eq!(p.coords(), [1, 1, 1, 1, 1, 1]);
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_garbage_inside_token_is_framing() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"12-3 0 0 0 0 0 10 2 0\n");
        assert_eq!(
            decoder.decode(),
            Err(ProtocolError::Framing { byte: b'-' })
        );
        assert_eq!(decoder.decode().unwrap(), None);
    }

    #[test]
    fn test_lone_minus_is_invalid_number() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"- 1 2 3 4 5 10 2 0\n0 0 0 0 0 0 10 2 0\n");
        assert!(matches!(
            decoder.decode(),
            Err(ProtocolError::InvalidNumber { .. })
        ));
        assert_eq!(decoder.decode().unwrap().unwrap().coords(), [0; 6]);
    }

    #[test]
    fn test_overflow_is_invalid_number() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"99999999999 0 0 0 0 0 10 2 0\n");
        assert_eq!(
            decoder.decode(),
            Err(ProtocolError::InvalidNumber {
                token: "99999999999".to_string()
            })
        );
    }

    #[test]
    fn test_invalid_params_do_not_break_stream() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"0 0 0 0 0 0 0 2 0\n0 0 0 0 0 0 10 2 0\n");
        assert!(matches!(
            decoder.decode(),
            Err(ProtocolError::InvalidField {
                field: "segment_time",
                ..
            })
        ));
        assert!(decoder.decode().unwrap().is_some());
    }

    #[test]
    fn test_discard_spans_chunks() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"oops 1 2");
        assert!(decoder.decode().unwrap_err().is_framing());
        assert_eq!(decoder.decode().unwrap(), None);
        decoder.extend(b" 3\n5 5 5 5 5 5 10 2 0\n");
        assert_eq!(decoder.decode().unwrap().unwrap().coords(), [5; 6]);
    }

    #[test]
    fn test_reset_clears_partial_message() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"1 2 3 ");
        assert_eq!(decoder.decode().unwrap(), None);
        decoder.reset();
        decoder.extend(b"9 9 9 9 9 9 10 2 0\n");
        assert_eq!(decoder.decode().unwrap().unwrap().coords(), [9; 6]);
    }

    #[test]
    fn test_crlf_and_tabs_are_separators() {
        let mut decoder = PointDecoder::new();
        decoder.extend(b"1\t2 3 4 5 6 10 2 0\r\n");
        assert_eq!(decoder.decode().unwrap().unwrap().coords(), [1, 2, 3, 4, 5, 6]);
    }
}
