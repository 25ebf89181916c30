//! 터널 소켓 위에서 임의의 페이로드를 주고받기 위한 길이 접두 프레임 코덱입니다.
//!
//! 프레임 형식: 4바이트 little-endian 길이 + 정확히 그 길이만큼의 바이트.
//! 체크섬이나 버전 바이트는 없습니다.

use bytes::{Buf, BufMut, Bytes, BytesMut};
use std::fmt;
use tracing::trace;

/// 길이 접두사 크기 (바이트)
pub const LENGTH_PREFIX_SIZE: usize = 4;

/// 기본 최대 프레임 크기 (16 MiB)
pub const DEFAULT_MAX_FRAME_SIZE: usize = 16 * 1024 * 1024;

#[derive(Debug, PartialEq)]
pub enum FrameError {
    /// 선언된 길이가 허용치를 넘음
    TooLarge {
        declared: usize,
        max: usize,
    },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FrameError::TooLarge { declared, max } =>
                write!(f, "프레임 크기 초과: 선언된 길이 {} (최대 {})", declared, max),
        }
    }
}

impl std::error::Error for FrameError {}

/// 페이로드 앞에 4바이트 little-endian 길이를 붙입니다.
pub fn encode(payload: &[u8]) -> Result<Bytes, FrameError> {
    let len = u32::try_from(payload.len()).map_err(|_| FrameError::TooLarge {
        declared: payload.len(),
        max: u32::MAX as usize,
    })?;

    let mut buf = BytesMut::with_capacity(LENGTH_PREFIX_SIZE + payload.len());
    buf.put_u32_le(len);
    buf.put_slice(payload);
    Ok(buf.freeze())
}

/// 누적 버퍼 기반 프레임 디코더
///
/// 청크 경계와 무관하게 지금까지 받은 바이트열만으로 결과가 결정됩니다.
/// 한 번에 하나의 선언 길이만 대기 상태가 될 수 있습니다.
#[derive(Debug)]
pub struct FrameDecoder {
    buf: BytesMut,
    pending: Option<usize>,
    max_frame_size: usize,
}

impl FrameDecoder {
    pub fn new() -> Self {
        Self::with_max_frame_size(DEFAULT_MAX_FRAME_SIZE)
    }

    pub fn with_max_frame_size(max_frame_size: usize) -> Self {
        Self {
            buf: BytesMut::new(),
            pending: None,
            max_frame_size,
        }
    }

    /// 청크를 버퍼에 추가하고 완성된 페이로드를 수신 순서대로 반환합니다.
    pub fn feed(&mut self, chunk: &[u8]) -> Result<Vec<Bytes>, FrameError> {
        self.buf.extend_from_slice(chunk);

        let mut payloads = Vec::new();
        while let Some(payload) = self.next_payload()? {
            payloads.push(payload);
        }
        Ok(payloads)
    }

    /// 버퍼에 완성된 페이로드가 있으면 하나를 꺼냅니다.
    pub fn next_payload(&mut self) -> Result<Option<Bytes>, FrameError> {
        if self.pending.is_none() {
            if self.buf.len() < LENGTH_PREFIX_SIZE {
                return Ok(None);
            }
            let declared = self.buf.get_u32_le() as usize;
            if declared > self.max_frame_size {
                return Err(FrameError::TooLarge {
                    declared,
                    max: self.max_frame_size,
                });
            }
            self.pending = Some(declared);
        }

        match self.pending {
            Some(len) if self.buf.len() >= len => {
                self.pending = None;
                trace!(len, "프레임 디코딩 완료");
                Ok(Some(self.buf.split_to(len).freeze()))
            }
            _ => Ok(None),
        }
    }

    /// 아직 프레임으로 해석되지 않은 바이트 수
    pub fn buffered(&self) -> usize {
        self.buf.len()
    }

    pub fn pending_len(&self) -> Option<usize> {
        self.pending
    }
}

impl Default for FrameDecoder {
    fn default() -> Self {
        Self::new()
    }
}
