use bytes::{Bytes, BytesMut};
use tokio::io::{AsyncRead, AsyncReadExt};

use super::TunnelError;

/// 요청 헤더 최대 크기
pub const MAX_HEAD_SIZE: usize = 64 * 1024;

/// 원본 순서와 대소문자를 보존한 HTTP/1.x 요청 헤더
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestHead {
    pub method: String,
    pub target: String,
    /// `HTTP/` 뒤의 버전 문자열 (예: "1.1")
    pub version: String,
    pub headers: Vec<(String, String)>,
}

impl RequestHead {
    /// 헤더 없는 `CONNECT {target} HTTP/1.1` 요청
    pub fn connect(target: impl Into<String>) -> Self {
        Self {
            method: "CONNECT".to_string(),
            target: target.into(),
            version: "1.1".to_string(),
            headers: Vec::new(),
        }
    }

    /// 버퍼 앞부분에서 헤더를 해석합니다. 아직 끝나지 않았으면 None
    ///
    /// 성공하면 헤더가 차지한 바이트 수를 함께 돌려줍니다.
    pub fn parse(buf: &[u8]) -> Result<Option<(Self, usize)>, TunnelError> {
        let Some(end) = find_head_end(buf) else {
            if buf.len() > MAX_HEAD_SIZE {
                return Err(TunnelError::HeadTooLarge { limit: MAX_HEAD_SIZE });
            }
            return Ok(None);
        };
        if end > MAX_HEAD_SIZE {
            return Err(TunnelError::HeadTooLarge { limit: MAX_HEAD_SIZE });
        }

        let text = std::str::from_utf8(&buf[..end])
            .map_err(|_| TunnelError::Handshake("UTF-8이 아닌 헤더".to_string()))?;
        let mut lines = text.split("\r\n");

        let request_line = lines.next().unwrap_or_default();
        let mut parts = request_line.split_whitespace();
        let (Some(method), Some(target), Some(version), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(TunnelError::Handshake(format!("요청 줄: {:?}", request_line)));
        };
        let version = version
            .strip_prefix("HTTP/")
            .ok_or_else(|| TunnelError::Handshake(format!("버전: {:?}", version)))?;

        let mut headers = Vec::new();
        for line in lines.filter(|l| !l.is_empty()) {
            let (name, value) = line
                .split_once(':')
                .ok_or_else(|| TunnelError::Handshake(format!("헤더 줄: {:?}", line)))?;
            headers.push((name.trim().to_string(), value.trim().to_string()));
        }

        let head = Self {
            method: method.to_string(),
            target: target.to_string(),
            version: version.to_string(),
            headers,
        };
        Ok(Some((head, end + 4)))
    }

    /// 대소문자 구분 없이 첫 번째 값을 찾습니다.
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(k, _)| k.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn is_connect(&self) -> bool {
        self.method.eq_ignore_ascii_case("CONNECT")
    }

    /// 프록시 형식 CONNECT 인지 (`Proxy-Connection` 헤더 존재)
    pub fn is_proxy_form(&self) -> bool {
        self.header("proxy-connection").is_some()
    }

    /// 받은 그대로의 형태로 다시 직렬화합니다.
    pub fn to_bytes(&self) -> Bytes {
        let mut out = format!("{} {} HTTP/{}\r\n", self.method, self.target, self.version);
        for (name, value) in &self.headers {
            out.push_str(name);
            out.push_str(": ");
            out.push_str(value);
            out.push_str("\r\n");
        }
        out.push_str("\r\n");
        Bytes::from(out)
    }
}

fn find_head_end(buf: &[u8]) -> Option<usize> {
    buf.windows(4).position(|w| w == b"\r\n\r\n")
}

/// 요청 헤더가 완성될 때까지 읽습니다. 읽은 바이트는 모두 `buf`에 남습니다.
///
/// 헤더 전에 연결이 닫히면 None
pub async fn read_head<R>(reader: &mut R, buf: &mut BytesMut) -> Result<Option<(RequestHead, usize)>, TunnelError>
where
    R: AsyncRead + Unpin,
{
    loop {
        if let Some(parsed) = RequestHead::parse(&buf[..])? {
            return Ok(Some(parsed));
        }
        let n = reader.read_buf(buf).await?;
        if n == 0 {
            if buf.is_empty() {
                return Ok(None);
            }
            return Err(TunnelError::Handshake("헤더 도중 연결 종료".to_string()));
        }
    }
}
