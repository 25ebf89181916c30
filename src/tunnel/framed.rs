use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt, ReadHalf, WriteHalf};
use tokio::sync::mpsc;
use tracing::{debug, warn};

use super::{RequestHead, Side, TunnelError, TunnelIo};
use crate::frame::{self, FrameDecoder};

const WRITE_QUEUE_SIZE: usize = 32;
const READ_BUFFER_SIZE: usize = 8 * 1024;

/// 프레임 세션으로 페이로드를 보내는 핸들
///
/// 복제해서 여러 태스크에서 쓸 수 있고, 보낸 순서대로 소켓에 씁니다.
#[derive(Debug, Clone)]
pub struct FrameWriter {
    tx: mpsc::Sender<Bytes>,
}

impl FrameWriter {
    pub async fn write(&self, payload: impl Into<Bytes>) -> Result<(), TunnelError> {
        self.tx.send(payload.into()).await.map_err(|_| TunnelError::Closed)
    }

    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

/// 프레임 단위 터널 세션의 애플리케이션 측 콜백
#[async_trait]
pub trait FrameHandler: Send + Sync {
    /// 세션이 열리면 한 번 호출됩니다. 오래 걸리는 작업은 별도 태스크로 넘겨야 합니다.
    async fn on_connect(&self, _origin: &RequestHead, _writer: FrameWriter) {}

    /// 완성된 페이로드마다 수신 순서대로 호출됩니다.
    async fn on_frame(&self, payload: Bytes);

    fn on_error(&self, err: &TunnelError, origin: &RequestHead) {
        warn!(error = %err, target = %origin.target, "프레임 터널 오류");
    }
}

async fn read_frames<S>(
    mut reader: ReadHalf<S>,
    head: Bytes,
    peer: Side,
    handler: &dyn FrameHandler,
    mut decoder: FrameDecoder,
) -> Result<(), TunnelError>
where
    S: AsyncRead,
{
    for payload in decoder.feed(&head)? {
        handler.on_frame(payload).await;
    }

    let mut buf = vec![0u8; READ_BUFFER_SIZE];
    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|source| TunnelError::Relay { side: peer, source })?;
        if n == 0 {
            debug!(buffered = decoder.buffered(), "프레임 세션 EOF");
            return Ok(());
        }
        for payload in decoder.feed(&buf[..n])? {
            handler.on_frame(payload).await;
        }
    }
}

async fn write_frame<S>(writer: &mut WriteHalf<S>, payload: &[u8], peer: Side) -> Result<(), TunnelError>
where
    S: AsyncWrite,
{
    let encoded = frame::encode(payload)?;
    writer
        .write_all(&encoded)
        .await
        .map_err(|source| TunnelError::Relay { side: peer, source })
}

/// 소켓 하나로 프레임 세션을 실행합니다.
///
/// 읽기 쪽이 끝나면 이미 큐에 들어간 프레임까지 쓰고 쓰기 방향을 닫습니다.
pub(crate) async fn run_session<S>(
    socket: S,
    head: Bytes,
    origin: &RequestHead,
    handler: &dyn FrameHandler,
    peer: Side,
    max_frame_size: usize,
) -> Result<(), TunnelError>
where
    S: TunnelIo,
{
    let (reader, mut writer) = tokio::io::split(socket);
    let (tx, mut rx) = mpsc::channel::<Bytes>(WRITE_QUEUE_SIZE);
    let decoder = FrameDecoder::with_max_frame_size(max_frame_size);

    let reading = async {
        handler.on_connect(origin, FrameWriter { tx }).await;
        read_frames(reader, head, peer, handler, decoder).await
    };
    tokio::pin!(reading);

    let read_result = loop {
        tokio::select! {
            result = &mut reading => break result,
            Some(payload) = rx.recv() => write_frame(&mut writer, &payload, peer).await?,
        }
    };

    // 핸들러가 FrameWriter를 들고 있으면 채널이 닫히지 않으므로 남은 것만 비움
    let mut flushed = 0usize;
    while let Ok(payload) = rx.try_recv() {
        write_frame(&mut writer, &payload, peer).await?;
        flushed += 1;
    }
    if flushed > 0 {
        debug!(flushed, "세션 종료 전 대기 프레임 전송");
    }
    if let Err(e) = writer.shutdown().await {
        debug!(side = %peer, error = %e, "쓰기 방향 종료 실패");
    }
    read_result
}
