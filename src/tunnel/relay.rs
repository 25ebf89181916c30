use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use super::{Side, TunnelError};

const RELAY_BUFFER_SIZE: usize = 8 * 1024;

/// 한 방향 복사. 읽기 오류는 `from`, 쓰기 오류는 `to` 쪽 탓으로 기록합니다.
///
/// 복사한 바이트 수는 `total`에 누적되므로 중간에 취소되어도 남습니다.
async fn pipe<R, W>(
    from: Side,
    to: Side,
    mut reader: R,
    mut writer: W,
    total: &mut u64,
) -> Result<(), TunnelError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    let mut buf = vec![0u8; RELAY_BUFFER_SIZE];

    loop {
        let n = reader
            .read(&mut buf)
            .await
            .map_err(|source| TunnelError::Relay { side: from, source })?;
        if n == 0 {
            debug!(side = %from, "중계 EOF");
            break;
        }
        writer
            .write_all(&buf[..n])
            .await
            .map_err(|source| TunnelError::Relay { side: to, source })?;
        *total += n as u64;
    }

    if let Err(e) = writer.shutdown().await {
        debug!(side = %to, error = %e, "쓰기 방향 종료 실패");
    }
    Ok(())
}

/// 양방향 중계. 어느 한 방향이 EOF나 오류로 끝나면 양쪽 소켓을 모두 닫습니다.
///
/// (클라이언트→대상, 대상→클라이언트) 바이트 수를 반환합니다.
pub async fn relay<A, B>(client: A, target: B) -> Result<(u64, u64), TunnelError>
where
    A: AsyncRead + AsyncWrite + Unpin,
    B: AsyncRead + AsyncWrite + Unpin,
{
    let (client_read, client_write) = tokio::io::split(client);
    let (target_read, target_write) = tokio::io::split(target);
    let mut sent = 0u64;
    let mut received = 0u64;

    // 먼저 끝난 쪽이 이기면 나머지 future와 절반들이 drop되어 소켓이 닫힘
    let result = tokio::select! {
        r = pipe(Side::Client, Side::Target, client_read, target_write, &mut sent) => r,
        r = pipe(Side::Target, Side::Client, target_read, client_write, &mut received) => r,
    };
    result.map(|()| (sent, received))
}
