use crate::{
    Config, ServiceError, ServiceResult, handler,
    protocol::{HEADER_END, HttpRequest, HttpResponse, find_header_end},
};
use std::{net::SocketAddr, sync::Arc, time::Duration};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    net::{TcpListener, TcpStream},
    sync::Notify,
};

const READ_CHUNK_SIZE: usize = 16 * 1024;
const MAX_HEAD_SIZE: usize = 64 * 1024;
const MAX_CHUNK_LINE: usize = 4 * 1024;

const DRAIN_LIMIT: usize = 4 * 1024 * 1024;
const DRAIN_TIMEOUT: Duration = Duration::from_secs(2);

const CONTINUE_RESPONSE: &[u8] = b"HTTP/1.1 100 Continue\r\n\r\n";

pub struct ColorServer {
    config: Arc<Config>,
    exit_notify: Arc<Notify>,
}

impl ColorServer {
    pub fn new(config: Config, exit_notify: Arc<Notify>) -> Self {
        Self {
            config: Arc::new(config),
            exit_notify,
        }
    }

    pub async fn bind(&self) -> ServiceResult<TcpListener> {
        let listener = TcpListener::bind(self.config.socket_addr()).await?;
        log::info!("colorfx listening on {}", listener.local_addr()?);
        Ok(listener)
    }

    pub async fn run(self) -> ServiceResult<()> {
        let listener = self.bind().await?;
        self.serve(listener).await
    }

    /// Accepts connections on `listener` until the exit notify fires.
    pub async fn serve(self, listener: TcpListener) -> ServiceResult<()> {
        loop {
            tokio::select! {
                _ = self.exit_notify.notified() => {
                    log::info!("colorfx server exit");
                    return Ok(());
                }
                accepted = listener.accept() => {
                    let (stream, socket_addr) = match accepted {
                        Ok(v) => v,
                        Err(e) => {
                            log::warn!("accept connection failed: {e}");
                            continue;
                        }
                    };

                    let config = self.config.clone();
                    tokio::spawn(async move {
                        Self::handle_connection(stream, socket_addr, config).await;
                    });
                }
            }
        }
    }

    async fn handle_connection(mut stream: TcpStream, socket_addr: SocketAddr, config: Arc<Config>) {
        log::debug!("new connection from {socket_addr}");

        let read = tokio::time::timeout(
            config.read_timeout(),
            read_request(&mut stream, config.max_body_size),
        )
        .await;

        let (response, unread_body) = match read {
            Ok(Ok(request)) => (handler::handle(request, config).await, false),
            Ok(Err(e)) => {
                log::warn!("read request from {socket_addr} failed: {e}");
                (HttpResponse::error(&e), true)
            }
            Err(_) => {
                let e = ServiceError::RequestTimeout;
                log::warn!("read request from {socket_addr} failed: {e}");
                (HttpResponse::error(&e), false)
            }
        };

        if let Err(e) = stream.write_all(&response.marshal()).await {
            log::warn!("write response to {socket_addr} failed: {e}");
            return;
        }

        if let Err(e) = stream.shutdown().await {
            log::debug!("shutdown {socket_addr} failed: {e}");
            return;
        }

        if unread_body {
            let n = drain(&mut stream).await;
            log::debug!("drained {n} bytes from {socket_addr}");
        }
    }
}

/// Discards what the client is still sending after an early error response,
/// so closing the socket does not reset the connection under the response.
async fn drain(stream: &mut TcpStream) -> usize {
    let mut chunk = vec![0u8; READ_CHUNK_SIZE];
    let mut total = 0;

    let _ = tokio::time::timeout(DRAIN_TIMEOUT, async {
        while total < DRAIN_LIMIT {
            match stream.read(&mut chunk).await {
                Ok(0) | Err(_) => break,
                Ok(n) => total += n,
            }
        }
    })
    .await;

    total
}

struct RequestReader<'a, S> {
    stream: &'a mut S,
    data: Vec<u8>,
    chunk: Vec<u8>,
}

impl<S: AsyncRead + Unpin> RequestReader<'_, S> {
    /// Appends the next read to `data`, false once the peer has closed.
    async fn fill(&mut self) -> ServiceResult<bool> {
        let n = self.stream.read(&mut self.chunk).await?;
        self.data.extend_from_slice(&self.chunk[..n]);
        Ok(n > 0)
    }

    /// Index of the `\r\n` that ends the line starting at `pos`.
    async fn line_end(&mut self, pos: usize) -> ServiceResult<usize> {
        loop {
            if let Some(i) = self.data[pos..].windows(2).position(|w| w == b"\r\n") {
                return Ok(pos + i);
            }

            if self.data.len() - pos > MAX_CHUNK_LINE {
                return Err(ServiceError::BadRequest("chunk line too long".to_string()));
            }

            if !self.fill().await? {
                return Err(ServiceError::BadRequest(
                    "connection closed inside chunked body".to_string(),
                ));
            }
        }
    }

    async fn sized_body(&mut self, start: usize, length: usize) -> ServiceResult<Vec<u8>> {
        let total = start + length;
        while self.data.len() < total {
            if !self.fill().await? {
                return Err(ServiceError::BadRequest(format!(
                    "connection closed after {} of {length} body bytes",
                    self.data.len() - start
                )));
            }
        }

        Ok(self.data[start..total].to_vec())
    }

    async fn chunked_body(&mut self, mut pos: usize, max_body_size: usize) -> ServiceResult<Vec<u8>> {
        let mut body = vec![];

        loop {
            let line_end = self.line_end(pos).await?;
            let line = std::str::from_utf8(&self.data[pos..line_end])
                .map_err(|e| ServiceError::BadRequest(format!("chunk size line: {e}")))?;
            let field = line.split(';').next().unwrap_or_default().trim();
            let size = usize::from_str_radix(field, 16)
                .map_err(|e| ServiceError::BadRequest(format!("chunk size `{field}`: {e}")))?;
            pos = line_end + 2;

            if size == 0 {
                break;
            }

            let body_len = body.len().saturating_add(size);
            if body_len > max_body_size {
                return Err(ServiceError::BodyTooLarge(body_len));
            }

            let end = pos + size;
            while self.data.len() < end + 2 {
                if !self.fill().await? {
                    return Err(ServiceError::BadRequest(
                        "connection closed inside chunked body".to_string(),
                    ));
                }
            }

            if &self.data[end..end + 2] != b"\r\n" {
                return Err(ServiceError::BadRequest(
                    "chunk data not followed by CRLF".to_string(),
                ));
            }

            body.extend_from_slice(&self.data[pos..end]);
            pos = end + 2;
        }

        // trailer fields are skipped up to the closing empty line
        loop {
            let line_end = self.line_end(pos).await?;
            let empty = line_end == pos;
            pos = line_end + 2;
            if empty {
                break;
            }
        }

        Ok(body)
    }
}

/// Reads one request: the head up to the blank line, then a `Content-Length`
/// or chunked body. Answers `Expect: 100-continue` before reading the body.
pub async fn read_request<S>(stream: &mut S, max_body_size: usize) -> ServiceResult<HttpRequest>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    let mut reader = RequestReader {
        stream,
        data: Vec::with_capacity(READ_CHUNK_SIZE),
        chunk: vec![0u8; READ_CHUNK_SIZE],
    };

    let head_end = loop {
        if let Some(end) = find_header_end(&reader.data) {
            break end;
        }

        if reader.data.len() > MAX_HEAD_SIZE {
            return Err(ServiceError::BadRequest("request head too large".to_string()));
        }

        if !reader.fill().await? {
            return Err(ServiceError::BadRequest(
                "connection closed before request head".to_string(),
            ));
        }
    };

    let head = std::str::from_utf8(&reader.data[..head_end - HEADER_END.len()])
        .map_err(|e| ServiceError::BadRequest(format!("request head: {e}")))?;
    let mut request = HttpRequest::parse_head(head)?;

    let chunked = request.is_chunked()?;
    let content_length = if chunked {
        None
    } else {
        request.content_length()?
    };

    if let Some(length) = content_length.filter(|&length| length > max_body_size) {
        return Err(ServiceError::BodyTooLarge(length));
    }

    let has_body = chunked || content_length.is_some_and(|length| length > 0);
    if has_body && request.expects_continue() && reader.data.len() == head_end {
        reader.stream.write_all(CONTINUE_RESPONSE).await?;
        reader.stream.flush().await?;
    }

    request.body = if chunked {
        reader.chunked_body(head_end, max_body_size).await?
    } else {
        reader
            .sized_body(head_end, content_length.unwrap_or(0))
            .await?
    };

    Ok(request)
}
