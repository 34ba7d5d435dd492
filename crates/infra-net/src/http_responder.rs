// HTTP responder adapter
//
// One read, one response, close. No keep-alive, no parsing beyond the
// request-line prefix, permissive CORS on every response.

use chrono::Local;
use std::io::{Read, Write};
use std::thread;
use std::time::Duration;
use tracing::{debug, info};

use harbor_core::application::worker::constants::{DEFAULT_RESPONSE_DELAY, READ_BUFFER_SIZE};
use harbor_core::domain::ConnectionHandle;
use harbor_core::port::{ConnectionHandler, HandlerError};

/// CORS headers included in all responses
const CORS_HEADERS: &str = "Access-Control-Allow-Origin: *\r\n\
                            Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n\
                            Access-Control-Allow-Headers: Content-Type\r\n";

const NOT_FOUND_BODY: &str = "404 Not Found\n";

/// Request class, decided from the start of the request line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestKind {
    /// CORS preflight
    Options,
    Get,
    Post,
    /// Anything else
    Unknown,
}

impl RequestKind {
    pub fn classify(request: &[u8]) -> Self {
        if request.starts_with(b"OPTIONS") {
            RequestKind::Options
        } else if request.starts_with(b"GET /") {
            RequestKind::Get
        } else if request.starts_with(b"POST /") {
            RequestKind::Post
        } else {
            RequestKind::Unknown
        }
    }

    /// GET and POST carry the simulated workload
    pub fn is_delayed(&self) -> bool {
        matches!(self, RequestKind::Get | RequestKind::Post)
    }
}

/// Build the full response for `kind`; `timestamp` goes into acknowledgements
pub fn render_response(kind: RequestKind, timestamp: &str) -> String {
    match kind {
        RequestKind::Options => format!(
            "HTTP/1.1 204 No Content\r\n{CORS_HEADERS}Connection: close\r\n\r\n"
        ),
        RequestKind::Get | RequestKind::Post => {
            let body = format!("{timestamp} Acknowledged\n");
            format!(
                "HTTP/1.1 200 OK\r\n\
                 Content-Type: text/plain\r\n\
                 Content-Length: {}\r\n\
                 {CORS_HEADERS}\
                 Connection: close\r\n\
                 \r\n\
                 {body}",
                body.len()
            )
        }
        RequestKind::Unknown => format!(
            "HTTP/1.1 404 Not Found\r\n\
             Content-Type: text/plain\r\n\
             Content-Length: {}\r\n\
             {CORS_HEADERS}\
             Connection: close\r\n\
             \r\n\
             {NOT_FOUND_BODY}",
            NOT_FOUND_BODY.len()
        ),
    }
}

/// Minimal HTTP/1.1 responder
///
/// GET and POST sleep for `response_delay` before answering. The sleep runs on
/// the worker thread, so a slow response keeps its worker busy and a burst of
/// requests backs up into the task queue.
pub struct HttpResponder {
    response_delay: Duration,
}

impl HttpResponder {
    pub fn new(response_delay: Duration) -> Self {
        Self { response_delay }
    }

    pub fn response_delay(&self) -> Duration {
        self.response_delay
    }

    /// Read one request from `stream` and write the matching response.
    ///
    /// Returns `None` when the peer closed without sending anything; no
    /// response is written in that case. An empty read is not classified as
    /// an unknown request (no 404), so the shutdown wake-up connection and
    /// clients that hang up early are closed silently.
    pub fn respond<S: Read + Write>(
        &self,
        stream: &mut S,
    ) -> Result<Option<RequestKind>, HandlerError> {
        let mut buffer = [0u8; READ_BUFFER_SIZE];
        let bytes_read = stream.read(&mut buffer).map_err(HandlerError::Read)?;
        if bytes_read == 0 {
            debug!("Peer closed before sending a request");
            return Ok(None);
        }

        let kind = RequestKind::classify(&buffer[..bytes_read]);
        info!(?kind, bytes = bytes_read, "Received request");

        // Stamped on arrival, before the simulated workload
        let timestamp = Local::now().format("[%Y-%m-%d %H:%M:%S]").to_string();
        let response = render_response(kind, &timestamp);

        if kind.is_delayed() && !self.response_delay.is_zero() {
            debug!(delay_ms = self.response_delay.as_millis() as u64, "Simulating workload");
            thread::sleep(self.response_delay);
        }

        stream
            .write_all(response.as_bytes())
            .and_then(|()| stream.flush())
            .map_err(HandlerError::Write)?;

        info!(?kind, "Response sent");
        Ok(Some(kind))
    }
}

impl Default for HttpResponder {
    fn default() -> Self {
        Self::new(DEFAULT_RESPONSE_DELAY)
    }
}

impl<S> ConnectionHandler<S> for HttpResponder
where
    S: Read + Write + Send,
{
    /// The stream is dropped (and the socket closed) on every return path.
    fn handle(&self, conn: ConnectionHandle<S>) -> Result<(), HandlerError> {
        let mut stream = conn.into_stream();
        self.respond(&mut stream).map(|_| ())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use harbor_core::domain::ConnectionId;
    use std::io;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    /// In-memory stream: canned request in, response captured
    struct MockStream {
        input: io::Cursor<Vec<u8>>,
        output: Vec<u8>,
        fail_writes: bool,
        drops: Arc<AtomicUsize>,
    }

    impl MockStream {
        fn new(request: &[u8]) -> Self {
            Self {
                input: io::Cursor::new(request.to_vec()),
                output: Vec::new(),
                fail_writes: false,
                drops: Arc::new(AtomicUsize::new(0)),
            }
        }

        fn output(&self) -> String {
            String::from_utf8(self.output.clone()).unwrap()
        }
    }

    impl Read for MockStream {
        fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
            self.input.read(buf)
        }
    }

    impl Write for MockStream {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            if self.fail_writes {
                return Err(io::Error::new(io::ErrorKind::BrokenPipe, "peer gone"));
            }
            self.output.write(buf)
        }

        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl Drop for MockStream {
        fn drop(&mut self) {
            self.drops.fetch_add(1, Ordering::SeqCst);
        }
    }

    fn responder() -> HttpResponder {
        HttpResponder::new(Duration::ZERO)
    }

    #[test]
    fn test_classify() {
        assert_eq!(RequestKind::classify(b"OPTIONS / HTTP/1.1\r\n"), RequestKind::Options);
        assert_eq!(RequestKind::classify(b"GET /index HTTP/1.1\r\n"), RequestKind::Get);
        assert_eq!(RequestKind::classify(b"POST /submit HTTP/1.1\r\n"), RequestKind::Post);
        assert_eq!(RequestKind::classify(b"DELETE / HTTP/1.1\r\n"), RequestKind::Unknown);
        assert_eq!(RequestKind::classify(b"GET"), RequestKind::Unknown);
    }

    #[test]
    fn test_preflight_gets_204_with_cors() {
        let mut stream = MockStream::new(b"OPTIONS /api HTTP/1.1\r\n\r\n");
        let kind = responder().respond(&mut stream).unwrap();

        assert_eq!(kind, Some(RequestKind::Options));
        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 204 No Content\r\n"));
        assert!(out.contains("Access-Control-Allow-Origin: *\r\n"));
        assert!(out.contains("Access-Control-Allow-Methods: GET, POST, OPTIONS\r\n"));
        assert!(out.ends_with("Connection: close\r\n\r\n"));
    }

    #[test]
    fn test_get_is_acknowledged() {
        let mut stream = MockStream::new(b"GET / HTTP/1.1\r\nHost: x\r\n\r\n");
        responder().respond(&mut stream).unwrap();

        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 200 OK\r\n"));
        assert!(out.contains("Content-Type: text/plain\r\n"));
        assert!(out.ends_with(" Acknowledged\n"));

        let (head, body) = out.split_once("\r\n\r\n").unwrap();
        assert!(head.contains(&format!("Content-Length: {}", body.len())));
        assert!(body.starts_with('['));
    }

    #[test]
    fn test_post_is_acknowledged() {
        let mut stream = MockStream::new(b"POST /form HTTP/1.1\r\n\r\nname=x");
        let kind = responder().respond(&mut stream).unwrap();

        assert_eq!(kind, Some(RequestKind::Post));
        assert!(stream.output().starts_with("HTTP/1.1 200 OK\r\n"));
    }

    #[test]
    fn test_unknown_request_gets_404() {
        let mut stream = MockStream::new(b"PUT /thing HTTP/1.1\r\n\r\n");
        responder().respond(&mut stream).unwrap();

        let out = stream.output();
        assert!(out.starts_with("HTTP/1.1 404 Not Found\r\n"));
        assert!(out.contains("Content-Length: 14\r\n"));
        assert!(out.ends_with("\r\n\r\n404 Not Found\n"));
    }

    #[test]
    fn test_empty_read_sends_nothing() {
        let mut stream = MockStream::new(b"");
        let kind = responder().respond(&mut stream).unwrap();

        assert_eq!(kind, None);
        assert!(stream.output.is_empty());
    }

    #[test]
    fn test_delay_applies_to_get() {
        let responder = HttpResponder::new(Duration::from_millis(50));
        let mut stream = MockStream::new(b"GET / HTTP/1.1\r\n\r\n");

        let start = std::time::Instant::now();
        responder.respond(&mut stream).unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[test]
    fn test_write_failure_still_releases_stream() {
        let mut stream = MockStream::new(b"GET / HTTP/1.1\r\n\r\n");
        stream.fail_writes = true;
        let drops = Arc::clone(&stream.drops);

        let conn = ConnectionHandle::new(ConnectionId::new(1), None, stream);
        let result = responder().handle(conn);

        assert!(matches!(result, Err(HandlerError::Write(_))));
        assert_eq!(drops.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_default_delay_is_five_seconds() {
        assert_eq!(HttpResponder::default().response_delay(), Duration::from_secs(5));
    }
}
