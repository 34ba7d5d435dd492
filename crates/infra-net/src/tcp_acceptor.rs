// TCP listener adapter
// reason: std::net blocking accept, one call per accept-loop iteration
use std::io;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, TcpListener, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, info};

use harbor_core::port::{AcceptError, Incoming, Listener};

/// How long `wake` waits for its loopback connect
const WAKE_CONNECT_TIMEOUT: Duration = Duration::from_secs(1);

/// Blocking TCP listener
///
/// std enables SO_REUSEADDR on Unix when binding, so a restarted server can
/// rebind while old sockets sit in TIME_WAIT.
pub struct TcpAcceptor {
    listener: TcpListener,
    local_addr: SocketAddr,
}

impl TcpAcceptor {
    /// Bind and start listening
    ///
    /// # Example
    /// ```ignore
    /// let acceptor = TcpAcceptor::bind("0.0.0.0:8888")?;
    /// ```
    pub fn bind<A: ToSocketAddrs>(addr: A) -> io::Result<Self> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;

        info!(addr = %local_addr, "Server listening");
        Ok(Self {
            listener,
            local_addr,
        })
    }

    /// Address `wake` connects to: the bound address, with a wildcard IP
    /// replaced by loopback
    fn wake_addr(&self) -> SocketAddr {
        let mut addr = self.local_addr;
        if addr.ip().is_unspecified() {
            match addr {
                SocketAddr::V4(_) => addr.set_ip(Ipv4Addr::LOCALHOST.into()),
                SocketAddr::V6(_) => addr.set_ip(Ipv6Addr::LOCALHOST.into()),
            }
        }
        addr
    }
}

impl Listener for TcpAcceptor {
    type Conn = TcpStream;

    fn accept(&self) -> Result<Incoming<TcpStream>, AcceptError> {
        let (stream, peer) = self.listener.accept()?;
        Ok(Incoming::new(stream, Some(peer)))
    }

    /// Open and drop a loopback connection so a blocked `accept` returns.
    ///
    /// The accept loop enqueues that connection like any other; the handler
    /// reads zero bytes and closes it without a response.
    fn wake(&self) -> io::Result<()> {
        let addr = self.wake_addr();
        debug!(addr = %addr, "Waking accept loop");
        TcpStream::connect_timeout(&addr, WAKE_CONNECT_TIMEOUT).map(drop)
    }

    fn local_addr(&self) -> Option<SocketAddr> {
        Some(self.local_addr)
    }
}
