// Harbor Infrastructure - Network Adapters
// Implements: Listener, ConnectionHandler

pub mod http_responder;
pub mod tcp_acceptor;

pub use http_responder::{HttpResponder, RequestKind};
pub use tcp_acceptor::TcpAcceptor;
