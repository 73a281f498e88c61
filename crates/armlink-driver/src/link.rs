//! 链路抽象
//!
//! 会话通过 [`Connector`] 打开两条独立的单向链路：
//! - 命令通道（[`TxLink`]）：发送位姿和坐标系选择字节
//! - 遥测通道（[`RxLink`]）：接收控制器回传的位姿
//!
//! 链路在 drop 时关闭，所有退出路径（包括握手中途失败）都会释放套接字。

use crate::config::SessionConfig;
use crate::error::LinkError;
use std::io::{self, Read, Write};
use std::net::{Shutdown, SocketAddr, TcpStream, ToSocketAddrs};
use std::time::Duration;
use tracing::{debug, trace};

/// 发送链路
pub trait TxLink: Send {
    /// 完整写出 `bytes`
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError>;
}

/// 接收链路
pub trait RxLink: Send {
    /// 读取到 `buf`，返回读取的字节数（> 0）
    ///
    /// 超时、would-block 和 0 字节读取都返回 [`LinkError::Timeout`]，
    /// 调用方可以借此轮询停止标志。
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError>;
}

/// 链路工厂
pub trait Connector: Send + Sync + 'static {
    type Tx: TxLink + 'static;
    type Rx: RxLink + 'static;

    /// 打开命令通道
    fn open_command(&self) -> Result<Self::Tx, LinkError>;

    /// 打开遥测通道
    fn open_telemetry(&self) -> Result<Self::Rx, LinkError>;

    /// 修复探测：连接遥测端口后立即关闭
    ///
    /// 用于清除控制器侧残留的半开连接。
    fn probe_telemetry(&self) -> Result<(), LinkError>;
}

/// TCP 链路工厂
#[derive(Debug, Clone)]
pub struct TcpConnector {
    host: String,
    command_port: u16,
    telemetry_port: u16,
    connect_timeout: Duration,
    read_timeout: Duration,
}

impl TcpConnector {
    pub fn new(host: impl Into<String>, command_port: u16, telemetry_port: u16) -> Self {
        let defaults = SessionConfig::default();
        Self {
            host: host.into(),
            command_port,
            telemetry_port,
            connect_timeout: defaults.connect_timeout(),
            read_timeout: defaults.read_timeout(),
        }
    }

    pub fn from_config(config: &SessionConfig) -> Self {
        Self {
            host: config.host.clone(),
            command_port: config.command_port,
            telemetry_port: config.telemetry_port,
            connect_timeout: config.connect_timeout(),
            read_timeout: config.read_timeout(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    pub fn with_read_timeout(mut self, timeout: Duration) -> Self {
        self.read_timeout = timeout;
        self
    }

    fn resolve(&self, port: u16) -> Result<SocketAddr, LinkError> {
        let connect_err = |source| LinkError::Connect { port, source };
        (self.host.as_str(), port)
            .to_socket_addrs()
            .map_err(connect_err)?
            .next()
            .ok_or_else(|| {
                connect_err(io::Error::new(
                    io::ErrorKind::AddrNotAvailable,
                    format!("no address for host {}", self.host),
                ))
            })
    }

    fn connect(&self, port: u16) -> Result<TcpStream, LinkError> {
        let addr = self.resolve(port)?;
        debug!("Connecting to {}", addr);
        TcpStream::connect_timeout(&addr, self.connect_timeout)
            .map_err(|source| LinkError::Connect { port, source })
    }
}

impl Connector for TcpConnector {
    type Tx = TcpTx;
    type Rx = TcpRx;

    fn open_command(&self) -> Result<TcpTx, LinkError> {
        let stream = self.connect(self.command_port)?;
        stream
            .set_write_timeout(Some(self.read_timeout.max(self.connect_timeout)))
            .map_err(|source| LinkError::Connect {
                port: self.command_port,
                source,
            })?;
        Ok(TcpTx { stream })
    }

    fn open_telemetry(&self) -> Result<TcpRx, LinkError> {
        let stream = self.connect(self.telemetry_port)?;
        stream
            .set_read_timeout(Some(self.read_timeout))
            .map_err(|source| LinkError::Connect {
                port: self.telemetry_port,
                source,
            })?;
        Ok(TcpRx {
            stream,
            read_timeout: self.read_timeout,
            peer_closed: false,
        })
    }

    fn probe_telemetry(&self) -> Result<(), LinkError> {
        let stream = self.connect(self.telemetry_port)?;
        let _ = stream.shutdown(Shutdown::Both);
        Ok(())
    }
}

/// TCP 命令通道
#[derive(Debug)]
pub struct TcpTx {
    stream: TcpStream,
}

impl TxLink for TcpTx {
    fn send(&mut self, bytes: &[u8]) -> Result<(), LinkError> {
        self.stream.write_all(bytes).map_err(LinkError::from_io)?;
        self.stream.flush().map_err(LinkError::from_io)
    }
}

impl Drop for TcpTx {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}

/// TCP 遥测通道
#[derive(Debug)]
pub struct TcpRx {
    stream: TcpStream,
    read_timeout: Duration,
    peer_closed: bool,
}

impl RxLink for TcpRx {
    fn receive(&mut self, buf: &mut [u8]) -> Result<usize, LinkError> {
        // 对端关闭后 read 立即返回 0，按读超时节流，避免空转
        if self.peer_closed {
            std::thread::sleep(self.read_timeout);
        }
        match self.stream.read(buf) {
            Ok(0) => {
                if !self.peer_closed {
                    trace!("Telemetry peer closed its write half");
                }
                self.peer_closed = true;
                Err(LinkError::Timeout)
            },
            Ok(n) => {
                self.peer_closed = false;
                Ok(n)
            },
            Err(e) => Err(LinkError::from_io(e)),
        }
    }
}

impl Drop for TcpRx {
    fn drop(&mut self) {
        let _ = self.stream.shutdown(Shutdown::Both);
    }
}
