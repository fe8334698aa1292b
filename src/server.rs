// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 事件循环与 worker
//!
//! 每个 worker 是一个独立的操作系统线程，运行自己的单线程 Tokio 运行时，
//! 并通过 `SO_REUSEADDR` + `SO_REUSEPORT` 各自绑定同一个地址和端口，
//! 由内核在 worker 之间分配新连接。worker 之间除了只读的 `Config` 之外不共享任何状态。

use std::{
    io,
    net::{IpAddr, SocketAddr},
    path::Path,
    sync::Arc,
    thread,
};

use log::{debug, error, info};
use tokio::{
    net::{TcpListener, TcpSocket},
    runtime::Builder,
};

use crate::{config::Config, connection::Connection};

pub struct Server {
    listener: TcpListener,
    config: Arc<Config>,
    worker: usize,
}

impl Server {
    /// 绑定配置中的地址与端口。
    pub async fn bind(config: Arc<Config>, worker: usize) -> io::Result<Self> {
        let ip: IpAddr = config.address().parse().map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("无效的监听地址{}: {}", config.address(), e),
            )
        })?;
        let address = SocketAddr::new(ip, config.port());

        let socket = match address {
            SocketAddr::V4(_) => TcpSocket::new_v4()?,
            SocketAddr::V6(_) => TcpSocket::new_v6()?,
        };
        socket.set_reuseaddr(true)?;
        #[cfg(all(unix, not(target_os = "solaris"), not(target_os = "illumos")))]
        socket.set_reuseport(true)?;
        socket.bind(address)?;
        let listener = socket.listen(1024)?;

        info!(
            "worker {} 在{}上监听Socket连接",
            worker,
            listener.local_addr()?
        );
        Ok(Self {
            listener,
            config,
            worker,
        })
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// 主事件循环 (Accept Loop)。
    ///
    /// 接受连接失败只记录日志并继续；收到 Ctrl-C 后退出。
    pub async fn run(self) {
        let worker = self.worker;
        let shutdown = async move {
            match tokio::signal::ctrl_c().await {
                Ok(()) => info!("worker {} 接收到停机指令，正在退出...", worker),
                Err(e) => {
                    // 无法监听信号时继续服务
                    error!("worker {} 无法监听停机信号: {}", worker, e);
                    std::future::pending::<()>().await;
                }
            }
        };
        tokio::pin!(shutdown);

        // 连接 ID 的高 64 位为 worker 编号，保证跨 worker 唯一
        let mut id: u128 = (worker as u128) << 64;
        loop {
            tokio::select! {
                accepted = self.listener.accept() => match accepted {
                    Ok((stream, addr)) => {
                        debug!("[ID{}]新的连接：{}", id, addr);
                        let config = Arc::clone(&self.config);
                        let connection_id = id;
                        tokio::spawn(async move {
                            Connection::new(stream, config, connection_id).run().await;
                        });
                        id += 1;
                    }
                    Err(e) => {
                        error!("worker {} 接受连接失败: {}", worker, e);
                    }
                },
                _ = &mut shutdown => break,
            }
        }
    }
}

/// 启动配置中指定数量的 worker，并等待它们全部退出。
///
/// 文档根目录必须是一个已存在的目录。
pub fn run_workers(config: Config) -> io::Result<()> {
    let root = match config.document_root() {
        "" => "/",
        root => root,
    };
    if !Path::new(root).is_dir() {
        return Err(io::Error::new(
            io::ErrorKind::NotFound,
            format!("文档根目录{}不存在或不是目录", root),
        ));
    }
    info!("www root: {}", root);

    let config = Arc::new(config);
    let mut handles = Vec::with_capacity(config.workers());
    for worker in 0..config.workers() {
        let config = Arc::clone(&config);
        let handle = thread::Builder::new()
            .name(format!("worker-{}", worker))
            .spawn(move || -> io::Result<()> {
                let runtime = Builder::new_current_thread().enable_all().build()?;
                runtime.block_on(async move {
                    let server = Server::bind(config, worker).await?;
                    server.run().await;
                    Ok(())
                })
            })?;
        handles.push(handle);
    }
    info!("已启动{}个worker", handles.len());

    let mut result = Ok(());
    for (worker, handle) in handles.into_iter().enumerate() {
        match handle.join() {
            Ok(Ok(())) => debug!("worker {} 已退出", worker),
            Ok(Err(e)) => {
                error!("worker {} 异常退出: {}", worker, e);
                if result.is_ok() {
                    result = Err(e);
                }
            }
            Err(_) => error!("worker {} 线程崩溃", worker),
        }
    }
    result
}
