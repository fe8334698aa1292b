// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 连接处理器
//!
//! 单个连接的生命周期：
//!
//! `ReadingRequest → Dispatching → WritingHeaders → StreamingBody（可选） → Closed`
//!
//! 同一连接上的各状态依次执行；连接从不保持（每个连接只处理一个请求）。
//! 解析、定位与响应构建都是同步的，只有读写套接字和读取文件块时才会挂起。

use std::{sync::Arc, time::Duration};

use bytes::BytesMut;
use log::{debug, error, info, warn};
use tokio::{
    io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt},
    time::{timeout_at, Instant},
};

use crate::{
    config::Config,
    exception::Exception,
    producer::ContentProducer,
    request::{frame, Request},
    resolver::resolve,
    response::Response,
};

/// 每次从套接字读取前预留的缓冲区空间
const READ_RESERVE: usize = 4096;

#[derive(Debug)]
pub enum ConnectionState {
    ReadingRequest,
    /// 缓冲区前 n 个字节构成一个完整请求
    Dispatching(usize),
    WritingHeaders(Response),
    StreamingBody(ContentProducer),
    Closed,
}

pub struct Connection<S> {
    stream: S,
    config: Arc<Config>,
    id: u128,
    buffer: BytesMut,
    state: ConnectionState,
    status_code: Option<u16>,
    body_bytes: u64,
    body_chunks: usize,
}

impl<S> Connection<S>
where
    S: AsyncRead + AsyncWrite + Unpin,
{
    pub fn new(stream: S, config: Arc<Config>, id: u128) -> Self {
        Self {
            stream,
            config,
            id,
            buffer: BytesMut::with_capacity(READ_RESERVE),
            state: ConnectionState::ReadingRequest,
            status_code: None,
            body_bytes: 0,
            body_chunks: 0,
        }
    }

    /// 驱动状态机直到连接关闭。任何错误都只结束本连接，不会向外传播。
    pub async fn run(&mut self) {
        loop {
            let state = std::mem::replace(&mut self.state, ConnectionState::Closed);
            self.state = match state {
                ConnectionState::ReadingRequest => self.read_request().await,
                ConnectionState::Dispatching(len) => self.dispatch(len),
                ConnectionState::WritingHeaders(response) => self.write_headers(response).await,
                ConnectionState::StreamingBody(producer) => self.stream_body(producer).await,
                ConnectionState::Closed => {
                    self.close().await;
                    break;
                }
            };
        }
    }

    async fn read_request(&mut self) -> ConnectionState {
        let id = self.id;
        // 整个请求共用一个截止时间，逐字节慢速发送也无法延长
        let deadline = match self.config.request_timeout() {
            0 => None,
            secs => Some(Instant::now() + Duration::from_secs(secs)),
        };
        loop {
            match frame(&self.buffer, self.config.max_request_size()) {
                Ok(Some(len)) => {
                    debug!("[ID{}]HTTP请求接收完毕，共{}字节", id, len);
                    return ConnectionState::Dispatching(len);
                }
                Ok(None) => {}
                Err(e) => {
                    warn!("[ID{}]{}，已缓冲{}字节", id, e, self.buffer.len());
                    return self.reject(e);
                }
            }

            self.buffer.reserve(READ_RESERVE);
            let read = match deadline {
                None => self.stream.read_buf(&mut self.buffer).await,
                Some(deadline) => {
                    match timeout_at(deadline, self.stream.read_buf(&mut self.buffer)).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(
                                "[ID{}]等待完整请求超时（{}秒），已缓冲{}字节，关闭连接",
                                id,
                                self.config.request_timeout(),
                                self.buffer.len()
                            );
                            return ConnectionState::Closed;
                        }
                    }
                }
            };

            match read {
                Ok(0) => {
                    debug!(
                        "[ID{}]客户端在请求完整前关闭了连接，丢弃{}字节",
                        id,
                        self.buffer.len()
                    );
                    return ConnectionState::Closed;
                }
                Ok(n) => debug!("[ID{}]读取{}字节", id, n),
                Err(e) => {
                    warn!("[ID{}]读取TCPStream时遇到错误: {}", id, e);
                    return ConnectionState::Closed;
                }
            }
        }
    }

    fn dispatch(&mut self, len: usize) -> ConnectionState {
        let id = self.id;
        let raw = self.buffer.split_to(len);

        let request = match Request::try_from(&raw, id) {
            Ok(request) => request,
            Err(e) => {
                warn!("[ID{}]解析HTTP请求失败: {}", id, e);
                return self.reject(e);
            }
        };

        let response = match resolve(&request, &self.config, id) {
            Ok(target) => Response::from(&target, &request, id, &self.config),
            Err(e) => {
                warn!("[ID{}]无法定位{}: {}", id, request.uri(), e);
                return self.reject(e);
            }
        };

        info!(
            "[ID{}] {}, {}, {}, {}, {}, {}",
            id,
            request.http_version(),
            request.uri(),
            request.method(),
            response.status_code(),
            response.information(),
            request.user_agent(),
        );
        ConnectionState::WritingHeaders(response)
    }

    fn reject(&self, exception: Exception) -> ConnectionState {
        match Response::from_exception(exception) {
            Some(response) => {
                info!(
                    "[ID{}] {}, {}, {}",
                    self.id,
                    response.status_code(),
                    response.information(),
                    exception
                );
                ConnectionState::WritingHeaders(response)
            }
            None => ConnectionState::Closed,
        }
    }

    async fn write_headers(&mut self, mut response: Response) -> ConnectionState {
        self.status_code = Some(response.status_code());
        let producer = response.take_producer();

        if let Err(e) = self.stream.write_all(&response.as_bytes()).await {
            warn!("[ID{}]发送响应头失败（{}）: {}", self.id, Exception::ConnectionReset, e);
            return ConnectionState::Closed;
        }

        match producer {
            Some(producer) => ConnectionState::StreamingBody(producer),
            None => ConnectionState::Closed,
        }
    }

    async fn stream_body(&mut self, mut producer: ContentProducer) -> ConnectionState {
        let id = self.id;
        loop {
            match producer.more().await {
                Ok(Some(chunk)) => {
                    if let Err(e) = self.stream.write_all(&chunk).await {
                        warn!(
                            "[ID{}]流式写入失败（{}），已发送{}字节: {}",
                            id,
                            Exception::ConnectionReset,
                            self.body_bytes,
                            e
                        );
                        return ConnectionState::Closed;
                    }
                    self.body_bytes += chunk.len() as u64;
                    self.body_chunks += 1;
                }
                Ok(None) => {
                    debug!(
                        "[ID{}]流式传输完成，共发送{}字节，{}块",
                        id, self.body_bytes, self.body_chunks
                    );
                    return ConnectionState::Closed;
                }
                Err(e) => {
                    error!("[ID{}]读取文件失败: {}", id, e);
                    return ConnectionState::Closed;
                }
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            debug!("[ID{}]关闭连接时出错: {}", self.id, e);
        }
        debug!("[ID{}]连接已关闭", self.id);
    }
}

impl<S> Connection<S> {
    pub fn id(&self) -> u128 {
        self.id
    }

    /// 已写出响应的状态码；未写出任何响应时为 `None`。
    pub fn status_code(&self) -> Option<u16> {
        self.status_code
    }

    pub fn body_bytes_sent(&self) -> u64 {
        self.body_bytes
    }

    /// 响应体写操作的次数
    pub fn body_chunks_sent(&self) -> usize {
        self.body_chunks
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.state, ConnectionState::Closed)
    }
}
