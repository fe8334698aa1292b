// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::io;

use bytes::{Bytes, BytesMut};
use tokio::{fs::File, io::AsyncReadExt};

/// 按固定大小分块读取文件的响应体来源。
///
/// 读到文件末尾后立即释放文件句柄；此后 `more` 总是返回 `None`。
#[derive(Debug)]
pub struct ContentProducer {
    file: Option<File>,
    chunk_size: usize,
}

impl ContentProducer {
    pub fn new(file: File, chunk_size: usize) -> Self {
        Self {
            file: Some(file),
            chunk_size: chunk_size.max(1),
        }
    }

    /// 从已打开的同步文件句柄构造。
    pub fn from_std(file: std::fs::File, chunk_size: usize) -> Self {
        Self::new(File::from_std(file), chunk_size)
    }

    /// 产生下一个数据块。
    ///
    /// 除最后一块外，每块恰好 `chunk_size` 字节。
    pub async fn more(&mut self) -> io::Result<Option<Bytes>> {
        let file = match self.file.as_mut() {
            Some(file) => file,
            None => return Ok(None),
        };

        let mut chunk = BytesMut::with_capacity(self.chunk_size);
        while chunk.len() < self.chunk_size {
            // read_buf 最多读到剩余容量为止
            let mut limited = (&mut *file).take((self.chunk_size - chunk.len()) as u64);
            if limited.read_buf(&mut chunk).await? == 0 {
                break;
            }
        }

        if chunk.is_empty() {
            self.file = None;
            return Ok(None);
        }
        Ok(Some(chunk.freeze()))
    }

    pub fn is_exhausted(&self) -> bool {
        self.file.is_none()
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }
}
