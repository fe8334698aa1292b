// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # Exception 模块
//!
//! 请求处理生命周期中可能出现的各类错误。
//!
//! 解析与解析阶段的错误不会向进程层面传播，而是通过 [`Exception::status_code`]
//! 确定性地转换为 HTTP 状态码；`ConnectionReset` 只终止当前连接。

use std::fmt;

/// 服务器处理请求过程中发生的异常类型。
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Exception {
    /// 请求头部分不是合法的 UTF-8。
    RequestIsNotUtf8,
    /// 请求行无法按空格切分为恰好三段（方法、URI、版本）。
    MalformedRequestLine,
    /// 请求方法不在 GET/HEAD/POST 之内，或缺失。
    UnsupportedMethod,
    /// 查询字符串中某一段缺少 `=`（或包含多个 `=`）。
    MalformedQuery,
    /// 请求头或声明的请求体超过配置的最大请求长度。
    RequestTooLarge,
    /// 解码后的路径包含 `../`。
    ForbiddenPath,
    /// 请求方法在配置的禁用列表中。
    MethodNotAllowed,
    /// 目标文件不存在，或不是普通文件。
    FileNotFound,
    /// 目标文件存在但无法打开。
    FileUnreadable,
    /// 对端在写出响应的过程中关闭了连接。
    ConnectionReset,
}

use Exception::*;

impl Exception {
    /// 该异常对应的 HTTP 状态码。
    ///
    /// `ConnectionReset` 没有可发送的响应，返回 `None`。
    pub fn status_code(&self) -> Option<u16> {
        match self {
            RequestIsNotUtf8 | MalformedRequestLine | MalformedQuery => Some(400),
            UnsupportedMethod | MethodNotAllowed => Some(405),
            RequestTooLarge => Some(413),
            ForbiddenPath => Some(403),
            FileNotFound | FileUnreadable => Some(404),
            ConnectionReset => None,
        }
    }
}

impl fmt::Display for Exception {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RequestIsNotUtf8 => write!(f, "Request bytes can't be parsed in UTF-8"),
            MalformedRequestLine => write!(f, "Malformed request line"),
            UnsupportedMethod => write!(f, "Unsupported request method"),
            MalformedQuery => write!(f, "Malformed query string"),
            RequestTooLarge => write!(f, "Request exceeds the maximum size (413)"),
            ForbiddenPath => write!(f, "Forbidden path (403)"),
            MethodNotAllowed => write!(f, "Method not allowed (405)"),
            FileNotFound => write!(f, "File not found (404)"),
            FileUnreadable => write!(f, "File can't be opened (404)"),
            ConnectionReset => write!(f, "Connection reset by peer"),
        }
    }
}

impl std::error::Error for Exception {}
