// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 协议参数与常量模块
//!
//! - 服务器会产生的 HTTP 状态码及其原因短语。
//! - 默认的扩展名到 MIME 类型映射表。
//! - 受支持的 HTTP 方法的强类型枚举。

use lazy_static::lazy_static;
use std::collections::HashMap;

/// HTTP 协议规定的换行符
pub const CRLF: &str = "\r\n";

/// 请求头结束标志
pub const TERMINATOR: &[u8] = b"\r\n\r\n";

/// 响应状态行使用的协议版本。服务器从不提供持久连接，因此始终是 HTTP/1.0。
pub const RESPONSE_VERSION: &str = "HTTP/1.0";

/// 无法识别扩展名时 `Content-Type` 的取值
pub const UNKNOWN_CONTENT_TYPE: &str = "unknown";

lazy_static! {
    /// 服务器可能产生的状态码与原因短语。
    ///
    /// 参考标准：[RFC 9110: HTTP Semantics](https://www.rfc-editor.org/rfc/rfc9110.html)。
    pub static ref STATUS_CODES: HashMap<u16, &'static str> = {
        let mut map = HashMap::new();
        map.insert(200, "OK");
        map.insert(400, "Bad Request");
        map.insert(403, "Forbidden");
        map.insert(404, "Not Found");
        map.insert(405, "Method Not Allowed");
        map.insert(413, "Content Too Large");
        map
    };
}

lazy_static! {
    /// 默认的文件后缀名到 MIME 类型的映射表，可在配置文件的 `[content_types]` 中覆盖。
    pub static ref DEFAULT_CONTENT_TYPES: HashMap<String, String> = {
        let mut map = HashMap::new();
        for (ext, mime) in [
            ("html", "text/html"),
            ("css", "text/css"),
            ("js", "application/javascript"),
            ("jpg", "image/jpeg"),
            ("jpeg", "image/jpeg"),
            ("png", "image/png"),
            ("gif", "image/gif"),
            ("swf", "application/x-shockwave-flash"),
        ] {
            map.insert(ext.to_string(), mime.to_string());
        }
        map
    };
}

/// 受支持的 HTTP 请求方法
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum HttpRequestMethod {
    /// 获取资源
    Get,
    /// 获取资源的元数据（不包含响应体）
    Head,
    /// 提交数据
    Post,
}

impl HttpRequestMethod {
    /// 按大小写敏感的方式匹配方法名，不支持的方法返回 `None`。
    pub fn from_token(token: &str) -> Option<Self> {
        match token {
            "GET" => Some(HttpRequestMethod::Get),
            "HEAD" => Some(HttpRequestMethod::Head),
            "POST" => Some(HttpRequestMethod::Post),
            _ => None,
        }
    }
}

use std::fmt;

impl fmt::Display for HttpRequestMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            HttpRequestMethod::Get => write!(f, "GET"),
            HttpRequestMethod::Head => write!(f, "HEAD"),
            HttpRequestMethod::Post => write!(f, "POST"),
        }
    }
}
