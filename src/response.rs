// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use crate::{
    config::Config,
    exception::Exception,
    param::*,
    producer::ContentProducer,
    request::Request,
    resolver::{Outcome, ParsedTarget},
    util::{http_date_now, HOSTNAME, SERVER_SIGNATURE},
};

use bytes::Bytes;
use log::{debug, error, warn};

use std::{fmt, fs::File, path::Path};

/// 响应体来源
pub enum Body {
    Empty,
    /// 内存中的短响应体，随响应头一起写出
    Bytes(Bytes),
    /// 文件响应体，在响应头写出后分块发送
    File(ContentProducer),
}

impl fmt::Debug for Body {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Body::Empty => write!(f, "Empty"),
            Body::Bytes(b) => write!(f, "Bytes({} bytes)", b.len()),
            Body::File(p) => write!(f, "File(chunk_size={})", p.chunk_size()),
        }
    }
}

#[derive(Debug)]
pub struct Response {
    status_code: u16,
    information: String,
    /// 按写出顺序保存
    headers: Vec<(String, String)>,
    body: Body,
}

impl Response {
    /// `200 OK`，带有所有响应都包含的 `Host`、`Date`、`Server`、`Connection` 头。
    pub fn new() -> Self {
        Self {
            status_code: 200,
            information: "OK".to_string(),
            headers: vec![
                ("Host".to_string(), HOSTNAME.clone()),
                ("Date".to_string(), http_date_now()),
                ("Server".to_string(), SERVER_SIGNATURE.clone()),
                ("Connection".to_string(), "close".to_string()),
            ],
            body: Body::Empty,
        }
    }

    fn set_code(&mut self, code: u16) -> &mut Self {
        self.status_code = code;
        self.information = match STATUS_CODES.get(&code) {
            Some(&phrase) => phrase.to_string(),
            None => {
                error!("非法的状态码：{}。这条错误说明代码编写出现了错误。", code);
                "Unknown".to_string()
            }
        };
        self
    }

    /// 设置响应头；同名（大小写不敏感）的头会被替换，否则追加到末尾。
    fn set_header(&mut self, name: &str, value: &str) -> &mut Self {
        match self
            .headers
            .iter_mut()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
        {
            Some(entry) => entry.1 = value.to_string(),
            None => self.headers.push((name.to_string(), value.to_string())),
        }
        self
    }

    fn with_status(code: u16) -> Self {
        let mut response = Self::new();
        response.set_code(code);
        response
    }

    fn with_text(code: u16) -> Self {
        let mut response = Self::with_status(code);
        let text = Bytes::from(response.information.clone());
        response
            .set_header("Content-Type", "text/plain")
            .set_header("Content-Length", &text.len().to_string());
        response.body = Body::Bytes(text);
        response
    }

    /// 根据定位结果构建响应。
    ///
    /// 状态优先级：405 > 403 > 404 > 200。只有 200 且非 HEAD 的请求才带有响应体。
    pub fn from(target: &ParsedTarget, request: &Request, id: u128, config: &Config) -> Self {
        match target.outcome() {
            Outcome::MethodNotAllowed => return Self::with_status(405),
            Outcome::Forbidden => return Self::with_status(403),
            Outcome::Resolved => {}
        }

        let path = target.filesystem_path();
        let file = match File::open(path) {
            Ok(file) => file,
            Err(e) => {
                debug!("[ID{}]无法打开{}：{}", id, path.display(), e);
                return Self::with_status(404);
            }
        };
        let metadata = match file.metadata() {
            Ok(meta) => meta,
            Err(e) => {
                warn!("[ID{}]无法获取文件{}的元数据: {}", id, path.display(), e);
                return Self::with_status(404);
            }
        };
        if !metadata.is_file() {
            debug!("[ID{}]{}不是普通文件", id, path.display());
            return Self::with_status(404);
        }

        let mut response = Self::with_status(200);
        let content_type = detect_content_type(path, config);
        debug!("[ID{}]Content-Type: {}", id, content_type);
        response
            .set_header("Content-Type", content_type)
            .set_header("Content-Length", &metadata.len().to_string());

        if request.method() != HttpRequestMethod::Head {
            response.body = Body::File(ContentProducer::from_std(file, config.chunk_size()));
        } else {
            debug!("[ID{}]HEAD请求，不发送响应体", id);
        }
        response
    }

    /// 为解析或分帧阶段的错误构建响应。
    ///
    /// 400 与 413 带有简短的纯文本响应体；`ConnectionReset` 没有对应的响应。
    pub fn from_exception(exception: Exception) -> Option<Self> {
        match exception.status_code()? {
            code @ (400 | 413) => Some(Self::with_text(code)),
            code => Some(Self::with_status(code)),
        }
    }

    /// 状态行、响应头以及内存中的响应体。文件响应体不包含在内。
    pub fn as_bytes(&self) -> Vec<u8> {
        let mut head = format!(
            "{} {} {}{}",
            RESPONSE_VERSION, self.status_code, self.information, CRLF
        );
        for (name, value) in &self.headers {
            head.push_str(name);
            head.push_str(": ");
            head.push_str(value);
            head.push_str(CRLF);
        }
        head.push_str(CRLF);

        let mut bytes = head.into_bytes();
        if let Body::Bytes(content) = &self.body {
            bytes.extend_from_slice(content);
        }
        bytes
    }

    /// 取出文件响应体，交给连接进行流式发送。
    pub fn take_producer(&mut self) -> Option<ContentProducer> {
        match std::mem::replace(&mut self.body, Body::Empty) {
            Body::File(producer) => Some(producer),
            other => {
                self.body = other;
                None
            }
        }
    }
}

impl Default for Response {
    fn default() -> Self {
        Self::new()
    }
}

impl Response {
    pub fn status_code(&self) -> u16 {
        self.status_code
    }

    pub fn information(&self) -> &str {
        &self.information
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }

    pub fn body(&self) -> &Body {
        &self.body
    }

    pub fn is_streaming(&self) -> bool {
        matches!(self.body, Body::File(_))
    }
}

/// 根据扩展名查找 MIME 类型，查不到时为 `unknown`。
fn detect_content_type<'a>(path: &Path, config: &'a Config) -> &'a str {
    path.extension()
        .and_then(|ext| ext.to_str())
        .and_then(|ext| config.content_type(ext))
        .unwrap_or(UNKNOWN_CONTENT_TYPE)
}
