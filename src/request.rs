// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # HTTP 请求处理模块
//!
//! 负责将连接上累积的原始字节解析为 `Request`：
//! 1. 以 `\r\n\r\n` 为界判断请求头是否接收完整（POST 还需按 `Content-Length` 等待请求体）。
//! 2. 请求行（方法、URI、版本）的解析。
//! 3. 原样保存请求头（保留顺序、大小写与重复项）。
//! 4. 按方法提取查询参数。

use std::collections::HashMap;

use bytes::Bytes;
use lazy_static::lazy_static;
use log::debug;
use memchr::memmem;
use regex::Regex;

use crate::{exception::Exception, param::*};

lazy_static! {
    /// 查询字符串中的参数分隔符
    static ref QUERY_SEPARATORS: Regex = Regex::new(r"[&#;$]").unwrap();
}

/// 一个完整的 HTTP 请求。构造后不再修改。
#[derive(Debug, Clone)]
pub struct Request {
    method: HttpRequestMethod,
    /// 原始 URI，未做任何规范化
    uri: String,
    /// 原始协议版本字符串
    http_version: String,
    headers: Vec<(String, String)>,
    /// GET/HEAD 恒为空
    body: Bytes,
}

/// 判断缓冲区中是否已有一个完整的请求。
///
/// - `Ok(None)`：还需要更多数据；
/// - `Ok(Some(n))`：前 `n` 个字节构成完整请求；
/// - `Err(RequestTooLarge)`：请求头，或请求头加上声明的请求体，超过 `max_request_size`。
pub fn frame(buffer: &[u8], max_request_size: usize) -> Result<Option<usize>, Exception> {
    let headers_end = match memmem::find(buffer, TERMINATOR) {
        Some(pos) => pos,
        None => {
            if buffer.len() > max_request_size {
                return Err(Exception::RequestTooLarge);
            }
            return Ok(None);
        }
    };
    let head_len = headers_end + TERMINATOR.len();
    if head_len > max_request_size {
        return Err(Exception::RequestTooLarge);
    }

    let head = String::from_utf8_lossy(&buffer[..headers_end]);
    let is_post = head.split(' ').next() == Some("POST");
    let body_len = match is_post {
        true => content_length(
            head.split(CRLF)
                .skip(1)
                .take_while(|line| !line.is_empty())
                .filter_map(|line| line.split_once(':')),
        )
        .unwrap_or(0),
        false => 0,
    };

    let total = head_len.saturating_add(body_len);
    if total > max_request_size {
        return Err(Exception::RequestTooLarge);
    }
    if buffer.len() < total {
        return Ok(None);
    }
    Ok(Some(total))
}

/// 在请求头行中查找格式正确的 `Content-Length`（名称大小写不敏感）。
fn content_length<'a>(mut headers: impl Iterator<Item = (&'a str, &'a str)>) -> Option<usize> {
    headers
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("Content-Length"))
        .and_then(|(_, value)| value.trim().parse::<usize>().ok())
}

impl Request {
    /// 从一段已完整分帧的字节构建 `Request`。
    ///
    /// # 错误处理
    /// - 请求头部分不是 UTF-8：`RequestIsNotUtf8`
    /// - 请求行不是恰好三段：`MalformedRequestLine`
    /// - 方法不是 GET/HEAD/POST：`UnsupportedMethod`
    /// - 请求目标不以 `/` 开头：`MalformedRequestLine`
    pub fn try_from(buffer: &[u8], id: u128) -> Result<Self, Exception> {
        let (head_bytes, rest) = match memmem::find(buffer, TERMINATOR) {
            Some(pos) => (&buffer[..pos], &buffer[pos + TERMINATOR.len()..]),
            None => (buffer, &buffer[buffer.len()..]),
        };
        let head = std::str::from_utf8(head_bytes).map_err(|_| Exception::RequestIsNotUtf8)?;

        let mut lines = head.split(CRLF);
        let request_line = lines.next().unwrap_or("");

        // 1. 请求行 (e.g., "GET /index.html HTTP/1.0")
        let parts: Vec<&str> = request_line.split(' ').collect();
        if parts.len() != 3 {
            debug!("[ID{}]HTTP请求行格式不正确：{}", id, request_line);
            return Err(Exception::MalformedRequestLine);
        }

        // 2. 请求头：遇到第一个空行为止
        let headers: Vec<(String, String)> = lines
            .take_while(|line| !line.is_empty())
            .map(|line| match line.split_once(':') {
                Some((name, value)) => (name.to_string(), value.trim_start().to_string()),
                None => (line.to_string(), String::new()),
            })
            .collect();

        // 3. 方法
        let method = match HttpRequestMethod::from_token(parts[0]) {
            Some(method) => method,
            None => {
                debug!("[ID{}]不支持的HTTP请求方法：{:?}", id, parts[0]);
                return Err(Exception::UnsupportedMethod);
            }
        };

        // 3.1 只接受以 / 开头的 origin-form 目标，否则拼接到根目录后会越出根目录
        if !parts[1].starts_with('/') {
            debug!("[ID{}]请求目标不以/开头：{}", id, parts[1]);
            return Err(Exception::MalformedRequestLine);
        }

        // 4. 请求体：只有 POST 按 Content-Length 读取
        let body = match method {
            HttpRequestMethod::Post => {
                let declared =
                    content_length(headers.iter().map(|(n, v)| (n.as_str(), v.as_str())));
                match declared {
                    Some(len) => Bytes::copy_from_slice(&rest[..len.min(rest.len())]),
                    None => Bytes::new(),
                }
            }
            _ => Bytes::new(),
        };

        Ok(Self {
            method,
            uri: parts[1].to_string(),
            http_version: parts[2].to_string(),
            headers,
            body,
        })
    }

    /// 返回第一个名称匹配（大小写不敏感）的请求头值。
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(n, _)| n.eq_ignore_ascii_case(name))
            .map(|(_, v)| v.as_str())
    }
}

/// 按请求方法提取参数。
///
/// GET 的查询串按 `& # ; $` 中任意一个切分，每一段都必须恰好包含一个 `=`，
/// 否则整个提取失败并返回 `MalformedQuery`；重复的键以最后一次为准。
/// HEAD 与 POST 没有查询参数（POST 的数据保留在请求体中）。
pub fn extract_parameters(
    request: &Request,
    query: Option<&str>,
) -> Result<HashMap<String, String>, Exception> {
    let mut parameters = HashMap::new();
    if request.method() != HttpRequestMethod::Get {
        return Ok(parameters);
    }
    let query = match query {
        Some(q) if !q.is_empty() => q,
        _ => return Ok(parameters),
    };
    for pair in QUERY_SEPARATORS.split(query) {
        let mut kv = pair.split('=');
        match (kv.next(), kv.next(), kv.next()) {
            (Some(key), Some(value), None) => {
                parameters.insert(key.to_string(), value.to_string());
            }
            _ => return Err(Exception::MalformedQuery),
        }
    }
    Ok(parameters)
}

// --- Getter 访问器实现 ---

impl Request {
    pub fn method(&self) -> HttpRequestMethod {
        self.method
    }

    /// 原始 URI（含查询字符串）
    pub fn uri(&self) -> &str {
        &self.uri
    }

    pub fn http_version(&self) -> &str {
        &self.http_version
    }

    pub fn headers(&self) -> &[(String, String)] {
        &self.headers
    }

    pub fn body(&self) -> &Bytes {
        &self.body
    }

    pub fn user_agent(&self) -> &str {
        self.header("User-Agent").unwrap_or("")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(s: &str) -> Result<Request, Exception> {
        Request::try_from(s.as_bytes(), 0)
    }

    #[test]
    fn test_parse_get_request() {
        let request =
            parse("GET /index.html HTTP/1.0\r\nHost: localhost\r\nUser-Agent: Test-Browser\r\n\r\n")
                .unwrap();

        assert_eq!(request.method(), HttpRequestMethod::Get);
        assert_eq!(request.uri(), "/index.html");
        assert_eq!(request.http_version(), "HTTP/1.0");
        assert_eq!(request.user_agent(), "Test-Browser");
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_headers_preserve_order_case_and_duplicates() {
        let request =
            parse("GET / HTTP/1.1\r\nX-Tag: a\r\nhost: h\r\nX-Tag: b\r\nNoColon\r\n\r\n").unwrap();
        assert_eq!(
            request.headers(),
            &[
                ("X-Tag".to_string(), "a".to_string()),
                ("host".to_string(), "h".to_string()),
                ("X-Tag".to_string(), "b".to_string()),
                ("NoColon".to_string(), String::new()),
            ]
        );
        assert_eq!(request.header("HOST"), Some("h"));
    }

    #[test]
    fn test_parse_head_request() {
        let request = parse("HEAD /a.css HTTP/1.0\r\n\r\n").unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Head);
        assert_eq!(request.uri(), "/a.css");
    }

    #[test]
    fn test_parse_post_body_with_content_length() {
        let request =
            parse("POST /submit HTTP/1.0\r\ncontent-length: 10\r\n\r\ntest=value").unwrap();
        assert_eq!(request.method(), HttpRequestMethod::Post);
        assert_eq!(request.body().as_ref(), b"test=value");
    }

    #[test]
    fn test_parse_post_without_content_length_has_empty_body() {
        let request = parse("POST /submit HTTP/1.0\r\n\r\ntrailing").unwrap();
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_parse_post_malformed_content_length_has_empty_body() {
        let request = parse("POST /submit HTTP/1.0\r\nContent-Length: ten\r\n\r\nabc").unwrap();
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_get_ignores_body() {
        let request = parse("GET / HTTP/1.0\r\nContent-Length: 3\r\n\r\nabc").unwrap();
        assert!(request.body().is_empty());
    }

    #[test]
    fn test_unsupported_method() {
        assert_eq!(
            parse("DELETE /resource HTTP/1.0\r\n\r\n").unwrap_err(),
            Exception::UnsupportedMethod
        );
        assert_eq!(parse("get / HTTP/1.0\r\n\r\n").unwrap_err(), Exception::UnsupportedMethod);
        assert_eq!(parse(" / HTTP/1.0\r\n\r\n").unwrap_err(), Exception::UnsupportedMethod);
    }

    #[test]
    fn test_malformed_request_line() {
        for raw in [
            "GET /\r\n\r\n",
            "GET / HTTP/1.0 extra\r\n\r\n",
            "GET  / HTTP/1.0\r\n\r\n",
            "\r\n\r\n",
        ] {
            assert_eq!(parse(raw).unwrap_err(), Exception::MalformedRequestLine, "{:?}", raw);
        }
    }

    #[test]
    fn test_target_must_start_with_slash() {
        for raw in [
            "GET -private/secret.html HTTP/1.0\r\n\r\n",
            "GET etc/passwd HTTP/1.0\r\n\r\n",
            "HEAD index.html HTTP/1.0\r\n\r\n",
            "GET ?a=1 HTTP/1.0\r\n\r\n",
            "GET http://host/index.html HTTP/1.0\r\n\r\n",
        ] {
            assert_eq!(parse(raw).unwrap_err(), Exception::MalformedRequestLine, "{:?}", raw);
        }
        // 不支持的方法优先于目标检查
        assert_eq!(parse("OPTIONS * HTTP/1.0\r\n\r\n").unwrap_err(), Exception::UnsupportedMethod);
    }

    #[test]
    fn test_malformed_line_wins_over_method() {
        assert_eq!(parse("BREW /pot\r\n\r\n").unwrap_err(), Exception::MalformedRequestLine);
    }

    #[test]
    fn test_invalid_utf8() {
        let buffer = vec![0xFF, 0xFE, 0xFD, b'\r', b'\n', b'\r', b'\n'];
        assert_eq!(Request::try_from(&buffer, 0).unwrap_err(), Exception::RequestIsNotUtf8);
    }

    #[test]
    fn test_frame_waits_for_terminator() {
        assert_eq!(frame(b"GET / HTTP/1.0\r\nHost: a\r\n", 1024), Ok(None));
        let raw = b"GET / HTTP/1.0\r\nHost: a\r\n\r\n";
        assert_eq!(frame(raw, 1024), Ok(Some(raw.len())));
    }

    #[test]
    fn test_frame_waits_for_post_body() {
        let head = b"POST /f HTTP/1.0\r\nContent-Length: 5\r\n\r\n";
        assert_eq!(frame(head, 1024), Ok(None));
        let mut full = head.to_vec();
        full.extend_from_slice(b"hello");
        assert_eq!(frame(&full, 1024), Ok(Some(full.len())));
        full.extend_from_slice(b"extra");
        assert_eq!(frame(&full, 1024), Ok(Some(full.len() - 5)));
    }

    #[test]
    fn test_frame_rejects_oversize() {
        let huge = vec![b'a'; 100];
        assert_eq!(frame(&huge, 64), Err(Exception::RequestTooLarge));
        let declared = b"POST /f HTTP/1.0\r\nContent-Length: 1000\r\n\r\n";
        assert_eq!(frame(declared, 256), Err(Exception::RequestTooLarge));
    }

    #[test]
    fn test_extract_parameters_get() {
        let request = parse("GET /p HTTP/1.0\r\n\r\n").unwrap();
        let params = extract_parameters(&request, Some("a=1&b=2")).unwrap();
        assert_eq!(params.len(), 2);
        assert_eq!(params["a"], "1");
        assert_eq!(params["b"], "2");
    }

    #[test]
    fn test_extract_parameters_all_separators_and_last_wins() {
        let request = parse("GET /p HTTP/1.0\r\n\r\n").unwrap();
        let params = extract_parameters(&request, Some("a=1;b=2#c=3$a=4")).unwrap();
        assert_eq!(params["a"], "4");
        assert_eq!(params["b"], "2");
        assert_eq!(params["c"], "3");
    }

    #[test]
    fn test_extract_parameters_malformed() {
        let request = parse("GET /p HTTP/1.0\r\n\r\n").unwrap();
        for query in ["a=1&b", "a", "a=1=2", "a=1&"] {
            assert_eq!(
                extract_parameters(&request, Some(query)),
                Err(Exception::MalformedQuery),
                "{}",
                query
            );
        }
    }

    #[test]
    fn test_extract_parameters_empty_query() {
        let request = parse("GET /p HTTP/1.0\r\n\r\n").unwrap();
        assert!(extract_parameters(&request, None).unwrap().is_empty());
        assert!(extract_parameters(&request, Some("")).unwrap().is_empty());
    }

    #[test]
    fn test_extract_parameters_head_and_post_are_empty() {
        let head = parse("HEAD /p HTTP/1.0\r\n\r\n").unwrap();
        assert!(extract_parameters(&head, Some("broken")).unwrap().is_empty());
        let post = parse("POST /p HTTP/1.0\r\nContent-Length: 3\r\n\r\nx=1").unwrap();
        assert!(extract_parameters(&post, Some("a=1")).unwrap().is_empty());
    }
}
