// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use serde_derive::Deserialize;

use std::{
    collections::HashMap,
    fs::File,
    io::{self, prelude::*},
};

use crate::param::{HttpRequestMethod, DEFAULT_CONTENT_TYPES};

/// 进程级只读配置。
///
/// 启动时构造一次，之后以 `Arc<Config>` 的形式传给每个 worker 和连接，运行期间不再修改。
#[derive(Deserialize, Debug, Clone)]
pub struct Config {
    #[serde(default = "default_address")]
    address: String,
    #[serde(default = "default_port")]
    port: u16,
    #[serde(default = "default_document_root")]
    document_root: String,
    #[serde(default)]
    workers: usize,
    #[serde(default = "default_forbidden_methods")]
    forbidden_methods: String,
    #[serde(default = "default_index")]
    index: String,
    #[serde(default = "default_chunk_size")]
    chunk_size: usize,
    #[serde(default = "default_max_request_size")]
    max_request_size: usize,
    #[serde(default = "default_request_timeout")]
    request_timeout: u64,
    #[serde(default = "default_log_config")]
    log_config: String,
    #[serde(default = "default_content_types")]
    content_types: HashMap<String, String>,
    #[serde(skip)]
    forbidden: Vec<HttpRequestMethod>,
    /// 规整配置时产生的提示，日志系统初始化后由调用方输出
    #[serde(skip)]
    notices: Vec<String>,
}

fn default_address() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_document_root() -> String {
    "www".to_string()
}

fn default_forbidden_methods() -> String {
    "POST".to_string()
}

fn default_index() -> String {
    "index.html".to_string()
}

fn default_chunk_size() -> usize {
    8192 // 8KB
}

fn default_max_request_size() -> usize {
    8192 // 8KB
}

fn default_request_timeout() -> u64 {
    30
}

fn default_log_config() -> String {
    "config/log4rs.yaml".to_string()
}

fn default_content_types() -> HashMap<String, String> {
    DEFAULT_CONTENT_TYPES.clone()
}

impl Config {
    pub fn new() -> Self {
        Self {
            address: default_address(),
            port: default_port(),
            document_root: default_document_root(),
            workers: 0,
            forbidden_methods: default_forbidden_methods(),
            index: default_index(),
            chunk_size: default_chunk_size(),
            max_request_size: default_max_request_size(),
            request_timeout: default_request_timeout(),
            log_config: default_log_config(),
            content_types: default_content_types(),
            forbidden: vec![],
            notices: vec![],
        }
        .finalize()
    }

    /// 文件不存在或格式错误都返回错误，不会退回默认配置。
    pub fn from_toml(filename: &str) -> io::Result<Self> {
        let mut file = File::open(filename)?;
        let mut str_val = String::new();
        file.read_to_string(&mut str_val)?;
        Self::from_toml_str(&str_val).map_err(|e| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("无法成功从配置文件构建配置对象：{}", e),
            )
        })
    }

    pub fn from_toml_str(content: &str) -> Result<Self, toml::de::Error> {
        let raw_config: Config = toml::from_str(content)?;
        Ok(raw_config.finalize())
    }

    fn notice(&mut self, message: String) {
        if !self.notices.contains(&message) {
            self.notices.push(message);
        }
    }

    fn finalize(mut self) -> Self {
        while self.document_root.len() > 1 && self.document_root.ends_with('/') {
            self.document_root.pop();
        }
        if self.document_root == "/" {
            self.document_root.clear();
        }
        if self.workers == 0 {
            self.workers = num_cpus::get();
        }
        if self.chunk_size == 0 {
            self.chunk_size = default_chunk_size();
            self.notice(format!("chunk_size被设置为0，将改为默认值{}", self.chunk_size));
        }
        if self.max_request_size == 0 {
            self.max_request_size = default_max_request_size();
            self.notice(format!(
                "max_request_size被设置为0，将改为默认值{}",
                self.max_request_size
            ));
        }
        let mut forbidden = vec![];
        let mut ignored = vec![];
        for token in self.forbidden_methods.split(',').map(str::trim) {
            match HttpRequestMethod::from_token(token) {
                Some(method) => forbidden.push(method),
                None if token.is_empty() => {}
                None => ignored.push(token.to_string()),
            }
        }
        self.forbidden = forbidden;
        for token in ignored {
            self.notice(format!("禁用方法列表中的{}不是受支持的方法，已忽略", token));
        }
        self
    }
}

impl Default for Config {
    fn default() -> Self {
        Self::new()
    }
}

// --- 构造辅助，主要供测试和嵌入使用 ---

impl Config {
    pub fn with_address(mut self, address: &str) -> Self {
        self.address = address.to_string();
        self
    }

    pub fn with_port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn with_document_root(mut self, root: &str) -> Self {
        self.document_root = root.to_string();
        self.finalize()
    }

    pub fn with_forbidden_methods(mut self, methods: &str) -> Self {
        self.forbidden_methods = methods.to_string();
        self.finalize()
    }

    pub fn with_chunk_size(mut self, chunk_size: usize) -> Self {
        self.chunk_size = chunk_size;
        self.finalize()
    }

    pub fn with_max_request_size(mut self, max_request_size: usize) -> Self {
        self.max_request_size = max_request_size;
        self.finalize()
    }

    pub fn with_request_timeout(mut self, seconds: u64) -> Self {
        self.request_timeout = seconds;
        self
    }
}

impl Config {
    pub fn address(&self) -> &str {
        &self.address
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    /// 末尾的 `/` 已被去除；根目录 `/` 表示为空串。
    pub fn document_root(&self) -> &str {
        &self.document_root
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    pub fn is_forbidden(&self, method: HttpRequestMethod) -> bool {
        self.forbidden.contains(&method)
    }

    pub fn index(&self) -> &str {
        &self.index
    }

    pub fn chunk_size(&self) -> usize {
        self.chunk_size
    }

    pub fn max_request_size(&self) -> usize {
        self.max_request_size
    }

    /// 等待完整请求的秒数，0 表示不限时。
    pub fn request_timeout(&self) -> u64 {
        self.request_timeout
    }

    pub fn log_config(&self) -> &str {
        &self.log_config
    }

    pub fn content_type(&self, extension: &str) -> Option<&str> {
        self.content_types.get(extension).map(String::as_str)
    }

    /// 载入配置时被修正或忽略的项，应在日志系统初始化后输出。
    pub fn notices(&self) -> &[String] {
        &self.notices
    }
}
