// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

use std::env;

use chrono::{DateTime, Utc};
use lazy_static::lazy_static;

lazy_static! {
    /// 本机主机名，用于响应头的 `Host` 字段
    pub static ref HOSTNAME: String = detect_hostname();

    /// 操作系统名称与内核版本，用于响应头的 `Server` 字段
    pub static ref SERVER_SIGNATURE: String = detect_server_signature();
}

#[cfg(unix)]
fn read_trimmed(path: &str) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

/// 执行一条系统命令并取其标准输出
#[cfg(all(unix, not(target_os = "linux")))]
fn command_output(program: &str, args: &[&str]) -> Option<String> {
    let output = std::process::Command::new(program).args(args).output().ok()?;
    if !output.status.success() {
        return None;
    }
    let text = String::from_utf8_lossy(&output.stdout).trim().to_string();
    Some(text).filter(|s| !s.is_empty())
}

#[cfg(target_os = "linux")]
fn system_hostname() -> Option<String> {
    read_trimmed("/proc/sys/kernel/hostname").or_else(|| read_trimmed("/etc/hostname"))
}

#[cfg(all(unix, not(target_os = "linux")))]
fn system_hostname() -> Option<String> {
    command_output("hostname", &[]).or_else(|| read_trimmed("/etc/hostname"))
}

#[cfg(not(unix))]
fn system_hostname() -> Option<String> {
    None
}

#[cfg(target_os = "linux")]
fn kernel_release() -> Option<String> {
    read_trimmed("/proc/sys/kernel/osrelease")
}

#[cfg(all(unix, not(target_os = "linux")))]
fn kernel_release() -> Option<String> {
    command_output("uname", &["-r"])
}

#[cfg(not(unix))]
fn kernel_release() -> Option<String> {
    None
}

fn detect_hostname() -> String {
    system_hostname()
        .or_else(|| env::var("HOSTNAME").ok().filter(|h| !h.is_empty()))
        .or_else(|| env::var("COMPUTERNAME").ok().filter(|h| !h.is_empty()))
        .unwrap_or_else(|| "localhost".to_string())
}

fn os_name() -> String {
    match env::consts::OS {
        "linux" => "Linux".to_string(),
        "macos" => "Darwin".to_string(),
        "windows" => "Windows".to_string(),
        "freebsd" => "FreeBSD".to_string(),
        other => {
            let mut chars = other.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        }
    }
}

fn detect_server_signature() -> String {
    match kernel_release() {
        Some(release) => format!("{} {}", os_name(), release),
        None => os_name(),
    }
}

/// 按 RFC 1123 格式化日期，例如 `Sun, 06 Nov 1994 08:49:37 GMT`。
pub fn format_http_date(date: &DateTime<Utc>) -> String {
    date.format("%a, %d %b %Y %H:%M:%S GMT").to_string()
}

pub fn http_date_now() -> String {
    format_http_date(&Utc::now())
}
