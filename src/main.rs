// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 静态文件 Web 服务器
//!
//! 启动流程：
//! - 从 TOML 文件载入只读配置（路径为第一个命令行参数，默认 `config/development.toml`）
//! - 按配置初始化 log4rs 日志
//! - 启动若干个共享同一端口的独立 worker

use std::{env, process};

use log::{error, info, warn};

use staticd::{run_workers, Config};

const DEFAULT_CONFIG: &str = "config/development.toml";

fn main() {
    // 1. 载入配置
    let config_path = env::args()
        .nth(1)
        .unwrap_or_else(|| DEFAULT_CONFIG.to_string());
    let config = match Config::from_toml(&config_path) {
        Ok(config) => config,
        Err(e) => {
            eprintln!("无法读取配置文件{}：{}", config_path, e);
            process::exit(1);
        }
    };

    // 2. 初始化日志系统：日志级别与输出目的地由 YAML 配置决定
    if let Err(e) = log4rs::init_file(config.log_config(), Default::default()) {
        eprintln!("无法初始化日志配置{}：{}", config.log_config(), e);
        process::exit(1);
    }
    info!("配置文件{}已载入", config_path);
    for notice in config.notices() {
        warn!("{}", notice);
    }
    info!(
        "服务端将在{}:{}上监听，worker数量：{}",
        config.address(),
        config.port(),
        config.workers()
    );

    // 3. 启动 worker，直到全部退出
    if let Err(e) = run_workers(config) {
        error!("服务器异常退出：{}", e);
        process::exit(1);
    }
    info!("服务器已关闭");
}
