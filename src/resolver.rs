// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # 资源定位
//!
//! 将请求的 URI 映射到文档根目录下的文件系统路径。
//!
//! 安全边界基于子串判断：解码后的路径中只要出现 `../` 就一律拒绝，
//! 不论它最终是否真的越出根目录。符号链接不做二次校验。

use std::{collections::HashMap, path::PathBuf};

use log::debug;

use crate::{
    config::Config,
    exception::Exception,
    request::{extract_parameters, Request},
    uri::{decode, normalize},
};

/// 资源定位的结果分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Resolved,
    /// 路径中包含 `../`
    Forbidden,
    /// 请求方法在禁用列表中
    MethodNotAllowed,
}

#[derive(Debug, Clone)]
pub struct ParsedTarget {
    filesystem_path: PathBuf,
    parameters: HashMap<String, String>,
    outcome: Outcome,
}

impl ParsedTarget {
    pub fn filesystem_path(&self) -> &PathBuf {
        &self.filesystem_path
    }

    pub fn parameters(&self) -> &HashMap<String, String> {
        &self.parameters
    }

    pub fn outcome(&self) -> Outcome {
        self.outcome
    }
}

/// 定位请求的目标资源。
///
/// 方法禁用检查最先进行，且不解析查询串；查询串格式错误时返回 `MalformedQuery`。
pub fn resolve(request: &Request, config: &Config, id: u128) -> Result<ParsedTarget, Exception> {
    let (path, query) = match request.uri().split_once('?') {
        Some((path, query)) => (path, Some(query)),
        None => (request.uri(), None),
    };

    if config.is_forbidden(request.method()) {
        debug!("[ID{}]请求方法{}已被禁用", id, request.method());
        return Ok(ParsedTarget {
            filesystem_path: PathBuf::new(),
            parameters: HashMap::new(),
            outcome: Outcome::MethodNotAllowed,
        });
    }

    let parameters = extract_parameters(request, query)?;

    let mut location = decode(&normalize(path));
    if location.contains("../") {
        debug!("[ID{}]路径{}包含../，拒绝访问", id, location);
        return Ok(ParsedTarget {
            filesystem_path: PathBuf::new(),
            parameters,
            outcome: Outcome::Forbidden,
        });
    }

    if location.ends_with('/') {
        location.push_str(config.index());
    }

    let filesystem_path = PathBuf::from(format!("{}{}", config.document_root(), location));
    debug!("[ID{}]映射物理路径：{}", id, filesystem_path.display());

    Ok(ParsedTarget {
        filesystem_path,
        parameters,
        outcome: Outcome::Resolved,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn request(raw: &str) -> Request {
        Request::try_from(raw.as_bytes(), 0).unwrap()
    }

    fn get(uri: &str) -> Request {
        request(&format!("GET {} HTTP/1.0\r\n\r\n", uri))
    }

    fn srv() -> Config {
        Config::new().with_document_root("/srv/")
    }

    #[test]
    fn test_root_maps_to_index() {
        let target = resolve(&get("/"), &srv(), 0).unwrap();
        assert_eq!(target.outcome(), Outcome::Resolved);
        assert_eq!(target.filesystem_path(), &PathBuf::from("/srv/index.html"));
    }

    #[test]
    fn test_subdirectory_maps_to_index() {
        let target = resolve(&get("/docs//"), &srv(), 0).unwrap();
        assert_eq!(target.filesystem_path(), &PathBuf::from("/srv/docs/index.html"));
    }

    #[test]
    fn test_decoded_path() {
        let target = resolve(&get("//my%20page.html?x=1"), &srv(), 0).unwrap();
        assert_eq!(target.filesystem_path(), &PathBuf::from("/srv/my page.html"));
        assert_eq!(target.parameters()["x"], "1");
    }

    #[test]
    fn test_traversal_forbidden() {
        for uri in ["/../etc/passwd", "/a/../b", "/%2e%2e%2fetc/passwd", "/..%2Fetc"] {
            let target = resolve(&get(uri), &srv(), 0).unwrap();
            assert_eq!(target.outcome(), Outcome::Forbidden, "{}", uri);
        }
    }

    #[test]
    fn test_target_without_leading_slash_never_resolves() {
        // 无法构造出这样的请求，因此不会拼接成 /srv-private/... 或相对路径
        for uri in ["-private/secret.html", "etc/passwd"] {
            let raw = format!("GET {} HTTP/1.0\r\n\r\n", uri);
            assert_eq!(
                Request::try_from(raw.as_bytes(), 0).unwrap_err(),
                Exception::MalformedRequestLine
            );
        }
    }

    #[test]
    fn test_filesystem_root_stays_absolute() {
        let config = Config::new().with_document_root("/");
        let target = resolve(&get("/etc/hosts"), &config, 0).unwrap();
        assert_eq!(target.filesystem_path(), &PathBuf::from("/etc/hosts"));
        let target = resolve(&get("/"), &config, 0).unwrap();
        assert_eq!(target.filesystem_path(), &PathBuf::from("/index.html"));
    }

    #[test]
    fn test_dotdot_without_slash_is_allowed() {
        let target = resolve(&get("/a..b"), &srv(), 0).unwrap();
        assert_eq!(target.outcome(), Outcome::Resolved);
    }

    #[test]
    fn test_forbidden_method() {
        let post = request("POST /index.html HTTP/1.0\r\n\r\n");
        let target = resolve(&post, &srv(), 0).unwrap();
        assert_eq!(target.outcome(), Outcome::MethodNotAllowed);

        let allowed = srv().with_forbidden_methods("");
        let target = resolve(&post, &allowed, 0).unwrap();
        assert_eq!(target.outcome(), Outcome::Resolved);
    }

    #[test]
    fn test_method_gate_precedes_traversal_and_query() {
        let config = srv().with_forbidden_methods("GET");
        let target = resolve(&get("/../x?broken"), &config, 0).unwrap();
        assert_eq!(target.outcome(), Outcome::MethodNotAllowed);
    }

    #[test]
    fn test_malformed_query() {
        assert_eq!(
            resolve(&get("/p?a=1&b"), &srv(), 0).unwrap_err(),
            Exception::MalformedQuery
        );
    }

    #[test]
    fn test_query_split_on_first_question_mark() {
        let target = resolve(&get("/p?a=x?y"), &srv(), 0).unwrap();
        assert_eq!(target.parameters()["a"], "x?y");
        assert_eq!(target.filesystem_path(), &PathBuf::from("/srv/p"));
    }

    proptest! {
        #[test]
        fn prop_paths_without_traversal_stay_under_root(segments in proptest::collection::vec("[a-z0-9.]{1,8}", 1..5)) {
            let uri = format!("/{}", segments.join("/"));
            prop_assume!(!uri.contains("../"));
            let target = resolve(&get(&uri), &srv(), 0).unwrap();
            prop_assert_eq!(target.outcome(), Outcome::Resolved);
            prop_assert!(target.filesystem_path().to_string_lossy().starts_with("/srv/"));
        }

        #[test]
        fn prop_traversal_always_forbidden(prefix in "[a-z/]{0,8}", suffix in "[a-z/]{0,8}") {
            let uri = format!("/{}../{}", prefix, suffix);
            let target = resolve(&get(&uri), &srv(), 0).unwrap();
            prop_assert_eq!(target.outcome(), Outcome::Forbidden);
        }
    }
}
