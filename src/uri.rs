// Copyright (c) 2026 shaneyale (shaneyale86@gmail.com)
// All rights reserved.

//! # URI 规范化与解码
//!
//! `decode` 总是作用在 `normalize` 的结果之上；解码产生的新的 `//` 不会被再次折叠。

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    static ref REPEATED: [(Regex, &'static str); 3] = [
        (Regex::new(r"/{2,}").unwrap(), "/"),
        (Regex::new(r"\?{2,}").unwrap(), "?"),
        (Regex::new(r"#{2,}").unwrap(), "#"),
    ];
}

/// 将连续出现两次及以上的 `/`、`?`、`#` 折叠为一个。
pub fn normalize(uri: &str) -> String {
    let mut result = uri.to_string();
    for (re, replacement) in REPEATED.iter() {
        result = re.replace_all(&result, *replacement).into_owned();
    }
    result
}

fn hex_value(byte: u8) -> Option<u8> {
    match byte {
        b'0'..=b'9' => Some(byte - b'0'),
        b'a'..=b'f' => Some(byte - b'a' + 10),
        b'A'..=b'F' => Some(byte - b'A' + 10),
        _ => None,
    }
}

/// 百分号解码。
///
/// 只替换值落在可打印 ASCII 范围（`0x20..=0x7E`）内的 `%XX`，`+` 替换为空格；
/// 其余转义（控制字符、非 ASCII 字节、残缺的 `%`）原样保留，不会报错。
pub fn decode(uri: &str) -> String {
    let bytes = uri.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        match bytes[i] {
            b'%' => {
                let decoded = match (bytes.get(i + 1), bytes.get(i + 2)) {
                    (Some(&hi), Some(&lo)) => match (hex_value(hi), hex_value(lo)) {
                        (Some(hi), Some(lo)) => Some(hi * 16 + lo),
                        _ => None,
                    },
                    _ => None,
                };
                match decoded {
                    Some(value) if (0x20..=0x7e).contains(&value) => {
                        out.push(value);
                        i += 3;
                    }
                    _ => {
                        out.push(b'%');
                        i += 1;
                    }
                }
            }
            b'+' => {
                out.push(b' ');
                i += 1;
            }
            other => {
                out.push(other);
                i += 1;
            }
        }
    }
    // 只有整段 ASCII 转义被替换为 ASCII 字节，原有的多字节序列保持完整
    String::from_utf8(out).unwrap_or_else(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_normalize_collapses_runs() {
        assert_eq!(normalize("//a///b"), "/a/b");
        assert_eq!(normalize("/a??b"), "/a?b");
        assert_eq!(normalize("/a##b"), "/a#b");
        assert_eq!(normalize("/a/?#b"), "/a/?#b");
    }

    #[test]
    fn test_normalize_plain_uri_unchanged() {
        assert_eq!(normalize("/index.html"), "/index.html");
        assert_eq!(normalize(""), "");
    }

    #[test]
    fn test_decode_recognized_escapes() {
        assert_eq!(decode("/a%20b"), "/a b");
        assert_eq!(decode("/a%2Fb"), "/a/b");
        assert_eq!(decode("/a%2fb"), "/a/b");
        assert_eq!(decode("%2e%2e%2f"), "../");
        assert_eq!(decode("/a+b"), "/a b");
    }

    #[test]
    fn test_decode_leaves_unrecognized_verbatim() {
        assert_eq!(decode("/a%zzb"), "/a%zzb");
        assert_eq!(decode("/a%00b"), "/a%00b");
        assert_eq!(decode("/a%C3%A9"), "/a%C3%A9");
        assert_eq!(decode("/a%4"), "/a%4");
        assert_eq!(decode("/a%"), "/a%");
    }

    #[test]
    fn test_decode_single_pass() {
        assert_eq!(decode("%2541"), "%41");
    }

    #[test]
    fn test_decode_keeps_multibyte_text() {
        assert_eq!(decode("/文件%20名"), "/文件 名");
    }

    #[test]
    fn test_decoded_slashes_not_renormalized() {
        assert_eq!(decode(&normalize("/a/%2F/b")), "/a///b");
    }

    proptest! {
        #[test]
        fn prop_normalize_idempotent(uri in "[/?#a-z%.]{0,32}") {
            let once = normalize(&uri);
            prop_assert_eq!(normalize(&once), once);
        }

        #[test]
        fn prop_decode_never_grows(uri in "\\PC{0,32}") {
            prop_assert!(decode(&uri).len() <= uri.len());
        }
    }
}
