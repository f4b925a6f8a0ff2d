//! リクエストスナップショット
//!
//! メソッド・パス・クエリ・ヘッダー・ボディを読み取る。ボディは一度メモリに
//! 読み切ってから再生可能なボディとしてハンドラーに渡すため、ハンドラー側の読み取りは
//! 影響を受けない。キャプチャ上限を超えるボディは記録せず、残りはそのまま流す。

use crate::capture::body::DrainedBody;
use crate::common::ip::{forwarded_client_ip, normalize_socket_ip};
use axum::body::Body;
use axum::extract::{ConnectInfo, DefaultBodyLimit, FromRequest, Multipart};
use axum::http::{header, request::Parts, HeaderMap, Request};
use bytes::Bytes;
use serde::Serialize;
use std::collections::BTreeMap;
use std::convert::Infallible;
use std::net::SocketAddr;
use tower::{service_fn, Layer, ServiceExt};
use tracing::debug;

/// 認証レイヤーが設定する呼び出し元識別子
///
/// 設定されていれば User-Agent の代わりに記録される。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallerIdentity(pub String);

/// リクエスト側の記録内容
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RequestSnapshot {
    /// HTTPメソッド
    pub http_method: String,
    /// リクエストパス
    pub request_path: String,
    /// クエリ文字列（先頭の `?` なし）
    pub query_string: Option<String>,
    /// ヘッダー（JSON）
    pub request_headers: Option<String>,
    /// ボディ
    pub request_body: Option<String>,
    /// ホスト名
    pub hostname: Option<String>,
    /// クライアントIP
    pub client_ip: Option<String>,
    /// 呼び出し元識別子またはUser-Agent
    pub user_agent: Option<String>,
}

impl RequestSnapshot {
    /// ボディ以外の項目を読み取る
    pub fn from_parts(parts: &Parts) -> Self {
        let query_string = parts
            .uri
            .query()
            .filter(|query| !query.is_empty())
            .map(str::to_string);

        let hostname = parts
            .headers
            .get(header::HOST)
            .and_then(|value| value.to_str().ok())
            .map(str::to_string)
            .or_else(|| parts.uri.authority().map(|authority| authority.to_string()));

        let client_ip = forwarded_client_ip(&parts.headers).or_else(|| {
            parts
                .extensions
                .get::<ConnectInfo<SocketAddr>>()
                .map(|ConnectInfo(addr)| normalize_socket_ip(addr).to_string())
        });

        let user_agent = parts
            .extensions
            .get::<CallerIdentity>()
            .map(|identity| identity.0.clone())
            .or_else(|| {
                parts
                    .headers
                    .get(header::USER_AGENT)
                    .and_then(|value| value.to_str().ok())
                    .map(str::to_string)
            });

        Self {
            http_method: parts.method.to_string(),
            request_path: parts.uri.path().to_string(),
            query_string,
            request_headers: headers_to_json(&parts.headers),
            request_body: None,
            hostname,
            client_ip,
            user_agent,
        }
    }

    /// ボディを読み取り、ハンドラーに渡す再生用ボディを返す
    ///
    /// 読み取りエラー時は読めた部分までを記録し、ハンドラーには同じ部分と同じエラーを渡す。
    /// `max_body_bytes` を超えるボディは打ち切りの文言だけを記録する。
    pub async fn capture_body(
        &mut self,
        headers: &HeaderMap,
        body: Body,
        max_body_bytes: usize,
    ) -> Body {
        let drained = DrainedBody::drain_limited(body, max_body_bytes).await;

        if let Some(message) = drained.error_message() {
            debug!(error = %message, "Request body ended with an error; recording prefix");
        }
        if drained.is_truncated() {
            debug!(
                limit = max_body_bytes,
                "Request body exceeds capture limit; body not recorded"
            );
        }

        self.request_body = match multipart_content_type(headers) {
            _ if drained.is_truncated() => drained.text(),
            Some(content_type) if drained.error_message().is_none() => {
                describe_multipart(content_type, drained.bytes().clone()).await
            }
            Some(_) => None,
            None => drained.text(),
        };

        drained.into_body()
    }
}

/// ヘッダーを `{name: "v1,v2"}` 形式のJSONに変換
pub fn headers_to_json(headers: &HeaderMap) -> Option<String> {
    let mut map: BTreeMap<&str, String> = BTreeMap::new();
    for name in headers.keys() {
        let joined = headers
            .get_all(name)
            .iter()
            .map(|value| String::from_utf8_lossy(value.as_bytes()).into_owned())
            .collect::<Vec<_>>()
            .join(",");
        map.insert(name.as_str(), joined);
    }
    serde_json::to_string(&map).ok()
}

fn multipart_content_type(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .filter(|value| {
            value
                .trim_start()
                .to_ascii_lowercase()
                .starts_with("multipart/form-data")
        })
}

#[derive(Debug, Default, Serialize)]
struct MultipartDescription {
    fields: BTreeMap<String, String>,
    files: Vec<MultipartFile>,
}

#[derive(Debug, Serialize)]
struct MultipartFile {
    name: String,
    file_name: String,
    length: usize,
    content_type: Option<String>,
}

/// multipartボディをフィールドとファイル一覧の説明に変換
///
/// 生のバイト列は記録しない。解析に失敗した場合は `None`。
/// バイト列はキャプチャ上限で抑えてあるので、axum既定のボディ上限は外して解析する。
async fn describe_multipart(content_type: &str, bytes: Bytes) -> Option<String> {
    let request = Request::builder()
        .header(header::CONTENT_TYPE, content_type)
        .body(Body::from(bytes))
        .ok()?;

    let parse = service_fn(|request: Request<Body>| async move {
        Ok::<_, Infallible>(parse_multipart(request).await)
    });
    DefaultBodyLimit::disable()
        .layer(parse)
        .oneshot(request)
        .await
        .ok()
        .flatten()
}

async fn parse_multipart(request: Request<Body>) -> Option<String> {
    let mut multipart = match Multipart::from_request(request, &()).await {
        Ok(multipart) => multipart,
        Err(rejection) => {
            debug!(error = %rejection, "Failed to open multipart body");
            return None;
        }
    };

    let mut description = MultipartDescription::default();
    loop {
        let field = match multipart.next_field().await {
            Ok(Some(field)) => field,
            Ok(None) => break,
            Err(err) => {
                debug!(error = %err, "Failed to parse multipart body");
                return None;
            }
        };

        let name = field.name().unwrap_or_default().to_string();
        let file_name = field.file_name().map(str::to_string);
        let field_content_type = field.content_type().map(str::to_string);
        let data = match field.bytes().await {
            Ok(data) => data,
            Err(err) => {
                debug!(error = %err, field = %name, "Failed to read multipart field");
                return None;
            }
        };

        match file_name {
            Some(file_name) => description.files.push(MultipartFile {
                name,
                file_name,
                length: data.len(),
                content_type: field_content_type,
            }),
            None => {
                if data.is_empty() {
                    continue;
                }
                let value = String::from_utf8_lossy(&data).into_owned();
                description
                    .fields
                    .entry(name)
                    .and_modify(|existing| {
                        existing.push(',');
                        existing.push_str(&value);
                    })
                    .or_insert(value);
            }
        }
    }

    serde_json::to_string_pretty(&description).ok()
}
