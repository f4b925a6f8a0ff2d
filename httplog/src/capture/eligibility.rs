//! キャプチャ対象判定
//!
//! ハンドラーグループは [`HandlerGroup::API_LOGGABLE`] でキャプチャ対象であることを宣言する。
//! 起動時に [`HandlerRegistry`] へルートとアクションを登録し、リクエストごとに
//! マッチしたルート（`MatchedPath`）から対象かどうかを引く。

use axum::extract::MatchedPath;
use axum::http::Request;
use std::collections::HashMap;

/// ハンドラーグループ（コントローラー相当）の宣言
pub trait HandlerGroup {
    /// グループ名
    const NAME: &'static str;
    /// キャプチャ対象かどうか
    const API_LOGGABLE: bool = false;
}

/// 上流レイヤーが設定するハンドラー名
///
/// ルートにマッチしなかったリクエストで、名前によるフォールバック判定に使う。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerName(pub String);

/// 登録済みルートのハンドラー情報
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HandlerDescriptor {
    /// グループ名
    pub group: &'static str,
    /// アクション名
    pub action: &'static str,
    /// キャプチャ対象かどうか
    pub loggable: bool,
}

impl HandlerDescriptor {
    /// `{group}@{action}` 形式の識別子
    pub fn controller_action(&self) -> String {
        format!("{}@{}", self.group, self.action)
    }
}

/// 判定結果
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Eligibility {
    /// 対象外（そのまま通過）
    NotEligible,
    /// キャプチャ対象
    Eligible {
        /// ルートにマッチした場合のハンドラー識別子
        controller_action: Option<String>,
    },
}

impl Eligibility {
    /// キャプチャ対象かどうか
    pub fn is_eligible(&self) -> bool {
        matches!(self, Self::Eligible { .. })
    }
}

/// ルート → ハンドラー情報のレジストリ
#[derive(Debug, Clone, Default)]
pub struct HandlerRegistry {
    routes: HashMap<String, HandlerDescriptor>,
    groups: HashMap<String, bool>,
}

/// [`HandlerRegistry`] のビルダー
#[derive(Debug, Default)]
pub struct HandlerRegistryBuilder {
    registry: HandlerRegistry,
}

impl HandlerRegistryBuilder {
    /// ルートパターン（axumのパス記法）にグループのアクションを登録
    pub fn register<G: HandlerGroup>(mut self, route: &str, action: &'static str) -> Self {
        self.registry.routes.insert(
            route.to_string(),
            HandlerDescriptor {
                group: G::NAME,
                action,
                loggable: G::API_LOGGABLE,
            },
        );
        self.registry
            .groups
            .insert(normalize_group_name(G::NAME), G::API_LOGGABLE);
        self
    }

    /// レジストリを確定
    pub fn build(self) -> HandlerRegistry {
        self.registry
    }
}

impl HandlerRegistry {
    /// ビルダーを作成
    pub fn builder() -> HandlerRegistryBuilder {
        HandlerRegistryBuilder::default()
    }

    /// ルートパターンからハンドラー情報を取得
    pub fn lookup_route(&self, route: &str) -> Option<&HandlerDescriptor> {
        self.routes.get(route)
    }

    /// グループ名（大文字小文字無視、`Controller` 接尾辞は任意）から対象かどうかを取得
    pub fn lookup_group(&self, name: &str) -> Option<bool> {
        self.groups.get(&normalize_group_name(name)).copied()
    }

    /// リクエストがキャプチャ対象かどうかを判定する
    ///
    /// マッチしたルートがあればその宣言に従う。マッチしなかった場合は
    /// `HandlerName` 拡張、なければパスの先頭セグメントをグループ名として引く。
    /// いずれでも解決できなければ対象外。
    pub fn resolve<B>(&self, request: &Request<B>) -> Eligibility {
        let matched = request
            .extensions()
            .get::<MatchedPath>()
            .map(MatchedPath::as_str);
        let handler_name = request
            .extensions()
            .get::<HandlerName>()
            .map(|name| name.0.as_str());
        self.resolve_route(matched, handler_name, request.uri().path())
    }

    /// ルートパターン・ハンドラー名・パスから判定する
    pub fn resolve_route(
        &self,
        matched_route: Option<&str>,
        handler_name: Option<&str>,
        path: &str,
    ) -> Eligibility {
        if let Some(descriptor) = matched_route.and_then(|route| self.lookup_route(route)) {
            return if descriptor.loggable {
                Eligibility::Eligible {
                    controller_action: Some(descriptor.controller_action()),
                }
            } else {
                Eligibility::NotEligible
            };
        }

        let fallback_name = handler_name.or_else(|| first_path_segment(path));

        match fallback_name.and_then(|name| self.lookup_group(name)) {
            Some(true) => Eligibility::Eligible {
                controller_action: None,
            },
            _ => Eligibility::NotEligible,
        }
    }
}

fn normalize_group_name(name: &str) -> String {
    let lower = name.trim().to_ascii_lowercase();
    match lower.strip_suffix("controller") {
        Some(stripped) if !stripped.is_empty() => stripped.to_string(),
        _ => lower,
    }
}

fn first_path_segment(path: &str) -> Option<&str> {
    path.split('/').find(|segment| !segment.is_empty())
}
