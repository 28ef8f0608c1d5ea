use axum::http::{HeaderName, HeaderValue, Method};
use std::time::Duration;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, Any, CorsLayer, ExposeHeaders};

use crate::config::CorsConfig;

/// 配置列表的解析结果："*" 归为 Any，其余逐项解析，非法值跳过并告警。
#[derive(Debug, PartialEq)]
enum ListSpec<T> {
    Any,
    List(Vec<T>),
}

impl<T> ListSpec<T> {
    fn is_any(&self) -> bool {
        matches!(self, ListSpec::Any)
    }

    fn is_empty(&self) -> bool {
        matches!(self, ListSpec::List(v) if v.is_empty())
    }
}

fn parse_list<T>(
    label: &str,
    values: &[String],
    parse: impl Fn(&str) -> Option<T>,
) -> ListSpec<T> {
    let mut items = Vec::new();
    for raw in values {
        let value = raw.trim();
        if value.is_empty() {
            continue;
        }
        if value == "*" {
            return ListSpec::Any;
        }
        match parse(value) {
            Some(v) => items.push(v),
            None => tracing::warn!("CORS {} 含无效值: {}", label, value),
        }
    }
    ListSpec::List(items)
}

fn parse_origin(v: &str) -> Option<HeaderValue> {
    HeaderValue::from_str(v).ok()
}

fn parse_method(v: &str) -> Option<Method> {
    Method::from_bytes(v.to_ascii_uppercase().as_bytes()).ok()
}

fn parse_header(v: &str) -> Option<HeaderName> {
    HeaderName::from_bytes(v.to_ascii_lowercase().as_bytes()).ok()
}

/// 根据配置构建 CORS 中间件；未启用或配置无效时返回 None。
pub fn build_cors_layer(cors: &CorsConfig) -> Option<CorsLayer> {
    if !cors.enabled {
        return None;
    }

    let origins = parse_list("allowed_origins", &cors.allowed_origins, parse_origin);
    if origins.is_empty() {
        tracing::warn!("CORS 已启用但 allowed_origins 为空，已跳过启用");
        return None;
    }
    let methods = parse_list("allowed_methods", &cors.allowed_methods, parse_method);
    let headers = parse_list("allowed_headers", &cors.allowed_headers, parse_header);
    let expose = parse_list("expose_headers", &cors.expose_headers, parse_header);

    if cors.allow_credentials
        && (origins.is_any() || methods.is_any() || headers.is_any() || expose.is_any())
    {
        tracing::error!("CORS 配置无效：allow_credentials=true 不能与 \"*\" 同时使用，已跳过启用");
        return None;
    }

    let mut layer = CorsLayer::new().allow_origin(match origins {
        ListSpec::Any => AllowOrigin::from(Any),
        ListSpec::List(v) => AllowOrigin::list(v),
    });

    layer = match methods {
        ListSpec::Any => layer.allow_methods(AllowMethods::any()),
        ListSpec::List(v) if !v.is_empty() => layer.allow_methods(v),
        ListSpec::List(_) => layer,
    };
    layer = match headers {
        ListSpec::Any => layer.allow_headers(AllowHeaders::any()),
        ListSpec::List(v) if !v.is_empty() => layer.allow_headers(v),
        ListSpec::List(_) => layer,
    };
    layer = match expose {
        ListSpec::Any => layer.expose_headers(ExposeHeaders::any()),
        ListSpec::List(v) if !v.is_empty() => layer.expose_headers(v),
        ListSpec::List(_) => layer,
    };

    if cors.allow_credentials {
        layer = layer.allow_credentials(true);
    }

    if let Some(secs) = cors.max_age_secs.filter(|s| *s > 0) {
        layer = layer.max_age(Duration::from_secs(secs));
    }

    Some(layer)
}
