//! 経過時間の人間向け表記
//!
//! 一覧表示用に「5 sec ago」「2 h ago」のような文字列を生成する。

use chrono::{DateTime, Utc};

/// `timestamp` から `now` までの経過時間を短い英語表記に変換する
///
/// 未来の時刻（時計のずれ）は "just now" として扱う。
pub fn format_time_ago(timestamp: DateTime<Utc>, now: DateTime<Utc>) -> String {
    let span = now.signed_duration_since(timestamp);
    let seconds = span.num_seconds();

    if seconds < 5 {
        return "just now".to_string();
    }
    if seconds < 60 {
        return format!("{} sec ago", seconds);
    }

    let minutes = span.num_minutes();
    if minutes < 60 {
        return format!("{} min ago", minutes);
    }

    let hours = span.num_hours();
    if hours < 24 {
        return format!("{} h ago", hours);
    }

    let days = span.num_days();
    if days < 7 {
        return format!("{} days ago", days);
    }
    if days < 30 {
        let weeks = days / 7;
        return format!("{} week{} ago", weeks, plural(weeks));
    }
    if days < 365 {
        let months = days / 30;
        return format!("{} month{} ago", months, plural(months));
    }

    let years = days / 365;
    format!("{} year{} ago", years, plural(years))
}

fn plural(quantity: i64) -> &'static str {
    if quantity > 1 {
        "s"
    } else {
        ""
    }
}
