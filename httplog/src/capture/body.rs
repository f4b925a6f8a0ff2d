//! ボディの読み切りと再生
//!
//! ストリームを最後まで（またはエラーまで）メモリに読み込み、同じバイト列・
//! トレーラー・エラーをもう一度流せる [`ReplayBody`] に変換する。
//!
//! [`DrainedBody::drain_limited`] は上限を超えた時点で読み込みを止め、
//! 未読のストリームを保持する。再生時は読み込み済みの先頭部分に続けて
//! 残りをそのまま流すため、上限を超えたボディもメモリには載りきらない。

use axum::body::Body;
use axum::http::HeaderMap;
use bytes::{Bytes, BytesMut};
use http_body::{Frame, SizeHint};
use http_body_util::BodyExt;
use std::pin::Pin;
use std::task::{Context, Poll};

/// 読み切ったボディ
#[derive(Debug, Default)]
pub struct DrainedBody {
    data: Bytes,
    trailers: Option<HeaderMap>,
    error: Option<axum::Error>,
    rest: Option<Body>,
    truncated_at: Option<usize>,
}

impl DrainedBody {
    /// `limit` バイトを超えるまで、またはボディの最後まで読み込む
    ///
    /// 超えた時点で読み込みを止め、残りのストリームは再生用に保持する。
    /// 読み込みエラーはその時点までのバイト列とともに保持し、呼び出し元には返さない。
    pub async fn drain_limited(mut body: Body, limit: usize) -> Self {
        let mut data = BytesMut::new();
        let mut trailers = None;
        let mut error = None;
        let mut rest = None;

        while let Some(frame) = body.frame().await {
            match frame {
                Ok(frame) => match frame.into_data() {
                    Ok(chunk) => {
                        data.extend_from_slice(&chunk);
                        if data.len() > limit {
                            rest = Some(body);
                            break;
                        }
                    }
                    Err(frame) => {
                        if let Ok(map) = frame.into_trailers() {
                            trailers = Some(map);
                        }
                    }
                },
                Err(err) => {
                    error = Some(err);
                    break;
                }
            }
        }

        let truncated_at = rest.is_some().then_some(limit);
        Self {
            data: data.freeze(),
            trailers,
            error,
            rest,
            truncated_at,
        }
    }

    /// 読み込んだバイト列
    pub fn bytes(&self) -> &Bytes {
        &self.data
    }

    /// 上限を超えて読み込みを打ち切ったか
    pub fn is_truncated(&self) -> bool {
        self.truncated_at.is_some()
    }

    /// UTF-8として解釈したテキスト（空なら `None`、不正なバイトは置換）
    ///
    /// 上限で打ち切った場合は本文の代わりに打ち切りを示す文言を返す。
    pub fn text(&self) -> Option<String> {
        if let Some(limit) = self.truncated_at {
            Some(truncated_body_note(limit))
        } else if self.data.is_empty() {
            None
        } else {
            Some(String::from_utf8_lossy(&self.data).into_owned())
        }
    }

    /// ストリームが途中で失敗した場合のエラーメッセージ
    pub fn error_message(&self) -> Option<String> {
        self.error.as_ref().map(ToString::to_string)
    }

    /// 同じ内容を再生するボディに変換
    pub fn into_body(self) -> Body {
        Body::new(ReplayBody {
            data: (!self.data.is_empty()).then_some(self.data),
            trailers: self.trailers,
            error: self.error,
            rest: self.rest,
        })
    }
}

/// 上限超過で記録しなかったボディの代わりに残す文言
pub fn truncated_body_note(limit: usize) -> String {
    format!("[body not captured: exceeds {} bytes]", limit)
}

/// バッファ済みの内容を1度だけ流すボディ
///
/// データ、未読の残り、トレーラー、エラーの順に返す。
#[derive(Debug)]
pub struct ReplayBody {
    data: Option<Bytes>,
    trailers: Option<HeaderMap>,
    error: Option<axum::Error>,
    rest: Option<Body>,
}

impl http_body::Body for ReplayBody {
    type Data = Bytes;
    type Error = axum::Error;

    fn poll_frame(
        self: Pin<&mut Self>,
        cx: &mut Context<'_>,
    ) -> Poll<Option<Result<Frame<Self::Data>, Self::Error>>> {
        let this = self.get_mut();
        if let Some(data) = this.data.take() {
            return Poll::Ready(Some(Ok(Frame::data(data))));
        }
        if let Some(rest) = this.rest.as_mut() {
            match http_body::Body::poll_frame(Pin::new(rest), cx) {
                Poll::Ready(None) => this.rest = None,
                other => return other,
            }
        }
        if let Some(trailers) = this.trailers.take() {
            return Poll::Ready(Some(Ok(Frame::trailers(trailers))));
        }
        if let Some(error) = this.error.take() {
            return Poll::Ready(Some(Err(error)));
        }
        Poll::Ready(None)
    }

    fn is_end_stream(&self) -> bool {
        self.data.is_none()
            && self.trailers.is_none()
            && self.error.is_none()
            && self.rest.as_ref().map_or(true, http_body::Body::is_end_stream)
    }

    fn size_hint(&self) -> SizeHint {
        let len = self.data.as_ref().map_or(0, |data| data.len() as u64);
        if let Some(rest) = &self.rest {
            let rest_hint = http_body::Body::size_hint(rest);
            let mut hint = SizeHint::new();
            hint.set_lower(len.saturating_add(rest_hint.lower()));
            if let Some(upper) = rest_hint.upper() {
                hint.set_upper(len.saturating_add(upper));
            }
            hint
        } else if self.error.is_none() {
            SizeHint::with_exact(len)
        } else {
            let mut hint = SizeHint::new();
            hint.set_lower(len);
            hint
        }
    }
}
